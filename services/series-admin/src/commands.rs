//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chunk_store::{
    find_stale_temp_files, purge_stale_temp_files, ChunkFile, DecodeScratch, Splitter,
    StoreConfig, UpdateOptions,
};
use series_common::{DomainDescriptor, SeriesConfig, TimeRange, Timestamp, VariableDescriptor};
use series_reader::{get_mixed, StoreReader};
use tracing::{info, warn};

use crate::csv;

fn load_config(path: &Path) -> Result<SeriesConfig> {
    SeriesConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn store_config() -> Result<StoreConfig> {
    let config = StoreConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

pub fn inspect(file: &Path, location: Option<usize>, level: usize) -> Result<()> {
    let chunk = ChunkFile::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let header = serde_json::to_string_pretty(chunk.header())?;
    println!("{header}");
    println!(
        "locations: {}, levels: {}, time steps: {}, size: {} bytes",
        chunk.locations(),
        chunk.levels(),
        chunk.n_time(),
        chunk.file_size()
    );

    if let Some(location) = location {
        if location >= chunk.locations() || level >= chunk.levels() {
            bail!(
                "location {location} level {level} outside file with {} locations and {} levels",
                chunk.locations(),
                chunk.levels()
            );
        }
        let mut scratch = DecodeScratch::new();
        chunk.read_locations(
            location..location + 1,
            level,
            0..chunk.n_time(),
            &mut scratch,
            |_, values| {
                for (t, value) in values.iter().enumerate() {
                    println!("{t},{value}");
                }
            },
        )?;
    }
    Ok(())
}

/// Arguments of the `read` subcommand.
#[derive(Debug)]
pub struct ReadQuery {
    pub domains: Vec<String>,
    pub variable: String,
    pub location: usize,
    pub start: String,
    pub end: String,
    pub dt: Option<i64>,
    pub level: usize,
    pub previous_run: usize,
}

pub async fn read(config_path: &Path, query: ReadQuery) -> Result<()> {
    let config = load_config(config_path)?;
    let store = store_config()?;
    let variable = config.variable(&query.variable)?;
    let Some(last) = query.domains.last() else {
        bail!("at least one domain is required");
    };
    let native = config.domain(last)?.dt_seconds();

    let mut readers = Vec::with_capacity(query.domains.len());
    for name in &query.domains {
        let domain = config.domain(name)?.clone();
        let splitter = Arc::new(Splitter::new(domain, store.clone()));
        let reader = StoreReader::new(splitter, query.location)?
            .at_level(query.level)
            .with_previous_run(query.previous_run);
        readers.push(reader);
    }

    let dt = query.dt.unwrap_or(native);
    if dt <= 0 {
        bail!("dt must be positive");
    }
    let start = Timestamp::parse_iso8601(&query.start)?;
    let end = Timestamp::parse_iso8601(&query.end)?;
    if end <= start {
        bail!("end {end} is not after start {start}");
    }
    let time = TimeRange::from_bounds(start, end, dt);

    let series = get_mixed(&readers, variable, &time).await?;
    info!(
        variable = variable.name(),
        unit = %series.unit,
        steps = time.count,
        "Read series"
    );
    print!("{}", csv::format(&time, &series.data));
    Ok(())
}

pub fn write(
    config_path: &Path,
    domain_name: &str,
    variable_name: &str,
    location: usize,
    level: usize,
    previous_runs: bool,
    csv_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let domain = config.domain(domain_name)?.clone();
    let variable = config.variable(variable_name)?;
    if location >= domain.location_count() || level >= domain.levels() {
        bail!("location {location} level {level} outside domain {domain_name}");
    }

    let text = std::fs::read_to_string(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    let rows = csv::parse(&text)?;
    let (time, values) = csv::to_series(&rows, domain.dt_seconds())?;

    let row = location * domain.levels() + level;
    let mut options = UpdateOptions::new(variable.scale_factor());
    if previous_runs {
        options = options.with_previous_runs();
    }

    let splitter = Splitter::new(domain, store_config()?);
    let summary = splitter.update(variable.name(), &time, &options, |rows| {
        let mut batch = vec![f32::NAN; rows.len() * time.count];
        if rows.contains(&row) {
            let offset = (row - rows.start) * time.count;
            batch[offset..offset + time.count].copy_from_slice(&values);
        }
        Ok(batch)
    })?;
    info!(
        files = summary.files_written,
        snapshots = summary.snapshots,
        batches = summary.batches,
        "Wrote series"
    );
    for path in &summary.paths {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn purge_temp(root: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        for path in find_stale_temp_files(root)? {
            println!("{}", path.display());
        }
        return Ok(());
    }
    let removed = purge_stale_temp_files(root)?;
    if removed > 0 {
        warn!(removed, root = %root.display(), "Removed stale temp files");
    } else {
        info!(root = %root.display(), "No stale temp files");
    }
    Ok(())
}
