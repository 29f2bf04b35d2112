//! Streaming chunk file writer with temp-file-then-rename publishing.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::format::{encode_block, FileHeader, Layout};

/// Prefix marking an unpublished file.
pub const TEMP_PREFIX: char = '~';

/// Temp path used while writing `path`: `~<name>` in the same directory.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{TEMP_PREFIX}{name}"))
}

/// Writes one store unit block by block.
///
/// Rows must be supplied in order, in batches that are a multiple of the
/// block height (except the final batch). Nothing is visible at the final path
/// until [`ChunkFileWriter::finish`] renames the temp file. Dropping an
/// unfinished writer removes the temp file.
pub struct ChunkFileWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    header: FileHeader,
    layout: Layout,
    compression_level: u32,
    table_start: u64,
    offsets: Vec<u64>,
    next_row: usize,
    encoded: Vec<u8>,
}

impl ChunkFileWriter {
    /// Create the temp file. Fails with [`StoreError::Locked`] if another
    /// writer already holds it.
    pub fn create(
        path: impl Into<PathBuf>,
        layout: Layout,
        chunk_locations: usize,
        scale_factor: f32,
        compression_level: u32,
    ) -> Result<Self> {
        let final_path = path.into();
        let temp_path = temp_path_for(&final_path);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StoreError::Locked(final_path.clone()),
                _ => StoreError::io(&temp_path, e),
            })?;

        let header = FileHeader::new(&layout, chunk_locations, scale_factor);
        let preamble = header.encode()?;
        let table_len = (header.n_blocks as usize + 1) * 8;
        let written = file
            .write_all(&preamble)
            .and_then(|_| file.write_all(&vec![0u8; table_len]));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&temp_path, e));
        }

        debug!(path = %temp_path.display(), shape = ?layout.shape, "Created temp chunk file");

        Ok(Self {
            final_path,
            temp_path,
            file: Some(file),
            table_start: preamble.len() as u64,
            offsets: vec![0],
            header,
            layout,
            compression_level,
            next_row: 0,
            encoded: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.next_row
    }

    /// Append whole rows, `rows x n_time` values.
    pub fn write_rows(&mut self, values: &[f32]) -> Result<()> {
        let n_time = self.layout.n_time;
        let cl = self.header.chunk_locations as usize;
        if n_time == 0 || values.len() % n_time != 0 {
            return Err(StoreError::ShapeMismatch {
                expected: n_time,
                actual: values.len(),
            });
        }
        let rows = values.len() / n_time;
        let total = self.layout.rows();
        if self.next_row + rows > total {
            return Err(StoreError::ShapeMismatch {
                expected: (total - self.next_row) * n_time,
                actual: values.len(),
            });
        }
        if rows % cl != 0 && self.next_row + rows != total {
            return Err(StoreError::invalid_request(format!(
                "batch of {rows} rows is not a multiple of the block height {cl}"
            )));
        }

        let Some(file) = self.file.as_mut() else {
            return Err(StoreError::invalid_request("writer already finished"));
        };
        for block in values.chunks(cl * n_time) {
            encode_block(
                block,
                n_time,
                self.header.scale_factor,
                self.compression_level,
                &mut self.encoded,
            )
            .map_err(|e| StoreError::io(&self.temp_path, e))?;
            file.write_all(&self.encoded)
                .map_err(|e| StoreError::io(&self.temp_path, e))?;
            let end = self.offsets.last().copied().unwrap_or(0) + self.encoded.len() as u64;
            self.offsets.push(end);
        }
        self.next_row += rows;
        Ok(())
    }

    /// Write the offset table, fsync and rename over the final path.
    pub fn finish(mut self) -> Result<PathBuf> {
        if self.next_row != self.layout.rows() {
            return Err(StoreError::ShapeMismatch {
                expected: self.layout.rows() * self.layout.n_time,
                actual: self.next_row * self.layout.n_time,
            });
        }
        let Some(mut file) = self.file.take() else {
            return Err(StoreError::invalid_request("writer already finished"));
        };

        let table: Vec<u8> = self.offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        let synced = file
            .seek(SeekFrom::Start(self.table_start))
            .and_then(|_| file.write_all(&table))
            .and_then(|_| file.sync_all());
        drop(file);

        let published = synced
            .map_err(|e| StoreError::io(&self.temp_path, e))
            .and_then(|_| {
                fs::rename(&self.temp_path, &self.final_path)
                    .map_err(|e| StoreError::io(&self.final_path, e))
            });
        if let Err(e) = published {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e);
        }
        Ok(self.final_path.clone())
    }
}

impl Drop for ChunkFileWriter {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                warn!(path = %self.temp_path.display(), error = %e, "Failed to remove unfinished temp file");
            }
        }
    }
}

/// Write a complete array in one go.
pub fn write_file(
    path: impl Into<PathBuf>,
    layout: Layout,
    chunk_locations: usize,
    scale_factor: f32,
    compression_level: u32,
    values: &[f32],
) -> Result<PathBuf> {
    let expected = layout.rows() * layout.n_time;
    if values.len() != expected {
        return Err(StoreError::ShapeMismatch {
            expected,
            actual: values.len(),
        });
    }
    let mut writer =
        ChunkFileWriter::create(path, layout, chunk_locations, scale_factor, compression_level)?;
    if !values.is_empty() {
        writer.write_rows(values)?;
    }
    writer.finish()
}
