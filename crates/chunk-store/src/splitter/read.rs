//! Read and prefetch paths.

use tracing::{debug, instrument};

use series_common::DomainDescriptor;

use super::{ReadRequest, Splitter};
use crate::error::Result;
use crate::format::DecodeScratch;
use crate::index::resolve_tiers;

impl<D: DomainDescriptor> Splitter<D> {
    /// Read `request` into a NaN-filled array laid out location-major
    /// (`locations x time`). Tiers without data leave their span NaN.
    #[instrument(skip_all, fields(domain = self.domain.name(), variable = %request.variable, time = %request.time))]
    pub fn read(&self, request: &ReadRequest, scratch: &mut DecodeScratch) -> Result<Vec<f32>> {
        request.validate(&self.domain)?;

        let n_time = request.time.count;
        let mut out = vec![f32::NAN; request.output_len()];
        if out.is_empty() {
            return Ok(out);
        }

        let reads = resolve_tiers(
            &request.time,
            &self.domain,
            &request.variable,
            request.previous_run,
            |tier, path| self.open_checked(tier, path, request.level),
        )?;

        let first = request.locations.start;
        for read in &reads {
            let array = read.intersection.array.clone();
            read.handle.read_locations(
                request.locations.clone(),
                request.level,
                read.intersection.file.clone(),
                scratch,
                |location, values| {
                    let row = (location - first) * n_time;
                    out[row + array.start..row + array.end].copy_from_slice(values);
                },
            )?;
            debug!(
                tier = %read.tier,
                file = ?read.intersection.file,
                array = ?read.intersection.array,
                "Read from store unit"
            );
        }

        Ok(out)
    }

    /// Hint the OS to read ahead everything `request` would touch.
    ///
    /// Best effort: invalid requests, missing files and I/O errors are logged
    /// and otherwise ignored.
    pub fn prefetch(&self, request: &ReadRequest) {
        if let Err(e) = self.try_prefetch(request) {
            debug!(variable = %request.variable, error = %e, "Prefetch skipped");
        }
    }

    fn try_prefetch(&self, request: &ReadRequest) -> Result<usize> {
        request.validate(&self.domain)?;
        let reads = resolve_tiers(
            &request.time,
            &self.domain,
            &request.variable,
            request.previous_run,
            |tier, path| self.open_checked(tier, path, request.level),
        )?;

        let mut blocks = 0;
        for read in &reads {
            blocks += read
                .handle
                .prefetch_locations(request.locations.clone(), request.level)?;
        }
        Ok(blocks)
    }
}
