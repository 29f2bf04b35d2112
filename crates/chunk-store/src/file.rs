//! Read-only, memory-mapped chunk file.

use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::format::{decode_block, DecodeScratch, FileHeader, Layout};

/// An opened store unit (chunk, year or master file).
///
/// Files are immutable once published, so an open handle stays valid even if
/// a writer renames a new version over the path.
pub struct ChunkFile {
    path: PathBuf,
    mmap: Mmap,
    header: FileHeader,
    layout: Layout,
    offsets: Vec<u64>,
    data_start: usize,
}

impl std::fmt::Debug for ChunkFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkFile")
            .field("path", &self.path)
            .field("shape", &self.header.shape)
            .finish()
    }
}

impl ChunkFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::io(&path, e))?
            .len();
        if len < 8 {
            return Err(StoreError::invalid_header(&path, "file shorter than preamble"));
        }

        // SAFETY: published files are never modified in place; writers replace
        // them by renaming a new file over the path.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| StoreError::io(&path, e))?;

        let (header, table_start) = FileHeader::decode(&mmap, &path)?;
        let layout = Layout::from_shape(header.shape.clone())?;

        let n_offsets = header.n_blocks as usize + 1;
        let data_start = table_start + n_offsets * 8;
        if mmap.len() < data_start {
            return Err(StoreError::invalid_header(&path, "truncated offset table"));
        }
        let offsets: Vec<u64> = mmap[table_start..data_start]
            .chunks_exact(8)
            .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect();

        let data_len = (mmap.len() - data_start) as u64;
        if offsets.first() != Some(&0)
            || offsets.windows(2).any(|w| w[1] < w[0])
            || offsets.last().is_some_and(|&end| end > data_len)
        {
            return Err(StoreError::invalid_header(&path, "inconsistent block offsets"));
        }

        debug!(
            path = %path.display(),
            shape = ?header.shape,
            blocks = header.n_blocks,
            "Opened chunk file"
        );

        Ok(Self {
            path,
            mmap,
            header,
            layout,
            offsets,
            data_start,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn locations(&self) -> usize {
        self.layout.locations
    }

    pub fn levels(&self) -> usize {
        self.layout.levels
    }

    pub fn n_time(&self) -> usize {
        self.layout.n_time
    }

    pub fn scale_factor(&self) -> f32 {
        self.header.scale_factor
    }

    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    fn chunk_locations(&self) -> usize {
        self.header.chunk_locations as usize
    }

    fn block_rows(&self, block: usize) -> usize {
        let start = block * self.chunk_locations();
        self.chunk_locations().min(self.layout.rows() - start)
    }

    fn block_bytes(&self, block: usize) -> Range<usize> {
        let start = self.data_start + self.offsets[block] as usize;
        let end = self.data_start + self.offsets[block + 1] as usize;
        start..end
    }

    fn decode(&self, block: usize, scratch: &mut DecodeScratch) -> Result<()> {
        let bytes = &self.mmap[self.block_bytes(block)];
        decode_block(
            bytes,
            self.block_rows(block),
            self.n_time(),
            self.scale_factor(),
            scratch,
        )
        .map_err(|e| StoreError::CorruptBlock {
            path: self.path.clone(),
            block,
            message: e.to_string(),
        })
    }

    /// Decode the `time` slice of each row in `rows` (ascending) and pass it to
    /// `sink`. Each block is decoded at most once.
    pub fn read_rows<I, F>(
        &self,
        rows: I,
        time: Range<usize>,
        scratch: &mut DecodeScratch,
        mut sink: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = usize>,
        F: FnMut(usize, &[f32]),
    {
        if time.end > self.n_time() || time.start > time.end {
            return Err(StoreError::invalid_request(format!(
                "time slice {time:?} outside file with {} steps",
                self.n_time()
            )));
        }

        let n_time = self.n_time();
        let cl = self.chunk_locations();
        let mut decoded: Option<usize> = None;
        for row in rows {
            if row >= self.layout.rows() {
                return Err(StoreError::invalid_request(format!(
                    "row {row} outside file with {} rows",
                    self.layout.rows()
                )));
            }
            let block = row / cl;
            if decoded != Some(block) {
                self.decode(block, scratch)?;
                decoded = Some(block);
            }
            let offset = (row - block * cl) * n_time;
            sink(row, &scratch.values()[offset + time.start..offset + time.end]);
        }
        Ok(())
    }

    /// Read `locations` at one `level`, calling `sink(location, values)`.
    pub fn read_locations<F>(
        &self,
        locations: Range<usize>,
        level: usize,
        time: Range<usize>,
        scratch: &mut DecodeScratch,
        mut sink: F,
    ) -> Result<()>
    where
        F: FnMut(usize, &[f32]),
    {
        let levels = self.levels();
        let rows = locations.map(|loc| self.layout.row(loc, level));
        self.read_rows(rows, time, scratch, |row, values| sink(row / levels, values))
    }

    /// Whole array as `rows x n_time`.
    pub fn read_all(&self, scratch: &mut DecodeScratch) -> Result<Vec<f32>> {
        let n_time = self.n_time();
        let mut out = Vec::with_capacity(self.layout.rows() * n_time);
        self.read_rows(0..self.layout.rows(), 0..n_time, scratch, |_, values| {
            out.extend_from_slice(values)
        })?;
        Ok(out)
    }

    /// Ask the OS to read ahead the blocks holding these locations. Returns
    /// the number of blocks hinted.
    pub fn prefetch_locations(&self, locations: Range<usize>, level: usize) -> Result<usize> {
        let n_blocks = self.header.n_blocks as usize;
        if locations.is_empty() || n_blocks == 0 {
            return Ok(0);
        }
        let cl = self.chunk_locations();
        let first = self.layout.row(locations.start, level) / cl;
        let last = (self.layout.row(locations.end - 1, level) / cl).min(n_blocks - 1);
        if first > last {
            return Ok(0);
        }

        let start = self.block_bytes(first).start;
        let end = self.block_bytes(last).end;
        self.advise_willneed(start, end - start)?;
        Ok(last + 1 - first)
    }

    #[cfg(unix)]
    fn advise_willneed(&self, offset: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.mmap
            .advise_range(memmap2::Advice::WillNeed, offset, len)
            .map_err(|e| StoreError::io(&self.path, e))
    }

    #[cfg(not(unix))]
    fn advise_willneed(&self, _offset: usize, _len: usize) -> Result<()> {
        Ok(())
    }
}
