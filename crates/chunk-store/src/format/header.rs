//! File preamble: magic, JSON header and array layout.
//!
//! ```text
//! offset 0   : magic b"TSCF"
//! offset 4   : u32 LE header length H
//! offset 8   : H bytes JSON header
//! 8 + H      : (n_blocks + 1) x u64 LE block offsets, relative to data start
//! data start : concatenated deflate blocks
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const MAGIC: &[u8; 4] = b"TSCF";
pub const FORMAT_VERSION: u32 = 1;
pub const COMPRESSION: &str = "deflate_delta_i16";

/// JSON header stored after the magic bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub version: u32,
    pub shape: Vec<u64>,
    pub dimension_names: Vec<String>,
    pub chunk_locations: u32,
    pub scale_factor: f32,
    pub compression: String,
    pub n_blocks: u64,
}

impl FileHeader {
    pub fn new(layout: &Layout, chunk_locations: usize, scale_factor: f32) -> Self {
        let chunk_locations = chunk_locations.max(1);
        Self {
            version: FORMAT_VERSION,
            shape: layout.shape.clone(),
            dimension_names: layout.dimension_names(),
            chunk_locations: chunk_locations as u32,
            scale_factor,
            compression: COMPRESSION.to_string(),
            n_blocks: layout.rows().div_ceil(chunk_locations) as u64,
        }
    }

    /// Serialise magic, length and JSON header.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)
            .map_err(|e| StoreError::Config(format!("failed to encode header: {e}")))?;
        let mut out = Vec::with_capacity(8 + json.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&json);
        Ok(out)
    }

    /// Parse the preamble at the start of `bytes`. Returns the header and the
    /// offset of the block offset table.
    pub fn decode(bytes: &[u8], path: &Path) -> Result<(Self, usize)> {
        if bytes.len() < 8 {
            return Err(StoreError::invalid_header(path, "file shorter than preamble"));
        }
        if &bytes[0..4] != MAGIC {
            return Err(StoreError::invalid_header(path, "bad magic"));
        }
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[4..8]);
        let header_len = u32::from_le_bytes(len) as usize;
        let end = 8 + header_len;
        if bytes.len() < end {
            return Err(StoreError::invalid_header(path, "truncated header"));
        }

        let header: FileHeader = serde_json::from_slice(&bytes[8..end])
            .map_err(|e| StoreError::invalid_header(path, e.to_string()))?;
        header.validate(path)?;
        Ok((header, end))
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(StoreError::invalid_header(
                path,
                format!("unsupported version {}", self.version),
            ));
        }
        if self.compression != COMPRESSION {
            return Err(StoreError::invalid_header(
                path,
                format!("unsupported compression '{}'", self.compression),
            ));
        }
        if self.chunk_locations == 0 {
            return Err(StoreError::invalid_header(path, "chunk_locations is 0"));
        }
        let layout = Layout::from_shape(self.shape.clone())?;
        let expected = layout.rows().div_ceil(self.chunk_locations as usize) as u64;
        if self.n_blocks != expected {
            return Err(StoreError::invalid_header(
                path,
                format!("n_blocks {} does not match shape (expected {expected})", self.n_blocks),
            ));
        }
        Ok(())
    }
}

/// Interpretation of a stored shape. The last dimension is always time; the
/// leading ones flatten into rows indexed by `location * levels + level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub shape: Vec<u64>,
    pub locations: usize,
    pub levels: usize,
    pub n_time: usize,
}

impl Layout {
    /// Dispatch on rank: `[locations, time]`, `[y, x, time]` or
    /// `[y, x, level, time]`.
    pub fn from_shape(shape: Vec<u64>) -> Result<Self> {
        let (locations, levels, n_time) = match shape.as_slice() {
            [locations, time] => (*locations, 1, *time),
            [y, x, time] => (y * x, 1, *time),
            [y, x, levels, time] => (y * x, *levels, *time),
            _ => return Err(StoreError::UnsupportedLayout { shape }),
        };
        Ok(Self {
            shape,
            locations: locations as usize,
            levels: levels as usize,
            n_time: n_time as usize,
        })
    }

    /// Legacy flattened-location layout.
    pub fn flat(locations: usize, n_time: usize) -> Self {
        Self {
            shape: vec![locations as u64, n_time as u64],
            locations,
            levels: 1,
            n_time,
        }
    }

    /// Grid layout; 3-D for surface fields, 4-D when there are several levels.
    pub fn grid(ny: usize, nx: usize, levels: usize, n_time: usize) -> Self {
        let shape = if levels > 1 {
            vec![ny as u64, nx as u64, levels as u64, n_time as u64]
        } else {
            vec![ny as u64, nx as u64, n_time as u64]
        };
        Self {
            shape,
            locations: ny * nx,
            levels: levels.max(1),
            n_time,
        }
    }

    pub fn dimension_names(&self) -> Vec<String> {
        let names: &[&str] = match self.shape.len() {
            2 => &["location", "time"],
            3 => &["y", "x", "time"],
            _ => &["y", "x", "level", "time"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    pub fn rows(&self) -> usize {
        self.locations * self.levels
    }

    pub fn row(&self, location: usize, level: usize) -> usize {
        location * self.levels + level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_dispatch() {
        let flat = Layout::from_shape(vec![10, 24]).unwrap();
        assert_eq!((flat.locations, flat.levels, flat.n_time), (10, 1, 24));

        let surface = Layout::from_shape(vec![3, 4, 24]).unwrap();
        assert_eq!((surface.locations, surface.levels), (12, 1));

        let pressure = Layout::from_shape(vec![3, 4, 5, 24]).unwrap();
        assert_eq!((pressure.locations, pressure.levels, pressure.rows()), (12, 5, 60));
        assert_eq!(pressure.row(2, 3), 13);

        assert!(matches!(
            Layout::from_shape(vec![24]),
            Err(StoreError::UnsupportedLayout { .. })
        ));
        assert!(matches!(
            Layout::from_shape(vec![1, 2, 3, 4, 5]),
            Err(StoreError::UnsupportedLayout { .. })
        ));
    }

    #[test]
    fn test_grid_layout_rank() {
        assert_eq!(Layout::grid(2, 3, 1, 8).shape, vec![2, 3, 8]);
        assert_eq!(Layout::grid(2, 3, 4, 8).shape, vec![2, 3, 4, 8]);
        assert_eq!(Layout::grid(2, 3, 4, 8).dimension_names()[2], "level");
    }

    #[test]
    fn test_header_preamble() {
        let layout = Layout::flat(13, 24);
        let header = FileHeader::new(&layout, 6, 20.0);
        assert_eq!(header.n_blocks, 3);

        let mut bytes = header.encode().unwrap();
        bytes.extend_from_slice(&[0u8; 32]);
        let (decoded, end) = FileHeader::decode(&bytes, Path::new("t.om")).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(end, bytes.len() - 32);
    }

    #[test]
    fn test_header_rejects_garbage() {
        let path = Path::new("bad.om");
        assert!(FileHeader::decode(b"TSC", path).is_err());
        assert!(FileHeader::decode(b"NOPE\0\0\0\0", path).is_err());

        let mut header = FileHeader::new(&Layout::flat(4, 4), 2, 1.0);
        header.n_blocks = 7;
        let bytes = header.encode().unwrap();
        assert!(matches!(
            FileHeader::decode(&bytes, path),
            Err(StoreError::InvalidHeader { .. })
        ));
    }
}
