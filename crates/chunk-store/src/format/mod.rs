//! On-disk chunk file format.

pub mod codec;
pub mod header;

pub use codec::{decode_block, encode_block, DecodeScratch, NAN_SENTINEL};
pub use header::{FileHeader, Layout, COMPRESSION, FORMAT_VERSION, MAGIC};
