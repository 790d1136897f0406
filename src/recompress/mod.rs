//! JPEG re-encoding and the size gate deciding whether it is kept.

mod encoder;
mod gate;

pub use encoder::{recompress, target_encoding, EncodedImage, Recompressed, TargetEncoding};
pub use gate::{Gate, GateDecision};
