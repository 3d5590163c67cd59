//! ais-core: Pure AIS decode + CoT transform library.
//!
//! No async, no I/O, just algorithms. This crate is the shared core used by
//! `ais-gateway` (feed daemon + CLI). It parses NMEA AIVDM/AIVDO sentences,
//! decodes the 6-bit armored payloads into vessel reports, classifies MMSIs,
//! and renders reports as Cursor-on-Target event XML.

pub mod bits;
pub mod config;
pub mod cot;
pub mod decode;
pub mod registry;
pub mod sentence;
pub mod transform;
pub mod types;

// Re-export commonly used types at crate root
pub use cot::{CotEvent, CotPoint};
pub use decode::{AisDecoder, Decoded};
pub use registry::{KnownCraft, KnownCraftDb, MidDb, ShipDb};
pub use sentence::{compute_checksum, parse_sentence, Sentence};
pub use transform::CotTransformer;
pub use types::*;
