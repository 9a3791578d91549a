//! # AAC Codec Types
//!
//! ADTS header/frame types and the object-type/profile enum consumed by
//! [`crate::aac::StandardAscEncoder`] when synthesizing an
//! AudioSpecificConfig for the SDP codec.

/// ADTS frame parsing
pub mod parser;

/// ADTS header and frame type definitions
pub mod types;

// Re-export commonly used types for convenience
pub use parser::AACParser;
pub use types::{AACConfig, AACFrame, ADTSHeader, ProfileType};
