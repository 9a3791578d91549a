//! # Codec-Level Types
//!
//! This module provides codec-level types shared by the demuxer's
//! elementary-stream handling. It currently covers AAC only; the demuxer
//! itself treats video access units as opaque payload bytes and has no
//! need for NAL-level parsing.
//!
//! ### AAC
//! The `sampling_frequency`/object-type tables consumed by
//! [`crate::aac::StandardAscEncoder`] when synthesizing an
//! AudioSpecificConfig for the SDP codec.

#[doc = "AAC (Advanced Audio Coding) codec implementation

Provides ADTS frame parsing and audio extraction capabilities"]
pub mod aac;
