#![doc(html_root_url = "https://docs.rs/vdkio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # vdkio - Rust Video Development Kit
//!
//! `vdkio` demuxes an MPEG Transport Stream into paced, DTS-ordered video
//! and audio access units, and builds the SDP session description an RTSP
//! or RTP peer needs to consume them.
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! vdkio = "0.1.0"
//! ```
//!
//! ### Demuxing a Transport Stream
//!
//! ```rust,no_run
//! use vdkio::format::ts::demuxer::{Demuxer, EventName};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut demuxer = Demuxer::new();
//! demuxer.open("input.ts")?;
//! demuxer.on(EventName::Video, |event| {
//!     println!("video event: {:?}", event);
//! });
//! demuxer.start_streaming(0).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: Transport Stream demuxing (framing, PSI, PES reassembly,
//!   pacing scheduler) and SDP generation/parsing
//! - `codec`: Codec-level types shared by the AAC AudioSpecificConfig path
//! - `aac`: AudioSpecificConfig synthesis, consumed by the SDP codec
//! - `error`: Custom error types and the crate's `Result` alias
//! - `utils`: Bitstream reading and CRC calculations
//! - `config`: Process-wide tunables (pacing advance, look-ahead depth,
//!   input size caps)

/// AudioSpecificConfig synthesis, consumed by the SDP codec
pub mod aac;

/// Codec-level types shared by the AAC AudioSpecificConfig path
pub mod codec;

/// Error types and utilities
pub mod error;

/// Media format implementations (Transport Stream demuxing, SDP)
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{Result, VdkError};
