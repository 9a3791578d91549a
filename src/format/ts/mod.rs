//! # MPEG Transport Stream (TS) Demuxing
//!
//! This module demuxes an MPEG Transport Stream into paced, DTS-ordered
//! video and audio access units:
//!
//! - [`framer`]: TS packet framing (sync, adaptation field, PID/PUSI)
//! - [`psi`]: PAT/PMT Program Specific Information decoding
//! - [`reassembler`]: PES reassembly across TS packet boundaries
//! - [`pes_header`]: PES header field decoding (PTS/DTS, trick mode, ...)
//! - [`scheduler`]: DTS-anchored pacing with a bounded look-ahead queue
//! - [`demuxer`]: ties the above into a session with a typed event registry
//!
//! ## Example
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

/// TS demuxer session: event registry, pacing loop, cancellation
pub mod demuxer;

/// Low-level TS packet framing
pub mod framer;

/// PES header field decoding
pub mod pes_header;

/// PAT/PMT Program Specific Information decoding
pub mod psi;

/// PES reassembly across TS packet boundaries
pub mod reassembler;

/// DTS-anchored pacing scheduler
pub mod scheduler;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use demuxer::{DemuxEvent, Demuxer, EventName};
pub use types::{
    TSHeader, PID_PAT, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265, TS_PACKET_SIZE,
};
