//! # Media Format Implementations
//!
//! This module provides:
//!
//! - **TS**: MPEG Transport Stream demuxing, PES reassembly, and DTS-paced
//!   event delivery (see [`ts`])
//! - **SDP**: Session Description Protocol generation and parsing for the
//!   demuxed streams (see [`sdp`])
//!
//! ## Examples
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
//! ### Generating an SDP description
//!
//! ```rust
//! use vdkio::format::sdp::{generate, AddressType, SdpOptions};
//! use vdkio::aac::StandardAscEncoder;
//!
//! let options = SdpOptions {
//!     username: "-".to_string(),
//!     session_id: "0".to_string(),
//!     session_version: "0".to_string(),
//!     address_type: AddressType::IP4,
//!     unicast_address: "127.0.0.1".to_string(),
//!     has_audio: false,
//!     audio: None,
//!     has_video: false,
//!     video: None,
//!     duration_seconds: None,
//! };
//! let sdp = generate(&options, &StandardAscEncoder).unwrap();
//! assert!(sdp.starts_with("v=0\r\n"));
//! ```

/// Session Description Protocol generation and parsing
pub mod sdp;
/// MPEG Transport Stream (TS) demuxing
pub mod ts;

// Re-export commonly used types
pub use self::sdp::{generate as generate_sdp, parse as parse_sdp, SdpOptions, SdpSession};
pub use self::ts::{DemuxEvent, Demuxer, EventName};
