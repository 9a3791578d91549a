//! # Error Types
//!
//! This module provides the error types used throughout the vdkio library.
//! It defines a central error type `VdkError` that encapsulates all possible
//! errors that can occur during transport-stream demultiplexing, pacing, and
//! SDP handling.
//!
//! ## Example Usage
//!
//! ```rust
//! use vdkio::error::{Result, VdkError};
//!
//! fn process_video_data(data: &[u8]) -> Result<()> {
//!     if data.is_empty() {
//!         return Err(VdkError::InvalidData("Empty video data".to_string()));
//!     }
//!
//!     // Process video data...
//!     Ok(())
//! }
//! ```

use std::num::ParseIntError;
use thiserror::Error;

/// Primary error type for the vdkio library
#[derive(Error, Debug)]
pub enum VdkError {
    /// I/O errors that occur during file or network operations
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to video/audio codec operations
    #[error("codec error: {0}")]
    Codec(String),

    /// Errors related to streaming protocols (RTSP, SDP, etc.)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Errors that occur during parsing of various formats
    #[error("parser error: {0}")]
    Parser(String),

    /// Errors for invalid or malformed input data
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Errors that occur during integer parsing
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),

    /// A non-0x47 byte was observed at a packet boundary after sync lock.
    /// Fatal: the caller must terminate streaming.
    #[error("sync lost at offset {offset}: expected 0x47, found 0x{found:02x}")]
    SyncLost {
        /// Byte offset into the input buffer where sync was lost
        offset: usize,
        /// The byte actually observed
        found: u8,
    },

    /// A read would have crossed the end of the available input.
    #[error("read past end of data: {0}")]
    ReadPastEnd(String),

    /// A structurally invalid table, header, or field was encountered
    /// (bad table_id, reserved bits, section_length, start code, or PTS
    /// marker pattern).
    #[error("invalid structure: {0}")]
    InvalidStructural(String),

    /// An unrecognized descriptor tag that strict decoding refuses to
    /// skip silently.
    #[error("unsupported descriptor tag: 0x{0:02x}")]
    UnsupportedDescriptor(u8),

    /// A field was observed holding a value the standard reserves for
    /// future use (e.g. `stream_id_extension_flag = 1`).
    #[error("reserved value encountered: {0}")]
    ReservedValue(String),

    /// An audio or video PES reached the scheduler without a PTS.
    #[error("missing PTS on PID {0}")]
    MissingPTS(u16),

    /// SDP generation was requested without a field it required.
    #[error("missing required SDP option: {0}")]
    MissingOption(String),

    /// A line in an SDP document did not match `<type>=<value>`.
    #[error("invalid SDP line: {0}")]
    InvalidLine(String),

    /// A pacing helper was called before `first_dts` had been established.
    #[error("no DTS anchor established yet")]
    NoAnchorYet,
}

/// A specialized Result type for vdkio operations.
///
/// This type is used throughout the vdkio library to handle operations
/// that can produce a `VdkError`.
///
/// ## Example
///
/// ```rust
/// use vdkio::error::{Result, VdkError};
///
/// fn validate_stream_id(id: &str) -> Result<i32> {
///     id.parse::<i32>().map_err(VdkError::from)
/// }
/// ```
pub type Result<T> = std::result::Result<T, VdkError>;
