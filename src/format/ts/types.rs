use std::time::Duration;

// Stream IDs
/// Stream ID for H.264 video streams in PES packets
pub const STREAM_ID_H264: u8 = 0xe0;
/// Stream ID for H.265 video streams in PES packets
pub const STREAM_ID_H265: u8 = 0xe1;
/// Stream ID for AAC audio streams in PES packets
pub const STREAM_ID_AAC: u8 = 0xc0;

// PIDs
/// PID for Program Association Table (PAT)
pub const PID_PAT: u16 = 0x0000;

// Table IDs
/// Table ID for Program Association Table (PAT)
pub const TABLE_ID_PAT: u8 = 0x00;
/// Table ID for Program Map Table (PMT)
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary Stream Types
/// Stream type for H.264 video streams
pub const STREAM_TYPE_H264: u8 = 0x1b;
/// Stream type for AAC audio streams (ADTS)
pub const STREAM_TYPE_AAC: u8 = 0x0f;

// Constants
/// Size of a Transport Stream packet in bytes
pub const TS_PACKET_SIZE: usize = 188;
/// Size of a Transport Stream header in bytes
pub const TS_HEADER_SIZE: usize = 4;
/// Maximum size of a PES header in bytes
pub const MAX_PES_HEADER_SIZE: usize = 19;
/// Clock frequency for Presentation/Decoding Time Stamps (PTS/DTS) in Hz
pub const PTS_HZ: u64 = 90_000;
/// Clock frequency for Program Clock Reference (PCR) in Hz
pub const PCR_HZ: u64 = 27_000_000;

/// Descriptor tags dispatched explicitly by the PSI decoder; any other tag
/// is either rejected (`UnsupportedDescriptor`) or skipped-and-warned,
/// depending on the decoder's leniency mode.
pub const DESCRIPTOR_TAG_CA: u8 = 9;
/// ISO 639 language descriptor tag.
pub const DESCRIPTOR_TAG_ISO_639_LANGUAGE: u8 = 10;
/// DVB service descriptor tag.
pub const DESCRIPTOR_TAG_DVB_SERVICE: u8 = 0x48;
/// DVB stream identifier descriptor tag.
pub const DESCRIPTOR_TAG_DVB_STREAM_IDENTIFIER: u8 = 0x52;
/// Descriptor tags treated as opaque (read and kept, never dispatched).
pub const DESCRIPTOR_TAGS_OPAQUE: [u8; 4] = [193, 200, 246, 253];

/// Represents an entry in the Program Association Table (PAT).
///
/// `program_number = 0` means the PID names the Network Information Table;
/// any other program number names a Program Map Table.
#[derive(Debug, Clone)]
pub struct PATEntry {
    /// Program number (16-bit). Value 0 is reserved for the network PID.
    pub program_number: u16,
    /// Network PID (13-bit), valid only when `program_number == 0`.
    pub network_pid: u16,
    /// Program Map PID (13-bit), valid only when `program_number != 0`.
    pub program_map_pid: u16,
}

/// Program Association Table (PAT): maps program numbers to PMT PIDs.
///
/// Always carried on PID 0x0000.
#[derive(Debug, Clone, Default)]
pub struct PAT {
    /// Entries mapping program numbers to PMT (or network) PIDs.
    pub entries: Vec<PATEntry>,
}

impl PAT {
    /// Creates a new empty PAT.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the PMT PID for `program_number`, if tracked.
    pub fn pmt_pid_for(&self, program_number: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.program_number == program_number)
            .map(|e| e.program_map_pid)
    }
}

/// Language and audio-type pair carried by an ISO 639 language descriptor.
#[derive(Debug, Clone)]
pub struct LanguageEntry {
    /// ISO 639 3-letter language code.
    pub language_code: [u8; 3],
    /// Audio type byte (0 = undefined, per ISO/IEC 13818-1 Table 2-60).
    pub audio_type: u8,
}

/// Decoded form of a descriptor, for tags the decoder understands.
#[derive(Debug, Clone)]
pub enum DescriptorPayload {
    /// CA descriptor (tag 9): kept opaque, decryption is out of scope.
    ConditionalAccess,
    /// ISO 639 language descriptor (tag 10).
    Iso639Language(Vec<LanguageEntry>),
    /// DVB service descriptor (tag 0x48).
    DvbService {
        /// Service type byte.
        service_type: u8,
        /// Provider name bytes, as carried (no charset decoding).
        service_provider_name: Vec<u8>,
        /// Service name bytes, as carried.
        service_name: Vec<u8>,
    },
    /// DVB stream identifier descriptor (tag 0x52).
    DvbStreamIdentifier {
        /// Component tag value.
        component_tag: u8,
    },
    /// A tag the decoder treats as opaque: CA-private or one of the
    /// `DESCRIPTOR_TAGS_OPAQUE` tags.
    Opaque,
}

/// A descriptor providing additional information about programs or
/// elementary streams, dispatched by tag per `DescriptorPayload`.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Tag identifying the descriptor type.
    pub tag: u8,
    /// Raw descriptor body (excludes the tag and length bytes).
    pub data: Vec<u8>,
    /// `descriptor_length + 2`, i.e. the number of bytes this descriptor
    /// occupied in its enclosing loop.
    pub total_length: usize,
    /// Decoded payload, present for recognized tags.
    pub payload: Option<DescriptorPayload>,
}

/// Elementary stream info entry carried in a PMT.
#[derive(Debug, Clone)]
pub struct ElementaryStreamInfo {
    /// Elementary stream type (8-bit), e.g. 0x1B = H.264, 0x0F = ADTS AAC.
    pub stream_type: u8,
    /// Elementary PID (13-bit) carrying this stream's PES packets.
    pub elementary_pid: u16,
    /// Descriptors attached to this elementary stream.
    pub descriptors: Vec<Descriptor>,
}

/// Program Map Table (PMT): binds elementary PIDs to stream types.
#[derive(Debug, Clone, Default)]
pub struct PMT {
    /// PID carrying the Program Clock Reference, if any.
    pub pcr_pid: u16,
    /// Descriptors applying to the whole program.
    pub program_descriptors: Vec<Descriptor>,
    /// One entry per elementary stream declared by this PMT.
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

impl PMT {
    /// Creates a new empty PMT.
    pub fn new() -> Self {
        Self {
            pcr_pid: 0,
            program_descriptors: Vec::new(),
            elementary_stream_infos: Vec::new(),
        }
    }

    /// Returns the elementary PID declared with `stream_type`, if any,
    /// preferring the first match.
    pub fn pid_for_stream_type(&self, stream_type: u8) -> Option<u16> {
        self.elementary_stream_infos
            .iter()
            .find(|es| es.stream_type == stream_type)
            .map(|es| es.elementary_pid)
    }
}

/// Adaptation field extension sub-fields (legal timing window,
/// piecewise rate, and seamless splice), present only when
/// `extension_flag` is set and the corresponding extension bit is set.
#[derive(Debug, Clone, Default)]
pub struct AdaptationExtension {
    /// Legal time window: `(is_valid, offset)`.
    pub ltw: Option<(bool, u16)>,
    /// Piecewise rate (22-bit), present when `piecewise_rate_flag` is set.
    pub piecewise_rate: Option<u32>,
    /// Seamless splice info: `(splice_type, dts_next_au)`.
    pub seamless_splice: Option<(u8, u64)>,
}

/// Represents an Adaptation Field in MPEG Transport Stream packets.
///
/// Carries control information, PCR/OPCR timing, splice info, and private
/// data. Unused trailing bytes are stuffing; parsed bytes never exceed
/// `length`.
#[derive(Debug, Clone)]
pub struct AdaptationField {
    /// Number of bytes in the adaptation field following the length byte.
    pub length: usize,
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator (key frame / stream start present).
    pub random_access: bool,
    /// Elementary stream priority indicator.
    pub es_priority: bool,
    /// Whether a PCR value is present.
    pub pcr_flag: bool,
    /// Whether an OPCR value is present.
    pub opcr_flag: bool,
    /// Whether a splicing countdown is present.
    pub splicing_point_flag: bool,
    /// Whether private data bytes are present.
    pub private_data_flag: bool,
    /// Whether an adaptation field extension is present.
    pub extension_flag: bool,
    /// Program Clock Reference (42-bit: 33-bit base + 9-bit extension).
    pub pcr: Option<u64>,
    /// Original Program Clock Reference (42-bit).
    pub opcr: Option<u64>,
    /// Splice countdown (8-bit signed) when `splicing_point_flag` is set.
    pub splice_countdown: Option<i8>,
    /// Private data bytes when `private_data_flag` is set.
    pub private_data: Option<Vec<u8>>,
    /// Extension sub-fields when `extension_flag` is set.
    pub extension: Option<AdaptationExtension>,
}

/// Represents a Transport Stream (TS) packet header: the fixed 4-byte
/// prefix of every TS packet.
#[derive(Debug, Clone, Copy)]
pub struct TSHeader {
    /// Sync byte (8-bit); always 0x47 once sync is locked.
    pub sync_byte: u8,
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator (PUSI): set on the first TS packet of a
    /// new PES or PSI section.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// PID (13-bit), identifying the elementary stream or PSI table.
    pub pid: u16,
    /// Transport scrambling control (2-bit); CA decryption is out of scope.
    pub scrambling_control: u8,
    /// Whether an adaptation field is present (adaptation_field_control bit 1).
    pub adaptation_field_exists: bool,
    /// Whether a payload is present (adaptation_field_control bit 0).
    pub contains_payload: bool,
    /// Continuity counter (4-bit), increments modulo 16 per PID.
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: 0x47,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

/// Converts a Program Clock Reference (PCR) value to a Duration.
///
/// PCR is a 42-bit value: a 33-bit base (90kHz) and a 9-bit extension (27MHz).
pub fn pcr_to_time(pcr: u64) -> Duration {
    let base = pcr >> 9;
    let ext = pcr & 0x1ff;
    let ts = base * 300 + ext;
    Duration::from_nanos((ts * 1_000_000_000) / PCR_HZ)
}

/// Converts a Duration to a 42-bit Program Clock Reference value.
pub fn time_to_pcr(time: Duration) -> u64 {
    let ts = time.as_nanos() as u64 * PCR_HZ / 1_000_000_000;
    let base = ts / 300;
    let ext = ts % 300;
    (base << 9) | ext
}

/// Converts a 90kHz PTS/DTS value to a Duration.
pub fn pts_to_time(pts: u64) -> Duration {
    Duration::from_nanos((pts * 1_000_000_000) / PTS_HZ)
}

/// Converts a Duration to a 90kHz PTS/DTS value.
pub fn time_to_pts(time: Duration) -> u64 {
    time.as_nanos() as u64 * PTS_HZ / 1_000_000_000
}

/// Converts a 90kHz PTS/DTS value to whole milliseconds, per `pts_to_ms`.
pub fn pts_to_ms(pts: u64) -> u64 {
    pts / 90
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pat_pmt_pid_lookup() {
        let mut pat = PAT::new();
        pat.entries.push(PATEntry {
            program_number: 1,
            network_pid: 0,
            program_map_pid: 0x1000,
        });
        assert_eq!(pat.pmt_pid_for(1), Some(0x1000));
        assert_eq!(pat.pmt_pid_for(2), None);
    }

    #[test]
    fn test_pmt_pid_for_stream_type() {
        let mut pmt = PMT::new();
        pmt.elementary_stream_infos.push(ElementaryStreamInfo {
            stream_type: STREAM_TYPE_H264,
            elementary_pid: 0x101,
            descriptors: Vec::new(),
        });
        assert_eq!(pmt.pid_for_stream_type(STREAM_TYPE_H264), Some(0x101));
        assert_eq!(pmt.pid_for_stream_type(STREAM_TYPE_AAC), None);
    }

    #[test]
    fn test_pts_round_trip_via_time() {
        let pts: u64 = 90_000 * 5;
        let time = pts_to_time(pts);
        assert_eq!(time_to_pts(time), pts);
        assert_eq!(pts_to_ms(pts), 5_000);
    }
}
