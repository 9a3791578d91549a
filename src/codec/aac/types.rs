/// MPEG-4 audio object type, as carried in the ADTS header's 2-bit
/// `profile` field.
#[derive(Debug, Clone, Copy)]
pub enum ProfileType {
    /// Main profile.
    Main = 0,
    /// Low Complexity profile.
    LC = 1,
    /// Scalable Sample Rate profile.
    SSR = 2,
    /// Long Term Prediction profile.
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value {
            0 => ProfileType::Main,
            1 => ProfileType::LC,
            2 => ProfileType::SSR,
            3 => ProfileType::LTP,
            _ => ProfileType::LC, // Default to LC for unknown profiles
        }
    }
}

/// Stream-level AAC configuration.
#[derive(Debug, Clone)]
pub struct AACConfig {
    /// MPEG-4 audio object type.
    pub profile: ProfileType,
    /// Index into the standard 13-entry sampling frequency table.
    pub sample_rate_index: u8,
    /// Channel configuration (1-7).
    pub channel_configuration: u8,
    /// Frame length in samples (1024 or 960).
    pub frame_length: u16,
}

impl Default for AACConfig {
    fn default() -> Self {
        Self {
            profile: ProfileType::LC,
            sample_rate_index: 4,     // 44100 Hz
            channel_configuration: 2, // Stereo
            frame_length: 1024,
        }
    }
}

/// A decoded 7-byte ADTS frame header.
#[derive(Debug)]
pub struct ADTSHeader {
    /// 12-bit sync word; valid frames carry `0xFFF`.
    pub sync_word: u32,
    /// 1-bit MPEG version id (0=MPEG-4, 1=MPEG-2).
    pub id: u8,
    /// 2-bit layer field, always 0 for AAC.
    pub layer: u8,
    /// 1-bit flag: true when no CRC follows the header.
    pub protection_absent: bool,
    /// 2-bit MPEG-4 audio object type.
    pub profile: ProfileType,
    /// 4-bit index into the standard sampling frequency table.
    pub sample_rate_index: u8,
    /// 1-bit private bit, not used by the decoder.
    pub private_bit: bool,
    /// 3-bit channel configuration.
    pub channel_configuration: u8,
    /// 1-bit original/copy flag.
    pub original_copy: bool,
    /// 1-bit home flag.
    pub home: bool,
    /// 1-bit copyright identification bit.
    pub copyright_id_bit: bool,
    /// 1-bit copyright identification start.
    pub copyright_id_start: bool,
    /// 13-bit frame length, including the 7-byte header.
    pub frame_length: u16,
    /// 11-bit buffer fullness.
    pub buffer_fullness: u16,
    /// 2-bit count of AAC raw data blocks in the frame, minus one.
    pub number_of_raw_blocks: u8,
}

impl ADTSHeader {
    /// Whether `sync_word` carries the required `0xFFF` pattern.
    pub fn sync_word_valid(&self) -> bool {
        self.sync_word == 0xFFF
    }

    /// Looks up the sampling frequency in Hz for `sample_rate_index`.
    pub fn sample_rate(&self) -> Option<u32> {
        match self.sample_rate_index {
            0 => Some(96000),
            1 => Some(88200),
            2 => Some(64000),
            3 => Some(48000),
            4 => Some(44100),
            5 => Some(32000),
            6 => Some(24000),
            7 => Some(22050),
            8 => Some(16000),
            9 => Some(12000),
            10 => Some(11025),
            11 => Some(8000),
            12 => Some(7350),
            _ => None,
        }
    }

    /// Encodes this header back into its 7-byte ADTS wire form.
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        let mut bytes = vec![0u8; 7]; // ADTS header is 7 bytes

        // First byte: sync word (first 8 bits)
        bytes[0] = (self.sync_word >> 4) as u8;

        // Second byte: sync word (last 4 bits) + id (1 bit) + layer (2 bits) + protection_absent (1 bit)
        bytes[1] = ((self.sync_word & 0xF) << 4) as u8
            | ((self.id & 0x1) << 3)
            | ((self.layer & 0x3) << 1)
            | (self.protection_absent as u8);

        // Third byte: profile (2 bits) + sample_rate_index (4 bits) + private_bit (1 bit) + channel_configuration (1 bit of 3)
        bytes[2] = ((self.profile as u8) << 6)
            | ((self.sample_rate_index & 0xF) << 2)
            | ((self.private_bit as u8) << 1)
            | ((self.channel_configuration >> 2) & 0x1);

        // Fourth byte: channel_configuration (2 bits) + original_copy (1 bit) + home (1 bit) + copyright_id_bit (1 bit) +
        // copyright_id_start (1 bit) + frame_length (2 bits of 13)
        bytes[3] = ((self.channel_configuration & 0x3) << 6)
            | ((self.original_copy as u8) << 5)
            | ((self.home as u8) << 4)
            | ((self.copyright_id_bit as u8) << 3)
            | ((self.copyright_id_start as u8) << 2)
            | ((self.frame_length >> 11) & 0x3) as u8;

        // Fifth byte: frame_length (8 bits of remaining 11)
        bytes[4] = ((self.frame_length >> 3) & 0xFF) as u8;

        // Sixth byte: frame_length (3 bits) + buffer_fullness (5 bits of 11)
        bytes[5] =
            ((self.frame_length & 0x7) << 5) as u8 | ((self.buffer_fullness >> 6) & 0x1F) as u8;

        // Seventh byte: buffer_fullness (6 bits) + number_of_raw_blocks (2 bits)
        bytes[6] = ((self.buffer_fullness & 0x3F) << 2) as u8 | (self.number_of_raw_blocks & 0x3);

        Ok(bytes)
    }
}

/// A decoded ADTS frame: its header-derived config plus raw frame bytes.
#[derive(Debug, Clone)]
pub struct AACFrame {
    /// Configuration decoded from the frame's ADTS header.
    pub config: AACConfig,
    /// Raw frame bytes, including the ADTS header.
    pub data: Vec<u8>,
}

impl AACFrame {
    /// Builds a frame from a decoded config and raw bytes.
    pub fn new(config: AACConfig, data: Vec<u8>) -> Self {
        Self { config, data }
    }
}
