use super::types::{AACConfig, AACFrame, ADTSHeader, ProfileType};
use crate::utils::BitReader;
use crate::{Result, VdkError};

/// Stateful ADTS frame parser, remembering the last-seen config for frames
/// that omit their own ADTS header.
#[derive(Debug)]
pub struct AACParser {
    config: Option<AACConfig>,
}

impl AACParser {
    /// Creates a parser with no remembered configuration.
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Parses one frame, preferring an ADTS header if present and falling
    /// back to the last configuration set via [`AACParser::set_config`].
    pub fn parse_frame(&mut self, data: &[u8]) -> Result<AACFrame> {
        // Try to parse as ADTS frame first
        if data.len() >= 7 {
            // Minimum ADTS header size
            if let Ok(header) = self.parse_adts_header(&data[..7]) {
                if header.sync_word_valid() {
                    let frame_data = if header.frame_length as usize <= data.len() {
                        &data[7..header.frame_length as usize]
                    } else {
                        &data[7..]
                    };
                    let config = AACConfig {
                        profile: header.profile,
                        sample_rate_index: header.sample_rate_index,
                        channel_configuration: header.channel_configuration,
                        frame_length: 1024, // AAC default frame length
                    };
                    self.config = Some(config.clone());
                    return Ok(AACFrame::new(config, frame_data.to_vec()));
                }
            }
        }

        // If not ADTS, try to use existing config
        if let Some(config) = &self.config {
            Ok(AACFrame::new(config.clone(), data.to_vec()))
        } else {
            Err(VdkError::Parser(
                "No AAC configuration available and data is not in ADTS format".into(),
            ))
        }
    }

    /// Decodes a 7-byte ADTS header from the start of `data`.
    pub fn parse_adts_header(&mut self, data: &[u8]) -> Result<ADTSHeader> {
        if data.len() < 7 {
            return Err(VdkError::Parser("ADTS header too short".into()));
        }

        let mut reader = BitReader::new(data);

        let sync_word = reader.read_bits(12)?;
        if sync_word != 0xFFF {
            return Err(VdkError::Parser("Invalid ADTS sync word".into()));
        }

        let id = reader.read_bits(1)? as u8;
        let layer = reader.read_bits(2)? as u8;
        let protection_absent = reader.read_bits(1)? == 1;

        let profile_raw = reader.read_bits(2)? as u8;
        let profile = ProfileType::from(profile_raw);

        let sample_rate_index = reader.read_bits(4)? as u8;
        let private_bit = reader.read_bits(1)? == 1;
        let channel_configuration = reader.read_bits(3)? as u8;
        let original_copy = reader.read_bits(1)? == 1;
        let home = reader.read_bits(1)? == 1;

        let copyright_id_bit = reader.read_bits(1)? == 1;
        let copyright_id_start = reader.read_bits(1)? == 1;
        let frame_length = reader.read_bits(13).map(|v| v as u16)?;
        let buffer_fullness = reader.read_bits(11)? as u16;
        let number_of_raw_blocks = reader.read_bits(2)? as u8;

        Ok(ADTSHeader {
            sync_word,
            id,
            layer,
            protection_absent,
            profile,
            sample_rate_index,
            private_bit,
            channel_configuration,
            original_copy,
            home,
            copyright_id_bit,
            copyright_id_start,
            frame_length,
            buffer_fullness,
            number_of_raw_blocks,
        })
    }

    /// Sets the configuration used for frames without their own ADTS header.
    pub fn set_config(&mut self, config: AACConfig) {
        self.config = Some(config);
    }

    /// Returns the currently remembered configuration, if any.
    pub fn config(&self) -> Option<&AACConfig> {
        self.config.as_ref()
    }
}

impl Default for AACParser {
    fn default() -> Self {
        Self::new()
    }
}
