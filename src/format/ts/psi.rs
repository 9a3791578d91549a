use super::types::{
    Descriptor, DescriptorPayload, ElementaryStreamInfo, LanguageEntry, PATEntry, PAT, PMT,
    TABLE_ID_PAT, TABLE_ID_PMT,
};
use crate::error::{Result, VdkError};
use crate::utils::Crc32Mpeg2;
use log::warn;

/// Controls how the PSI decoder reacts to a descriptor tag it does not
/// recognize from the fixed dispatch table (9, 10, 0x48, 0x52, or one of
/// the opaque tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLeniency {
    /// Fail the enclosing section with `UnsupportedDescriptor`.
    Strict,
    /// Log a warning and keep the descriptor's raw bytes without a
    /// decoded payload.
    Lenient,
}

/// Controls whether `Crc32Mpeg2` is actually checked against the trailing
/// CRC field of a PSI section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcPolicy {
    /// Read the CRC but never check it.
    Ignore,
    /// Verify the CRC and fail with `InvalidStructural` on mismatch.
    Verify,
}

/// PAT and PMT section decoder.
pub struct PsiDecoder {
    descriptor_leniency: DescriptorLeniency,
    crc_policy: CrcPolicy,
    crc: Crc32Mpeg2,
}

impl Default for PsiDecoder {
    fn default() -> Self {
        Self::new(DescriptorLeniency::Strict, CrcPolicy::Ignore)
    }
}

impl PsiDecoder {
    /// Creates a decoder with the given descriptor and CRC policies.
    pub fn new(descriptor_leniency: DescriptorLeniency, crc_policy: CrcPolicy) -> Self {
        Self {
            descriptor_leniency,
            crc_policy,
            crc: Crc32Mpeg2::new(),
        }
    }

    /// Parses a PAT section from reassembled PSI payload (pointer_field
    /// included, per §4.4).
    pub fn parse_pat(&self, data: &[u8]) -> Result<PAT> {
        let section = self.strip_pointer_field(data)?;
        self.check_section_header(section, TABLE_ID_PAT)?;

        let section_length = Self::section_length(section)?;
        if section_length > 1021 {
            return Err(VdkError::InvalidStructural(format!(
                "PAT section_length {} exceeds 1021",
                section_length
            )));
        }
        let total_length = 3 + section_length;
        if section.len() < total_length {
            return Err(VdkError::ReadPastEnd("PAT section shorter than section_length".into()));
        }

        self.verify_crc(section, total_length)?;

        let mut pat = PAT::new();
        let program_loop_end = total_length - 4;
        let mut pos = 8;
        while pos + 4 <= program_loop_end {
            let program_number = ((section[pos] as u16) << 8) | section[pos + 1] as u16;
            let pid = ((section[pos + 2] as u16 & 0x1F) << 8) | section[pos + 3] as u16;
            pat.entries.push(PATEntry {
                program_number,
                network_pid: if program_number == 0 { pid } else { 0 },
                program_map_pid: if program_number != 0 { pid } else { 0 },
            });
            pos += 4;
        }

        Ok(pat)
    }

    /// Parses a PMT section from reassembled PSI payload.
    pub fn parse_pmt(&self, data: &[u8]) -> Result<PMT> {
        let section = self.strip_pointer_field(data)?;
        self.check_section_header(section, TABLE_ID_PMT)?;

        let section_number = section[6];
        let last_section_number = section[7];
        if section_number != 0 || last_section_number != 0 {
            return Err(VdkError::InvalidStructural(
                "PMT section_number/last_section_number must be 0".into(),
            ));
        }

        let section_length = Self::section_length(section)?;
        let total_length = 3 + section_length;
        if section.len() < total_length {
            return Err(VdkError::ReadPastEnd("PMT section shorter than section_length".into()));
        }

        self.verify_crc(section, total_length)?;

        let mut pmt = PMT::new();
        let mut pos = 8;

        pmt.pcr_pid = ((section[pos] as u16 & 0x1F) << 8) | section[pos + 1] as u16;
        pos += 2;

        let program_info_length = ((section[pos] as usize & 0x0F) << 8) | section[pos + 1] as usize;
        pos += 2;

        let section_end = total_length - 4;
        if pos + program_info_length > section_end {
            return Err(VdkError::InvalidStructural(
                "program_info_length extends beyond section".into(),
            ));
        }
        pmt.program_descriptors = self.parse_descriptor_loop(&section[pos..pos + program_info_length])?;
        pos += program_info_length;

        while pos + 5 <= section_end {
            let stream_type = section[pos];
            let elementary_pid = ((section[pos + 1] as u16 & 0x1F) << 8) | section[pos + 2] as u16;
            let es_info_length = ((section[pos + 3] as usize & 0x0F) << 8) | section[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > section_end {
                return Err(VdkError::InvalidStructural(
                    "ES_info_length extends beyond section".into(),
                ));
            }
            let descriptors = self.parse_descriptor_loop(&section[pos..pos + es_info_length])?;
            pos += es_info_length;

            pmt.elementary_stream_infos.push(ElementaryStreamInfo {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }

    fn strip_pointer_field<'d>(&self, data: &'d [u8]) -> Result<&'d [u8]> {
        if data.is_empty() {
            return Err(VdkError::ReadPastEnd("empty PSI payload".into()));
        }
        let pointer_field = data[0] as usize;
        if data.len() < 1 + pointer_field {
            return Err(VdkError::ReadPastEnd("pointer_field exceeds payload".into()));
        }
        Ok(&data[1 + pointer_field..])
    }

    fn check_section_header(&self, section: &[u8], expected_table_id: u8) -> Result<()> {
        if section.len() < 8 {
            return Err(VdkError::ReadPastEnd("PSI section shorter than fixed header".into()));
        }
        if section[0] != expected_table_id {
            return Err(VdkError::InvalidStructural(format!(
                "expected table_id 0x{:02x}, found 0x{:02x}",
                expected_table_id, section[0]
            )));
        }
        let section_syntax_indicator = (section[1] & 0x80) != 0;
        let bit_0 = (section[1] & 0x40) != 0;
        if !section_syntax_indicator {
            return Err(VdkError::InvalidStructural(
                "section_syntax_indicator must be 1".into(),
            ));
        }
        if bit_0 {
            return Err(VdkError::InvalidStructural("reserved bit_0 must be 0".into()));
        }
        Ok(())
    }

    fn section_length(section: &[u8]) -> Result<usize> {
        Ok((((section[1] as usize) & 0x0F) << 8) | section[2] as usize)
    }

    fn verify_crc(&self, section: &[u8], total_length: usize) -> Result<()> {
        if self.crc_policy == CrcPolicy::Ignore {
            return Ok(());
        }
        let crc_offset = total_length - 4;
        let expected = u32::from_be_bytes([
            section[crc_offset],
            section[crc_offset + 1],
            section[crc_offset + 2],
            section[crc_offset + 3],
        ]);
        let actual = self.crc.calculate(&section[..crc_offset]);
        if actual != expected {
            return Err(VdkError::InvalidStructural(format!(
                "PSI CRC mismatch: expected {:#010x}, computed {:#010x}",
                expected, actual
            )));
        }
        Ok(())
    }

    fn parse_descriptor_loop(&self, data: &[u8]) -> Result<Vec<Descriptor>> {
        let mut descriptors = Vec::new();
        let mut pos = 0;

        while pos + 2 <= data.len() {
            let tag = data[pos];
            let length = data[pos + 1] as usize;
            pos += 2;

            if pos + length > data.len() {
                return Err(VdkError::ReadPastEnd("descriptor body exceeds loop".into()));
            }
            let body = &data[pos..pos + length];

            let payload = match self.dispatch_descriptor(tag, body)? {
                Some(payload) => Some(payload),
                None => None,
            };

            descriptors.push(Descriptor {
                tag,
                data: body.to_vec(),
                total_length: length + 2,
                payload,
            });
            pos += length;
        }

        Ok(descriptors)
    }

    fn dispatch_descriptor(&self, tag: u8, body: &[u8]) -> Result<Option<DescriptorPayload>> {
        use super::types::{
            DESCRIPTOR_TAGS_OPAQUE, DESCRIPTOR_TAG_CA, DESCRIPTOR_TAG_DVB_SERVICE,
            DESCRIPTOR_TAG_DVB_STREAM_IDENTIFIER, DESCRIPTOR_TAG_ISO_639_LANGUAGE,
        };

        if tag == DESCRIPTOR_TAG_CA {
            return Ok(Some(DescriptorPayload::ConditionalAccess));
        }
        if tag == DESCRIPTOR_TAG_ISO_639_LANGUAGE {
            let mut entries = Vec::new();
            let mut pos = 0;
            while pos + 4 <= body.len() {
                entries.push(LanguageEntry {
                    language_code: [body[pos], body[pos + 1], body[pos + 2]],
                    audio_type: body[pos + 3],
                });
                pos += 4;
            }
            return Ok(Some(DescriptorPayload::Iso639Language(entries)));
        }
        if tag == DESCRIPTOR_TAG_DVB_SERVICE {
            if body.is_empty() {
                return Err(VdkError::ReadPastEnd("DVB service descriptor truncated".into()));
            }
            let service_type = body[0];
            let mut pos = 1;
            if pos >= body.len() {
                return Err(VdkError::ReadPastEnd("DVB service descriptor truncated".into()));
            }
            let provider_len = body[pos] as usize;
            pos += 1;
            if pos + provider_len > body.len() {
                return Err(VdkError::ReadPastEnd("service_provider_name exceeds descriptor".into()));
            }
            let service_provider_name = body[pos..pos + provider_len].to_vec();
            pos += provider_len;
            if pos >= body.len() {
                return Err(VdkError::ReadPastEnd("DVB service descriptor truncated".into()));
            }
            let name_len = body[pos] as usize;
            pos += 1;
            if pos + name_len > body.len() {
                return Err(VdkError::ReadPastEnd("service_name exceeds descriptor".into()));
            }
            let service_name = body[pos..pos + name_len].to_vec();
            return Ok(Some(DescriptorPayload::DvbService {
                service_type,
                service_provider_name,
                service_name,
            }));
        }
        if tag == DESCRIPTOR_TAG_DVB_STREAM_IDENTIFIER {
            if body.is_empty() {
                return Err(VdkError::ReadPastEnd("stream identifier descriptor truncated".into()));
            }
            return Ok(Some(DescriptorPayload::DvbStreamIdentifier {
                component_tag: body[0],
            }));
        }
        if DESCRIPTOR_TAGS_OPAQUE.contains(&tag) {
            return Ok(Some(DescriptorPayload::Opaque));
        }

        match self.descriptor_leniency {
            DescriptorLeniency::Strict => Err(VdkError::UnsupportedDescriptor(tag)),
            DescriptorLeniency::Lenient => {
                warn!("skipping unsupported descriptor tag 0x{:02x}", tag);
                Ok(None)
            }
        }
    }
}
