//! Opaque AAC AudioSpecificConfig production, consumed by the SDP codec's
//! `fmtp` `config=` attribute.
//!
//! AAC framing and ADTS demuxing are out of scope for this crate; this
//! module exists only because the sampling-frequency table and object
//! type enum it needs already live in [`crate::codec::aac::types`], so a
//! literal opaque-blob stub would not exercise that table.

use crate::codec::aac::types::ProfileType;

/// Parameters needed to synthesize an AudioSpecificConfig, per ISO/IEC
/// 14496-3.
#[derive(Debug, Clone, Copy)]
pub struct AudioSpecificConfigParams {
    /// MPEG-4 audio object type (1=Main, 2=LC, 3=SSR, 4=LTP, 5=SBR, 29=PS).
    pub object_type: u8,
    /// Sampling frequency in Hz; mapped to the standard 13-entry table.
    pub sampling_frequency: u32,
    /// Channel configuration (1-7; 0 = defined by PCE, not supported here).
    pub channels: u8,
    /// Frame length in samples; only 1024 (standard) and 960 are legal.
    pub frame_length: u16,
}

/// Produces an opaque AudioSpecificConfig byte blob from
/// [`AudioSpecificConfigParams`]. The demuxer and SDP codec never inspect
/// the returned bytes beyond hex-encoding them.
pub trait AudioSpecificConfigEncoder {
    /// Encodes `params` into an AudioSpecificConfig blob.
    fn encode(&self, params: &AudioSpecificConfigParams) -> crate::Result<Vec<u8>>;
}

fn sampling_frequency_index(hz: u32) -> Option<u8> {
    // Mirrors ADTSHeader::sample_rate's table, inverted.
    let table = [
        96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
    ];
    table.iter().position(|&f| f == hz).map(|i| i as u8)
}

/// The crate's one production `AudioSpecificConfigEncoder`, implementing
/// the standard GASpecificConfig bit layout (2 bytes for plain object
/// types; 5 bytes when `object_type` is an SBR/PS extension type, per the
/// extended-ASC layout used for HE-AAC/HE-AACv2).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAscEncoder;

impl AudioSpecificConfigEncoder for StandardAscEncoder {
    fn encode(&self, params: &AudioSpecificConfigParams) -> crate::Result<Vec<u8>> {
        let sample_rate_index = sampling_frequency_index(params.sampling_frequency).ok_or_else(|| {
            crate::VdkError::InvalidData(format!(
                "unsupported AAC sampling frequency: {} Hz",
                params.sampling_frequency
            ))
        })?;

        if params.channels == 0 || params.channels > 7 {
            return Err(crate::VdkError::InvalidData(format!(
                "unsupported AAC channel configuration: {}",
                params.channels
            )));
        }
        let frame_length_flag: u8 = match params.frame_length {
            1024 => 0,
            960 => 1,
            other => {
                return Err(crate::VdkError::InvalidData(format!(
                    "unsupported AAC frame length: {}",
                    other
                )))
            }
        };

        let base_object_type = if params.object_type == 5 || params.object_type == 29 {
            // HE-AAC(v2): base object type for the extension ASC is LC.
            ProfileType::LC as u8 + 1
        } else {
            params.object_type
        };

        let mut bits: u32 = 0;
        let mut nbits: u32 = 0;
        let mut push = |value: u32, width: u32, bits: &mut u32, nbits: &mut u32| {
            *bits = (*bits << width) | (value & ((1 << width) - 1));
            *nbits += width;
        };

        push(base_object_type as u32, 5, &mut bits, &mut nbits);
        push(sample_rate_index as u32, 4, &mut bits, &mut nbits);
        push(params.channels as u32, 4, &mut bits, &mut nbits);
        push(frame_length_flag as u32, 1, &mut bits, &mut nbits); // frameLengthFlag
        push(0, 1, &mut bits, &mut nbits); // dependsOnCoreCoder
        push(0, 1, &mut bits, &mut nbits); // extensionFlag

        let mut out = pack_bits(bits, nbits);

        if params.object_type == 5 || params.object_type == 29 {
            let ext_sample_rate_index = sample_rate_index; // no separate resampling in this seam
            let mut ext_bits: u32 = 0;
            let mut ext_nbits: u32 = 0;
            push(0x2B, 11, &mut ext_bits, &mut ext_nbits); // syncExtensionType
            push(params.object_type as u32, 5, &mut ext_bits, &mut ext_nbits);
            push(1, 1, &mut ext_bits, &mut ext_nbits); // sbrPresentFlag
            push(ext_sample_rate_index as u32, 4, &mut ext_bits, &mut ext_nbits);
            out.extend(pack_bits(ext_bits, ext_nbits));
        }

        Ok(out)
    }
}

fn pack_bits(bits: u32, nbits: u32) -> Vec<u8> {
    let total_bytes = (nbits as usize + 7) / 8;
    let padded_bits = bits << (total_bytes * 8 - nbits as usize);
    padded_bits.to_be_bytes()[4 - total_bytes..].to_vec()
}
