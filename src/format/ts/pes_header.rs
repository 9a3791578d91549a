use crate::error::{Result, VdkError};
use crate::utils::BitReader;

/// Elementary stream kind classified from a PES `stream_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `stream_id & 0xF0 == 0xE0`.
    Video,
    /// `stream_id & 0xE0 == 0xC0`.
    Audio,
    /// Neither pattern matched; the scheduler drops these.
    Other,
}

/// Trick-mode sub-decode of `DSM_trick_mode_control`, per ISO/IEC 13818-1
/// Table 2-20. Carried but not acted on: trick-mode playback is out of
/// scope.
#[derive(Debug, Clone, Copy)]
pub enum TrickMode {
    /// Fast forward: field_id, intra_slice_refresh, frequency_truncation.
    FastForward { field_id: u8, intra_slice_refresh: bool, frequency_truncation: u8 },
    /// Slow motion: rep_cntrl (6 bits).
    SlowMotion { rep_cntrl: u8 },
    /// Freeze frame: field_id (2 bits).
    FreezeFrame { field_id: u8 },
    /// Fast reverse: same shape as fast forward.
    FastReverse { field_id: u8, intra_slice_refresh: bool, frequency_truncation: u8 },
    /// Slow reverse: rep_cntrl (6 bits).
    SlowReverse { rep_cntrl: u8 },
}

/// Fully decoded PES header plus the raw elementary-stream payload bytes
/// that follow it.
#[derive(Debug)]
pub struct PesHeader<'a> {
    /// Stream ID byte (classifies audio/video and distinguishes reserved
    /// stream ids that carry no optional field matrix).
    pub stream_id: u8,
    /// Stream kind derived from `stream_id`.
    pub kind: StreamKind,
    /// Presentation timestamp (90kHz, 33-bit), when present.
    pub pts: Option<u64>,
    /// Decoding timestamp (90kHz, 33-bit). Defaults to `pts` when the PES
    /// carried only a PTS.
    pub dts: Option<u64>,
    /// Elementary Stream Clock Reference, when present.
    pub escr: Option<u64>,
    /// ES rate field (22-bit), when present.
    pub es_rate: Option<u32>,
    /// Trick mode sub-decode, when present.
    pub trick_mode: Option<TrickMode>,
    /// Remaining payload bytes (the access unit data).
    pub payload: &'a [u8],
}

const RESERVED_STREAM_IDS: [u8; 8] = [0xBC, 0xBE, 0xBF, 0xF0, 0xF1, 0xF2, 0xF8, 0xFF];

fn classify(stream_id: u8) -> StreamKind {
    if stream_id & 0xF0 == 0xE0 {
        StreamKind::Video
    } else if stream_id & 0xE0 == 0xC0 {
        StreamKind::Audio
    } else {
        StreamKind::Other
    }
}

/// Decodes a PES header from `data` (starting at `packet_start_code_prefix`),
/// returning the header plus a borrowed slice for its payload.
///
/// `max_payload` bounds how much data an unbounded (`PES_packet_length == 0`)
/// video PES may claim, per §4.5 and the `VDKIO_MAX_PES_PAYLOAD` tunable.
pub fn decode_pes_header(data: &[u8], max_payload: usize) -> Result<PesHeader<'_>> {
    let mut reader = BitReader::new(data);

    let prefix = reader.read_bits(24)?;
    if prefix != 0x000001 {
        return Err(VdkError::InvalidStructural(format!(
            "packet_start_code_prefix was 0x{:06x}, expected 0x000001",
            prefix
        )));
    }
    let stream_id = reader.read_byte()?;
    let pes_packet_length = reader.read_bits(16)? as usize;

    let kind = classify(stream_id);

    if RESERVED_STREAM_IDS.contains(&stream_id) {
        let payload = remaining_payload(data, &reader, pes_packet_length, max_payload)?;
        return Ok(PesHeader {
            stream_id,
            kind,
            pts: None,
            dts: None,
            escr: None,
            es_rate: None,
            trick_mode: None,
            payload,
        });
    }

    let marker = reader.read_bits(2)?;
    if marker != 0b10 {
        return Err(VdkError::InvalidStructural(format!(
            "expected '10' marker bits, found {:02b}",
            marker
        )));
    }
    let _scrambling_control = reader.read_bits(2)?;
    let _priority = reader.read_bit()?;
    let _data_alignment_indicator = reader.read_bit()?;
    let _copyright = reader.read_bit()?;
    let _original_or_copy = reader.read_bit()?;
    let pts_dts_flags = reader.read_bits(2)?;
    let escr_flag = reader.read_bit()? != 0;
    let es_rate_flag = reader.read_bit()? != 0;
    let dsm_trick_mode_flag = reader.read_bit()? != 0;
    let additional_copy_info_flag = reader.read_bit()? != 0;
    let pes_crc_flag = reader.read_bit()? != 0;
    let pes_extension_flag = reader.read_bit()? != 0;
    let pes_header_data_length = reader.read_byte()? as usize;

    let header_data_start = reader.position_bytes();

    let mut pts = None;
    let mut dts = None;

    match pts_dts_flags {
        0b10 => {
            pts = Some(decode_timestamp(&mut reader, 0b0010)?);
        }
        0b11 => {
            pts = Some(decode_timestamp(&mut reader, 0b0011)?);
            dts = Some(decode_timestamp(&mut reader, 0b0001)?);
        }
        _ => {}
    }

    let mut escr = None;
    if escr_flag {
        reader.skip_bits(2)?; // reserved
        let b1 = decode_timestamp_group(&mut reader)?;
        reader.skip_bits(1)?; // marker
        let ext = reader.read_bits(9)?;
        escr = Some((b1 << 9) | ext as u64);
    }

    let mut es_rate = None;
    if es_rate_flag {
        reader.skip_bits(1)?; // marker
        es_rate = Some(reader.read_bits(22)?);
        reader.skip_bits(1)?; // marker
    }

    let mut trick_mode = None;
    if dsm_trick_mode_flag {
        let control = reader.read_bits(3)? as u8;
        trick_mode = Some(match control {
            0b000 | 0b011 => {
                let field_id = reader.read_bits(2)? as u8;
                let intra_slice_refresh = reader.read_bit()? != 0;
                let frequency_truncation = reader.read_bits(2)? as u8;
                if control == 0b000 {
                    TrickMode::FastForward {
                        field_id,
                        intra_slice_refresh,
                        frequency_truncation,
                    }
                } else {
                    TrickMode::FastReverse {
                        field_id,
                        intra_slice_refresh,
                        frequency_truncation,
                    }
                }
            }
            0b001 => TrickMode::SlowMotion {
                rep_cntrl: reader.read_bits(5)? as u8,
            },
            0b010 => {
                let field_id = reader.read_bits(2)? as u8;
                reader.skip_bits(3)?;
                TrickMode::FreezeFrame { field_id }
            }
            0b100 => TrickMode::SlowReverse {
                rep_cntrl: reader.read_bits(5)? as u8,
            },
            _ => {
                reader.skip_bits(5)?;
                TrickMode::FreezeFrame { field_id: 0 }
            }
        });
    }

    if additional_copy_info_flag {
        reader.skip_bits(8)?;
    }

    if pes_crc_flag {
        reader.skip_bits(16)?;
    }

    if pes_extension_flag {
        let pes_private_data_flag = reader.read_bit()? != 0;
        let pack_header_field_flag = reader.read_bit()? != 0;
        let program_packet_sequence_counter_flag = reader.read_bit()? != 0;
        let p_std_buffer_flag = reader.read_bit()? != 0;
        reader.skip_bits(3)?; // reserved
        let pes_extension_flag_2 = reader.read_bit()? != 0;

        if pes_private_data_flag {
            reader.skip_bytes(16)?;
        }
        if pack_header_field_flag {
            let pack_field_length = reader.read_byte()? as usize;
            reader.skip_bytes(pack_field_length)?;
        }
        if program_packet_sequence_counter_flag {
            reader.skip_bytes(2)?;
        }
        if p_std_buffer_flag {
            reader.skip_bytes(2)?;
        }
        if pes_extension_flag_2 {
            let marker_and_length = reader.read_byte()?;
            let stream_id_extension_flag = (marker_and_length & 0x80) != 0;
            if stream_id_extension_flag {
                return Err(VdkError::ReservedValue(
                    "stream_id_extension_flag = 1 is reserved".into(),
                ));
            }
            let extension_field_length = (marker_and_length & 0x7f) as usize;
            reader.skip_bytes(extension_field_length)?;
        }
    }

    let consumed_header_data = reader.position_bytes() - header_data_start;
    if consumed_header_data < pes_header_data_length {
        reader.skip_bytes(pes_header_data_length - consumed_header_data)?;
    }

    let payload = remaining_payload(data, &reader, pes_packet_length, max_payload)?;

    Ok(PesHeader {
        stream_id,
        kind,
        pts,
        dts: dts.or(pts),
        escr,
        es_rate,
        trick_mode,
        payload,
    })
}

fn decode_timestamp(reader: &mut BitReader<'_>, expected_marker: u8) -> Result<u64> {
    let marker = reader.read_bits(4)? as u8;
    if marker != expected_marker {
        return Err(VdkError::InvalidStructural(format!(
            "expected PTS/DTS marker {:04b}, found {:04b}",
            expected_marker, marker
        )));
    }
    decode_timestamp_group(reader)
}

/// Reads the `bits(3)<<30 | bits(15)<<15 | bits(15)` timestamp body (the
/// 4-bit leading marker, if any, must already be consumed by the caller).
fn decode_timestamp_group(reader: &mut BitReader<'_>) -> Result<u64> {
    let high = reader.read_bits(3)? as u64;
    reader.skip_bits(1)?; // marker_bit
    let mid = reader.read_bits(15)? as u64;
    reader.skip_bits(1)?; // marker_bit
    let low = reader.read_bits(15)? as u64;
    reader.skip_bits(1)?; // marker_bit
    Ok((high << 30) | (mid << 15) | low)
}

fn remaining_payload<'a>(
    data: &'a [u8],
    reader: &BitReader<'a>,
    pes_packet_length: usize,
    max_payload: usize,
) -> Result<&'a [u8]> {
    let consumed = reader.position_bytes();
    if pes_packet_length == 0 {
        let end = data.len().min(consumed + max_payload);
        return Ok(&data[consumed..end]);
    }
    let packet_end = 6 + pes_packet_length; // stream_id+length fields occupy 6 bytes before the header body
    if packet_end < consumed {
        return Err(VdkError::InvalidStructural(
            "PES_packet_length smaller than decoded header".into(),
        ));
    }
    let end = packet_end.min(data.len());
    Ok(&data[consumed..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_timestamp(marker4: u8, value: u64) -> [u8; 5] {
        let high = ((value >> 30) & 0x7) as u8;
        let mid = ((value >> 15) & 0x7fff) as u16;
        let low = (value & 0x7fff) as u16;
        [
            (marker4 << 4) | (high << 1) | 1,
            (mid >> 7) as u8,
            (((mid & 0x7f) as u8) << 1) | 1,
            (low >> 7) as u8,
            (((low & 0x7f) as u8) << 1) | 1,
        ]
    }

    #[test]
    fn test_decode_video_pes_with_pts_only() {
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let ts = encode_timestamp(0b0010, 90000);
        let mut data = vec![0x00, 0x00, 0x01, 0xE0];
        let optional_len = 3 + 5; // fixed flags + PTS
        let pes_packet_length = optional_len + payload.len();
        data.extend_from_slice(&(pes_packet_length as u16).to_be_bytes());
        data.push(0b1000_0000); // marker '10', rest 0
        data.push(0b0010_0000); // PTS_DTS_flags = 10
        data.push(5); // pes_header_data_length
        data.extend_from_slice(&ts);
        data.extend_from_slice(&payload);

        let header = decode_pes_header(&data, 200 * 1024).unwrap();
        assert_eq!(header.stream_id, 0xE0);
        assert_eq!(header.kind, StreamKind::Video);
        assert_eq!(header.pts, Some(90000));
        assert_eq!(header.dts, Some(90000));
        assert_eq!(header.payload, &payload);
    }

    #[test]
    fn test_decode_with_pts_and_dts() {
        let payload = [0x01, 0x02];
        let pts_bytes = encode_timestamp(0b0011, 180000);
        let dts_bytes = encode_timestamp(0b0001, 90000);
        let mut data = vec![0x00, 0x00, 0x01, 0xC0];
        let optional_len = 3 + 10;
        let pes_packet_length = optional_len + payload.len();
        data.extend_from_slice(&(pes_packet_length as u16).to_be_bytes());
        data.push(0b1000_0000);
        data.push(0b1100_0000); // PTS_DTS_flags = 11
        data.push(10);
        data.extend_from_slice(&pts_bytes);
        data.extend_from_slice(&dts_bytes);
        data.extend_from_slice(&payload);

        let header = decode_pes_header(&data, 200 * 1024).unwrap();
        assert_eq!(header.kind, StreamKind::Audio);
        assert_eq!(header.pts, Some(180000));
        assert_eq!(header.dts, Some(90000));
        assert_eq!(header.payload, &payload);
    }

    #[test]
    fn test_unbounded_video_caps_at_max_payload() {
        let payload = vec![0xAAu8; 100];
        let mut data = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00]; // length = 0
        data.push(0b1000_0000);
        data.push(0b0000_0000); // no PTS/DTS
        data.push(0);
        data.extend_from_slice(&payload);

        let header = decode_pes_header(&data, 50).unwrap();
        assert_eq!(header.payload.len(), 50);
    }

    #[test]
    fn test_reserved_stream_id_has_no_optional_fields() {
        let payload = [0x01, 0x02, 0x03];
        let mut data = vec![0x00, 0x00, 0x01, 0xBC];
        data.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        data.extend_from_slice(&payload);

        let header = decode_pes_header(&data, 200 * 1024).unwrap();
        assert_eq!(header.kind, StreamKind::Other);
        assert!(header.pts.is_none());
        assert_eq!(header.payload, &payload);
    }

    #[test]
    fn test_bad_start_code_is_structural_error() {
        let data = [0x00, 0x00, 0x02, 0xE0];
        let err = decode_pes_header(&data, 1024).unwrap_err();
        assert!(matches!(err, VdkError::InvalidStructural(_)));
    }
}
