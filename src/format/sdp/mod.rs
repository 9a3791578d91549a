//! RFC 4566 Session Description Protocol generation and parsing.
//!
//! Generation is driven by [`SdpOptions`] and produces the exact CRLF-
//! terminated line template the demuxer advertises to an RTSP/RTP peer.
//! Parsing accepts both LF and CRLF line endings and never fails on an
//! unrecognized line type, only on a structurally malformed one.

use crate::aac::{AudioSpecificConfigEncoder, AudioSpecificConfigParams};
use crate::error::{Result, VdkError};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

/// `addrtype` token used in `o=`/`c=` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// IPv4.
    IP4,
    /// IPv6.
    IP6,
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressType::IP4 => "IP4",
            AddressType::IP6 => "IP6",
        })
    }
}

/// Audio media options for [`SdpOptions`].
#[derive(Debug, Clone)]
pub struct AudioOptions {
    /// RTP payload type.
    pub payload_type: u8,
    /// `rtpmap` encoding name, e.g. "MPEG4-GENERIC".
    pub encoding_name: String,
    /// `rtpmap` clock rate.
    pub clock_rate: u32,
    /// `rtpmap` channel count, when present.
    pub channels: Option<u8>,
    /// Sampling rate fed to the AudioSpecificConfig encoder, if `specific_config` is absent.
    pub sample_rate: Option<u32>,
    /// MPEG-4 audio object type fed to the AudioSpecificConfig encoder.
    pub object_type: Option<u8>,
    /// A pre-built AudioSpecificConfig blob; takes precedence over `object_type`/`sample_rate`.
    pub specific_config: Option<Vec<u8>>,
}

/// Video media options for [`SdpOptions`].
#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// RTP payload type.
    pub payload_type: u8,
    /// `rtpmap` encoding name, e.g. "H264".
    pub encoding_name: String,
    /// `rtpmap` clock rate.
    pub clock_rate: u32,
    /// `fmtp` `profile-level-id`, as hex.
    pub profile_level_id: Option<String>,
    /// `fmtp` `sprop-parameter-sets`, comma-separated base64 SPS/PPS.
    pub sprop_parameter_sets: Option<String>,
    /// Frame height, for `a=cliprect`/`a=framesize`.
    pub height: Option<u32>,
    /// Frame width, for `a=cliprect`/`a=framesize`.
    pub width: Option<u32>,
    /// Frame rate, for `a=framerate`.
    pub frame_rate: Option<f64>,
}

/// Options accepted by [`generate`].
#[derive(Debug, Clone)]
pub struct SdpOptions {
    /// `o=` username field.
    pub username: String,
    /// `o=` session id field.
    pub session_id: String,
    /// `o=` session version field.
    pub session_version: String,
    /// `o=`/`c=` addrtype.
    pub address_type: AddressType,
    /// `o=`/`c=` unicast address.
    pub unicast_address: String,
    /// Whether to emit an audio media section.
    pub has_audio: bool,
    /// Audio options; required when `has_audio` is true.
    pub audio: Option<AudioOptions>,
    /// Whether to emit a video media section.
    pub has_video: bool,
    /// Video options; required when `has_video` is true.
    pub video: Option<VideoOptions>,
    /// Session duration in seconds, for `a=range:npt=0.0-<duration>`.
    pub duration_seconds: Option<f64>,
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Generates an SDP document per §4.7, using `encoder` to synthesize an
/// AudioSpecificConfig when `audio.specific_config` is absent.
pub fn generate(options: &SdpOptions, encoder: &dyn AudioSpecificConfigEncoder) -> Result<String> {
    if options.username.is_empty() {
        return Err(VdkError::MissingOption("username".into()));
    }
    if options.session_id.is_empty() {
        return Err(VdkError::MissingOption("session_id".into()));
    }
    if options.session_version.is_empty() {
        return Err(VdkError::MissingOption("session_version".into()));
    }
    if options.unicast_address.is_empty() {
        return Err(VdkError::MissingOption("unicast_address".into()));
    }

    let at = options.address_type;
    let addr = &options.unicast_address;
    let duration = options
        .duration_seconds
        .map(|d| d.to_string())
        .unwrap_or_default();

    let mut lines = vec![
        "v=0".to_string(),
        format!(
            "o={} {} {} IN {} {}",
            options.username, options.session_id, options.session_version, at, addr
        ),
        "s= ".to_string(),
        format!("c=IN {} {}", at, addr),
        "t=0 0".to_string(),
        "a=sdplang:en".to_string(),
        format!("a=range:npt=0.0-{}", duration),
        "a=control:*".to_string(),
    ];

    if options.has_audio {
        let audio = options
            .audio
            .as_ref()
            .ok_or_else(|| VdkError::MissingOption("audio".into()))?;

        lines.push(format!("m=audio 0 RTP/AVP {}", audio.payload_type));
        lines.push(match audio.channels {
            Some(ch) => format!(
                "a=rtpmap:{} {}/{}/{}",
                audio.payload_type, audio.encoding_name, audio.clock_rate, ch
            ),
            None => format!(
                "a=rtpmap:{} {}/{}",
                audio.payload_type, audio.encoding_name, audio.clock_rate
            ),
        });

        let mut fmtp = format!(
            "a=fmtp:{} profile-level-id=1;mode=AAC-hbr;sizeLength=13;indexLength=3;indexDeltaLength=3",
            audio.payload_type
        );
        let config_bytes = match &audio.specific_config {
            Some(bytes) => Some(bytes.clone()),
            None => match (audio.object_type, audio.sample_rate) {
                (Some(object_type), Some(sampling_frequency)) => Some(encoder.encode(&AudioSpecificConfigParams {
                    object_type,
                    sampling_frequency,
                    channels: audio.channels.unwrap_or(2),
                    frame_length: 1024,
                })?),
                _ => None,
            },
        };
        if let Some(bytes) = config_bytes {
            fmtp.push_str(&format!(";config={}", to_hex(&bytes)));
        }
        lines.push(fmtp);
        lines.push("a=control:trackID=1".to_string());
    }

    if options.has_video {
        let video = options
            .video
            .as_ref()
            .ok_or_else(|| VdkError::MissingOption("video".into()))?;

        lines.push(format!("m=video 0 RTP/AVP {}", video.payload_type));
        lines.push(format!(
            "a=rtpmap:{} {}/{}",
            video.payload_type, video.encoding_name, video.clock_rate
        ));

        let mut fmtp = format!("a=fmtp:{} packetization-mode=1", video.payload_type);
        if let Some(pli) = &video.profile_level_id {
            fmtp.push_str(&format!(";profile-level-id={}", pli));
        }
        if let Some(sps) = &video.sprop_parameter_sets {
            fmtp.push_str(&format!(";sprop-parameter-sets={}", sps));
        }
        lines.push(fmtp);

        if let (Some(w), Some(h)) = (video.width, video.height) {
            lines.push(format!("a=cliprect:0,0,{},{}", h, w));
            lines.push(format!("a=framesize:{} {}-{}", video.payload_type, w, h));
        }
        if let Some(fr) = video.frame_rate {
            lines.push(format!("a=framerate:{}", fr));
        }
        lines.push("a=control:trackID=2".to_string());
    }

    Ok(lines.join("\r\n") + "\r\n")
}

/// SDP origin line fields.
#[derive(Debug, Clone, Default)]
pub struct Origin {
    /// `o=` username.
    pub username: String,
    /// `o=` session id.
    pub sess_id: String,
    /// `o=` session version.
    pub sess_version: String,
    /// `o=` nettype, normally "IN".
    pub nettype: String,
    /// `o=` addrtype, "IP4" or "IP6".
    pub addrtype: String,
    /// `o=` unicast address.
    pub unicast_address: String,
}

/// SDP timing line fields.
#[derive(Debug, Clone, Default)]
pub struct Timing {
    /// `t=` start time.
    pub start: String,
    /// `t=` stop time.
    pub stop: String,
}

/// Format/payload type token from an `m=` line.
///
/// `RTP/AVP` and `RTP/SAVP` carry a numeric RTP payload type per RFC 4566;
/// any other transport protocol's format token is kept as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFormat {
    /// Numeric RTP payload type.
    PayloadType(u8),
    /// Opaque format token, for transports other than `RTP/AVP`/`RTP/SAVP`.
    Token(String),
}

impl Default for MediaFormat {
    fn default() -> Self {
        MediaFormat::Token(String::new())
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFormat::PayloadType(pt) => write!(f, "{}", pt),
            MediaFormat::Token(s) => write!(f, "{}", s),
        }
    }
}

fn parse_fmt(proto: &str, token: &str) -> MediaFormat {
    if matches!(proto, "RTP/AVP" | "RTP/SAVP") {
        if let Ok(pt) = token.parse::<u8>() {
            return MediaFormat::PayloadType(pt);
        }
    }
    MediaFormat::Token(token.to_string())
}

/// One parsed media section.
#[derive(Debug, Clone, Default)]
pub struct ParsedMedia {
    /// Media type, e.g. "audio"/"video".
    pub media: String,
    /// Port number.
    pub port: u16,
    /// Transport protocol, e.g. "RTP/AVP".
    pub proto: String,
    /// Format/payload type, coerced to [`MediaFormat::PayloadType`] when
    /// `proto` is `RTP/AVP`/`RTP/SAVP`.
    pub fmt: MediaFormat,
    /// `b=` bandwidth, `<bwtype>:<bandwidth>`.
    pub bandwidth: Option<String>,
    /// Raw attribute map (key -> value, or "true" for flag attributes).
    pub attributes: HashMap<String, String>,
    /// Parsed `fmtp` parameters, keys lower-cased.
    pub fmtp_params: HashMap<String, String>,
    /// `rtpmap` clock rate, when an `a=rtpmap` line was seen.
    pub clock_rate: Option<u32>,
    /// `rtpmap` channel count, when present.
    pub audio_channels: Option<u8>,
}

/// A parsed SDP document.
#[derive(Debug, Clone, Default)]
pub struct SdpSession {
    /// `v=` version.
    pub version: i32,
    /// `o=` origin fields.
    pub origin: Option<Origin>,
    /// `s=` session name.
    pub session_name: Option<String>,
    /// `c=` connection data: (nettype, addrtype, connection_address).
    pub connection: Option<(String, String, String)>,
    /// `t=` timing.
    pub timing: Option<Timing>,
    /// Session-level attribute map.
    pub attributes: HashMap<String, String>,
    /// Media sections, in document order.
    pub media: Vec<ParsedMedia>,
}

fn apply_rtpmap(target_attrs: &mut HashMap<String, String>, clock_rate: &mut Option<u32>, channels: &mut Option<u8>, value: &str) {
    // value: "<pt> <enc>/<rate>[/<ch>]"
    let Some((_pt, rest)) = value.split_once(' ') else {
        target_attrs.insert("rtpmap".into(), value.to_string());
        return;
    };
    target_attrs.insert("rtpmap".into(), value.to_string());
    let mut parts = rest.splitn(3, '/');
    let _encoding = parts.next();
    if let Some(rate) = parts.next() {
        if let Ok(rate) = rate.trim().parse::<u32>() {
            *clock_rate = Some(rate);
        }
    }
    if let Some(ch) = parts.next() {
        if let Ok(ch) = ch.trim().parse::<u8>() {
            *channels = Some(ch);
        }
    }
}

fn apply_fmtp(fmtp_params: &mut HashMap<String, String>, value: &str) {
    // value: "<pt> k1=v1;k2=v2"
    let params_str = value.split_once(' ').map(|(_, p)| p).unwrap_or("");
    for param in params_str.split(';') {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        if let Some((k, v)) = param.split_once('=') {
            fmtp_params.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
}

/// Parses an SDP document. Accepts both LF and CRLF line endings.
pub fn parse(text: &str) -> Result<SdpSession> {
    let mut session = SdpSession::default();
    let mut current: Option<ParsedMedia> = None;

    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .filter(|(k, _)| k.len() == 1)
            .ok_or_else(|| VdkError::InvalidLine(line.to_string()))?;

        match key {
            "v" => {
                session.version = value.trim().parse().unwrap_or(0);
            }
            "o" => {
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() > 6 {
                    warn!("SDP o= line has more than 6 fields, keeping the first six");
                }
                if parts.len() >= 6 {
                    session.origin = Some(Origin {
                        username: parts[0].to_string(),
                        sess_id: parts[1].to_string(),
                        sess_version: parts[2].to_string(),
                        nettype: parts[3].to_string(),
                        addrtype: parts[4].to_string(),
                        unicast_address: parts[5].to_string(),
                    });
                }
            }
            "s" => session.session_name = Some(value.to_string()),
            "c" => {
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() > 3 {
                    warn!("SDP c= line has more than 3 fields, keeping the first three");
                }
                if parts.len() >= 3 {
                    session.connection = Some((parts[0].to_string(), parts[1].to_string(), parts[2].to_string()));
                }
            }
            "t" => {
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() >= 2 {
                    session.timing = Some(Timing {
                        start: parts[0].to_string(),
                        stop: parts[1].to_string(),
                    });
                }
            }
            "m" => {
                if let Some(media) = current.take() {
                    session.media.push(media);
                }
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() < 4 {
                    return Err(VdkError::InvalidLine(line.to_string()));
                }
                let proto = parts[2].to_string();
                let port = parts[1].parse::<u16>().map_err(|_| VdkError::InvalidLine(line.to_string()))?;
                current = Some(ParsedMedia {
                    media: parts[0].to_string(),
                    port,
                    fmt: parse_fmt(&proto, parts[3]),
                    proto,
                    ..Default::default()
                });
            }
            "a" => {
                let (attr_key, attr_val) = match value.split_once(':') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (value.to_string(), "true".to_string()),
                };
                if let Some(media) = current.as_mut() {
                    match attr_key.as_str() {
                        "rtpmap" => apply_rtpmap(&mut media.attributes, &mut media.clock_rate, &mut media.audio_channels, &attr_val),
                        "fmtp" => {
                            media.attributes.insert(attr_key, attr_val.clone());
                            apply_fmtp(&mut media.fmtp_params, &attr_val);
                        }
                        _ => {
                            media.attributes.insert(attr_key, attr_val);
                        }
                    }
                } else {
                    session.attributes.insert(attr_key, attr_val);
                }
            }
            "b" => {
                if let Some(media) = current.as_mut() {
                    media.bandwidth = Some(value.to_string());
                }
            }
            other => {
                debug!("ignoring unrecognized SDP line type '{}'", other);
            }
        }
    }

    if let Some(media) = current.take() {
        session.media.push(media);
    }

    Ok(session)
}

impl SdpSession {
    /// Returns the first media section of `media_type` ("audio"/"video"), if any.
    pub fn get_media(&self, media_type: &str) -> Option<&ParsedMedia> {
        self.media.iter().find(|m| m.media == media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::StandardAscEncoder;

    fn base_options() -> SdpOptions {
        SdpOptions {
            username: "-".into(),
            session_id: "0".into(),
            session_version: "0".into(),
            address_type: AddressType::IP4,
            unicast_address: "127.0.0.1".into(),
            has_audio: false,
            audio: None,
            has_video: false,
            video: None,
            duration_seconds: None,
        }
    }

    #[test]
    fn test_generate_ends_with_crlf_and_no_bare_lf() {
        let options = base_options();
        let sdp = generate(&options, &StandardAscEncoder).unwrap();
        assert!(sdp.ends_with("\r\n"));
        assert!(!sdp.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_missing_video_options_is_missing_option() {
        let mut options = base_options();
        options.has_video = true;
        let err = generate(&options, &StandardAscEncoder).unwrap_err();
        assert!(matches!(err, VdkError::MissingOption(ref f) if f == "video"));
    }

    #[test]
    fn test_video_round_trip_scenario_s6() {
        let mut options = base_options();
        options.has_video = true;
        options.video = Some(VideoOptions {
            payload_type: 96,
            encoding_name: "H264".into(),
            clock_rate: 90000,
            profile_level_id: None,
            sprop_parameter_sets: Some("Z0IAFbtA,aM4H".into()),
            height: None,
            width: None,
            frame_rate: None,
        });

        let sdp = generate(&options, &StandardAscEncoder).unwrap();
        let parsed = parse(&sdp).unwrap();

        let video = parsed.get_media("video").unwrap();
        assert_eq!(video.fmt, MediaFormat::PayloadType(96));
        assert_eq!(video.clock_rate, Some(90000));
        assert_eq!(
            video.fmtp_params.get("packetization-mode").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            video.fmtp_params.get("sprop-parameter-sets").map(String::as_str),
            Some("Z0IAFbtA,aM4H")
        );
    }

    #[test]
    fn test_audio_fmtp_embeds_config_hex() {
        let mut options = base_options();
        options.has_audio = true;
        options.audio = Some(AudioOptions {
            payload_type: 97,
            encoding_name: "MPEG4-GENERIC".into(),
            clock_rate: 44100,
            channels: Some(2),
            sample_rate: Some(44100),
            object_type: Some(2),
            specific_config: None,
        });

        let sdp = generate(&options, &StandardAscEncoder).unwrap();
        let parsed = parse(&sdp).unwrap();
        let audio = parsed.get_media("audio").unwrap();
        assert!(audio.fmtp_params.contains_key("config"));
        assert_eq!(audio.clock_rate, Some(44100));
        assert_eq!(audio.audio_channels, Some(2));
    }

    #[test]
    fn test_parse_fmt_falls_back_to_token_for_non_rtp_avp_proto() {
        let sdp = "v=0\r\nm=video 0 udp 33\r\n";
        let parsed = parse(sdp).unwrap();
        let video = parsed.get_media("video").unwrap();
        assert_eq!(video.fmt, MediaFormat::Token("33".to_string()));
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = parse("v=0\nnotaline\n").unwrap_err();
        assert!(matches!(err, VdkError::InvalidLine(_)));
    }

    #[test]
    fn test_parse_ignores_unknown_line_type() {
        let sdp = "v=0\r\nz=whatever\r\n";
        let parsed = parse(sdp).unwrap();
        assert_eq!(parsed.version, 0);
    }

    #[test]
    fn test_parse_accepts_bare_lf() {
        let sdp = "v=0\no=- 1 1 IN IP4 127.0.0.1\ns=Test\n";
        let parsed = parse(sdp).unwrap();
        assert_eq!(parsed.session_name, Some("Test".to_string()));
        assert_eq!(parsed.origin.unwrap().unicast_address, "127.0.0.1");
    }
}
