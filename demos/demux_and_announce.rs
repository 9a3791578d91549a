//! Demuxes a Transport Stream file and prints the SDP that would announce
//! its audio/video streams to an RTSP/RTP peer.
//!
//! Run with: `cargo run --manifest-path <path-to-Cargo.toml> ...` (this file
//! is not wired as a `[[example]]`; copy it into `examples/` if you want
//! `cargo run --example` to pick it up).

use std::env;
use std::sync::{Arc, Mutex};

use vdkio::aac::StandardAscEncoder;
use vdkio::format::sdp::{generate, AddressType, AudioOptions, SdpOptions};
use vdkio::format::ts::demuxer::{Demuxer, EventName};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args().nth(1).unwrap_or_else(|| "input.ts".to_string());

    let audio_seen = Arc::new(Mutex::new(false));
    let video_seen = Arc::new(Mutex::new(false));

    let mut demuxer = Demuxer::new();
    demuxer.open(&path)?;

    {
        let audio_seen = audio_seen.clone();
        demuxer.on(EventName::Audio, move |event| {
            *audio_seen.lock().unwrap() = true;
            log::info!("audio access unit: {:?}", event);
        });
    }
    {
        let video_seen = video_seen.clone();
        demuxer.on(EventName::Video, move |event| {
            *video_seen.lock().unwrap() = true;
            log::info!("video access unit: {:?}", event);
        });
    }
    demuxer.on(EventName::End, |_event| {
        log::info!("end of stream");
    });

    demuxer.start_streaming(0).await?;

    let encoder = StandardAscEncoder;
    let options = SdpOptions {
        username: "-".to_string(),
        session_id: "1".to_string(),
        session_version: "1".to_string(),
        address_type: AddressType::IP4,
        unicast_address: "0.0.0.0".to_string(),
        has_audio: *audio_seen.lock().unwrap(),
        audio: Some(AudioOptions {
            payload_type: 97,
            encoding_name: "MPEG4-GENERIC".to_string(),
            clock_rate: 44100,
            channels: Some(2),
            sample_rate: Some(44100),
            object_type: Some(2),
            specific_config: None,
        }),
        has_video: *video_seen.lock().unwrap(),
        video: None,
        duration_seconds: None,
    };

    let sdp = generate(&options, &encoder)?;
    print!("{sdp}");

    Ok(())
}
