use super::framer::TsFramer;
use super::pes_header::{self, StreamKind};
use super::psi::{CrcPolicy, DescriptorLeniency, PsiDecoder};
use super::reassembler::{PesFragment, PesReassembler};
use super::scheduler::{Kind, PacingScheduler, SchedulerState};
use super::types::{AdaptationField, PAT, PID_PAT, STREAM_TYPE_AAC, STREAM_TYPE_H264};
use crate::config;
use crate::error::{Result, VdkError};
use log::{debug, error};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// An event surfaced to observers: a decoded audio/video access unit, or
/// the one-shot end-of-stream marker.
#[derive(Debug, Clone)]
pub enum DemuxEvent {
    /// A video access unit, paced to its DTS.
    Video {
        /// Elementary PID this access unit was carried on.
        pid: u16,
        /// Presentation timestamp (90kHz).
        pts: u64,
        /// Decoding timestamp (90kHz); equals `pts` if the PES had none.
        dts: u64,
        /// Access unit bytes.
        payload: Vec<u8>,
        /// Adaptation field from the PES's opening TS packet, if any.
        adaptation_field: Option<AdaptationField>,
    },
    /// An audio access unit, paced to its DTS.
    Audio {
        /// Elementary PID this access unit was carried on.
        pid: u16,
        /// Presentation timestamp (90kHz).
        pts: u64,
        /// Decoding timestamp (90kHz); equals `pts` if the PES had none.
        dts: u64,
        /// Access unit bytes.
        payload: Vec<u8>,
        /// Adaptation field from the PES's opening TS packet, if any.
        adaptation_field: Option<AdaptationField>,
    },
    /// Fires exactly once, after EOF has been observed and both pacing
    /// queues have drained.
    End,
}

/// Which observer list a listener is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Listeners invoked on `DemuxEvent::Video`.
    Video,
    /// Listeners invoked on `DemuxEvent::Audio`.
    Audio,
    /// Listeners invoked on `DemuxEvent::End`.
    End,
}

fn event_name(event: &DemuxEvent) -> EventName {
    match event {
        DemuxEvent::Video { .. } => EventName::Video,
        DemuxEvent::Audio { .. } => EventName::Audio,
        DemuxEvent::End => EventName::End,
    }
}

/// Owns C2-C6 state for the lifetime of one stream: the preloaded byte
/// buffer, PAT/PMT tracking, the deferred-parse queue, and a typed
/// observer registry. Created by [`Demuxer::new`], populated by
/// [`Demuxer::open`], torn down by [`Demuxer::close`].
pub struct Demuxer {
    data: Vec<u8>,
    pat: PAT,
    audio_pid: Option<u16>,
    video_pid: Option<u16>,
    unparsed_pes: VecDeque<(u16, PesFragment)>,
    listeners: HashMap<EventName, Vec<Box<dyn FnMut(&DemuxEvent) + Send>>>,
    descriptor_leniency: DescriptorLeniency,
    closed: Arc<AtomicBool>,
    first_dts: Option<u64>,
    last_emitted_pts: Option<u64>,
    streaming_start_time: Option<Instant>,
}

impl Default for Demuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer {
    /// Creates an empty, unopened demuxer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            pat: PAT::new(),
            audio_pid: None,
            video_pid: None,
            unparsed_pes: VecDeque::new(),
            listeners: HashMap::new(),
            descriptor_leniency: DescriptorLeniency::Strict,
            closed: Arc::new(AtomicBool::new(false)),
            first_dts: None,
            last_emitted_pts: None,
            streaming_start_time: None,
        }
    }

    /// Downgrades unrecognized descriptor tags to a warn-and-skip instead
    /// of failing the enclosing PMT/PAT section.
    pub fn with_lenient_descriptors(mut self, lenient: bool) -> Self {
        self.descriptor_leniency = if lenient {
            DescriptorLeniency::Lenient
        } else {
            DescriptorLeniency::Strict
        };
        self
    }

    /// Registers a listener for `name`. Listeners are invoked
    /// synchronously, in registration order, from the scheduler's
    /// timer-fire step.
    pub fn on(&mut self, name: EventName, listener: impl FnMut(&DemuxEvent) + Send + 'static) {
        self.listeners.entry(name).or_default().push(Box::new(listener));
    }

    /// Preloads the byte buffer from `path`, capped at
    /// `VDKIO_MAX_INPUT_BYTES`.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let cfg = config::current();
        let bytes = std::fs::read(path)?;
        if bytes.len() as u64 > cfg.max_input_bytes {
            return Err(VdkError::InvalidData(format!(
                "input {} bytes exceeds VDKIO_MAX_INPUT_BYTES ({})",
                bytes.len(),
                cfg.max_input_bytes
            )));
        }
        self.data = bytes;
        Ok(())
    }

    /// Loads an already-in-memory buffer (for embedders that do their own
    /// file I/O, and for tests).
    pub fn open_bytes(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Releases the preloaded buffer and stops a running
    /// [`Demuxer::start_streaming`] at its next poll.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.data.clear();
    }

    /// Converts a 90kHz PTS/DTS value to milliseconds.
    pub fn pts_to_ms(&self, pts: u64) -> u64 {
        super::types::pts_to_ms(pts)
    }

    /// The PTS of the most recently emitted access unit, if any.
    pub fn get_current_pts(&self) -> Option<u64> {
        self.last_emitted_pts
    }

    /// Wall-clock duration until `dts` would be due, relative to the
    /// streaming anchor. Negative durations saturate to zero.
    pub fn get_time_until_dts(&self, dts: u64) -> Result<Duration> {
        let first_dts = self.first_dts.ok_or(VdkError::NoAnchorYet)?;
        let start = self.streaming_start_time.ok_or(VdkError::NoAnchorYet)?;
        let delta_ms = dts.saturating_sub(first_dts) / 90;
        let due = start + Duration::from_millis(delta_ms);
        Ok(due.saturating_duration_since(Instant::now()))
    }

    /// Begins emission: frames the preloaded buffer, tracks PAT/PMT,
    /// reassembles and paces PES packets, and drives the `audio`/`video`/
    /// `end` observer callbacks until the input and all pacing queues are
    /// drained (or `close()` is called).
    pub async fn start_streaming(&mut self, initial_skip_ms: u64) -> Result<()> {
        config::Config::reload();
        let cfg = config::current();

        let now = Instant::now();
        self.streaming_start_time = Some(
            now.checked_sub(Duration::from_millis(initial_skip_ms))
                .unwrap_or(now),
        );

        let psi_decoder = PsiDecoder::new(self.descriptor_leniency, CrcPolicy::Ignore);
        let mut scheduler: PacingScheduler<DemuxEvent> =
            PacingScheduler::new(initial_skip_ms, cfg.lookahead_depth, cfg.pacing_advance_ms);

        let data = std::mem::take(&mut self.data);
        let mut framer = TsFramer::new(&data);
        let mut reassembler = PesReassembler::new();
        let mut eof = false;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                scheduler.cancel();
                break;
            }

            while !eof && scheduler.wants_more() {
                match framer.next_packet() {
                    Ok(Some(packet)) => {
                        let pid = packet.header.pid;
                        let pusi = packet.header.payload_unit_start;
                        if let Some(fragment) =
                            reassembler.push(pid, pusi, packet.adaptation_field, packet.payload)
                        {
                            self.handle_fragment(pid, fragment, &psi_decoder, &mut scheduler, cfg.max_pes_payload)?;
                        }
                    }
                    Ok(None) => {
                        eof = true;
                        for fragment in reassembler.flush() {
                            let pid = fragment.pid;
                            self.handle_fragment(pid, fragment, &psi_decoder, &mut scheduler, cfg.max_pes_payload)?;
                        }
                        scheduler.mark_eof();
                    }
                    Err(e) => {
                        error!("fatal TS framing error, draining: {}", e);
                        eof = true;
                        scheduler.mark_eof();
                    }
                }
            }

            match scheduler.next_due()? {
                Some((kind, instant)) => {
                    tokio::time::sleep_until(instant).await;
                    if let Some(event) = scheduler.pop_due(kind) {
                        self.emit(&event);
                    }
                    if scheduler.is_fully_drained() {
                        self.emit(&DemuxEvent::End);
                        break;
                    }
                }
                None => {
                    if eof {
                        self.emit(&DemuxEvent::End);
                    }
                    break;
                }
            }

            debug_assert!(matches!(
                scheduler.state(),
                SchedulerState::Idle | SchedulerState::WaitingTimer | SchedulerState::Draining
            ));
        }

        Ok(())
    }

    fn handle_fragment(
        &mut self,
        pid: u16,
        fragment: PesFragment,
        psi_decoder: &PsiDecoder,
        scheduler: &mut PacingScheduler<DemuxEvent>,
        max_pes_payload: usize,
    ) -> Result<()> {
        if pid == PID_PAT {
            match psi_decoder.parse_pat(&fragment.data) {
                Ok(pat) => self.pat = pat,
                Err(e) => error!("dropping malformed PAT: {}", e),
            }
            return Ok(());
        }

        if pid != 0 && self.pat.entries.iter().any(|e| e.program_map_pid == pid) {
            match psi_decoder.parse_pmt(&fragment.data) {
                Ok(pmt) => {
                    self.video_pid = pmt.pid_for_stream_type(STREAM_TYPE_H264);
                    self.audio_pid = pmt.pid_for_stream_type(STREAM_TYPE_AAC);
                    self.drain_deferred(scheduler, max_pes_payload)?;
                }
                Err(e) => error!("dropping malformed PMT: {}", e),
            }
            return Ok(());
        }

        if Some(pid) == self.video_pid || Some(pid) == self.audio_pid {
            if let Err(e) = self.decode_and_enqueue(pid, fragment, scheduler, max_pes_payload) {
                error!("dropping malformed PES on PID {:#x}: {}", pid, e);
            }
        } else {
            debug!("deferring PES on PID {:#x} pending PMT", pid);
            self.unparsed_pes.push_back((pid, fragment));
        }

        Ok(())
    }

    fn drain_deferred(
        &mut self,
        scheduler: &mut PacingScheduler<DemuxEvent>,
        max_pes_payload: usize,
    ) -> Result<()> {
        let deferred = std::mem::take(&mut self.unparsed_pes);
        for (pid, fragment) in deferred {
            if Some(pid) == self.video_pid || Some(pid) == self.audio_pid {
                if let Err(e) = self.decode_and_enqueue(pid, fragment, scheduler, max_pes_payload) {
                    error!("dropping malformed deferred PES on PID {:#x}: {}", pid, e);
                }
            } else {
                debug!("dropping deferred PES on PID {:#x}: still unmatched after PMT", pid);
            }
        }
        Ok(())
    }

    fn decode_and_enqueue(
        &mut self,
        pid: u16,
        fragment: PesFragment,
        scheduler: &mut PacingScheduler<DemuxEvent>,
        max_pes_payload: usize,
    ) -> Result<()> {
        let header = pes_header::decode_pes_header(&fragment.data, max_pes_payload)?;

        let kind = match header.kind {
            StreamKind::Other => {
                debug!("dropping PES on PID {:#x}: stream_id classifies as neither audio nor video", pid);
                return Ok(());
            }
            StreamKind::Video => Kind::Video,
            StreamKind::Audio => Kind::Audio,
        };

        let pts = header.pts.ok_or(VdkError::MissingPTS(pid))?;
        let dts = header.dts.unwrap_or(pts);
        let payload = header.payload.to_vec();
        let adaptation_field = fragment.adaptation_field;

        let event = match kind {
            Kind::Video => DemuxEvent::Video {
                pid,
                pts,
                dts,
                payload,
                adaptation_field,
            },
            Kind::Audio => DemuxEvent::Audio {
                pid,
                pts,
                dts,
                payload,
                adaptation_field,
            },
        };

        if self.first_dts.is_none() {
            self.first_dts = Some(dts);
        }

        scheduler.enqueue(kind, dts, event);
        Ok(())
    }

    fn emit(&mut self, event: &DemuxEvent) {
        if let DemuxEvent::Video { pts, .. } | DemuxEvent::Audio { pts, .. } = event {
            self.last_emitted_pts = Some(*pts);
        }
        let name = event_name(event);
        if let Some(listeners) = self.listeners.get_mut(&name) {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Crc32Mpeg2;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn ts_packet(pid: u16, pusi: bool, payload: &[u8]) -> Vec<u8> {
        let mut pkt = vec![0u8; super::super::types::TS_PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = if pusi { 0x40 } else { 0x00 } | ((pid >> 8) as u8 & 0x1f);
        pkt[2] = (pid & 0xff) as u8;
        pkt[3] = 0x10;
        let n = payload.len().min(184);
        pkt[4..4 + n].copy_from_slice(&payload[..n]);
        pkt
    }

    fn pat_section(pmt_pid: u16) -> Vec<u8> {
        let mut body = vec![
            0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01,
            (0xE0 | (pmt_pid >> 8) as u8), (pmt_pid & 0xff) as u8,
        ];
        let crc = Crc32Mpeg2::new().calculate(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        let mut section = vec![0x00]; // pointer_field
        section.extend_from_slice(&body);
        section
    }

    fn pmt_section(video_pid: u16) -> Vec<u8> {
        let mut body = vec![
            0x02, 0xB0, 0x12, 0x00, 0x01, 0xC1, 0x00, 0x00,
            0xE0, (video_pid & 0xff) as u8, 0xF0, 0x00,
            STREAM_TYPE_H264,
            (0xE0 | (video_pid >> 8) as u8), (video_pid & 0xff) as u8,
            0xF0, 0x00,
        ];
        let crc = Crc32Mpeg2::new().calculate(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        let mut section = vec![0x00];
        section.extend_from_slice(&body);
        section
    }

    fn pes_packet(stream_id: u8, pts: u64, payload: &[u8]) -> Vec<u8> {
        fn encode_ts(marker4: u8, value: u64) -> [u8; 5] {
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
        let ts = encode_ts(0b0010, pts);
        let mut data = vec![0x00, 0x00, 0x01, stream_id];
        let pes_packet_length = 3 + 5 + payload.len();
        data.extend_from_slice(&(pes_packet_length as u16).to_be_bytes());
        data.push(0b1000_0000);
        data.push(0b0010_0000);
        data.push(5);
        data.extend_from_slice(&ts);
        data.extend_from_slice(payload);
        data
    }

    fn pes_packet_no_pts(stream_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x01, stream_id];
        let pes_packet_length = 3 + payload.len();
        data.extend_from_slice(&(pes_packet_length as u16).to_be_bytes());
        data.push(0b1000_0000);
        data.push(0b0000_0000); // PTS_DTS_flags = 0, no timestamp present
        data.push(0);
        data.extend_from_slice(payload);
        data
    }

    #[tokio::test]
    async fn test_malformed_pes_is_dropped_and_streaming_continues() {
        let mut stream = Vec::new();
        stream.extend(ts_packet(PID_PAT, true, &pat_section(0x1000)));
        stream.extend(ts_packet(0x1000, true, &pmt_section(0x101)));
        // First video PES has no PTS: decode_and_enqueue fails with MissingPTS,
        // and should be dropped rather than aborting the whole session.
        stream.extend(ts_packet(0x101, true, &pes_packet_no_pts(0xE0, &[0xAA, 0xBB])));
        // A well-formed PES follows and must still be delivered.
        stream.extend(ts_packet(0x101, true, &pes_packet(0xE0, 12345, &[0xDE, 0xAD])));

        let mut demuxer = Demuxer::new();
        demuxer.open_bytes(stream);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        demuxer.on(EventName::Video, move |event| {
            events_clone.lock().unwrap().push(event.clone());
        });

        demuxer.start_streaming(0).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DemuxEvent::Video { dts, payload, .. } => {
                assert_eq!(*dts, 12345);
                assert_eq!(payload, &vec![0xDE, 0xAD]);
            }
            _ => panic!("expected a video event"),
        }
    }

    #[tokio::test]
    async fn test_pat_pmt_video_end_to_end() {
        let mut stream = Vec::new();
        stream.extend(ts_packet(PID_PAT, true, &pat_section(0x1000)));
        stream.extend(ts_packet(0x1000, true, &pmt_section(0x101)));
        stream.extend(ts_packet(0x101, true, &pes_packet(0xE0, 90000, &[0xDE, 0xAD, 0xBE, 0xEF])));

        let mut demuxer = Demuxer::new();
        demuxer.open_bytes(stream);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        demuxer.on(EventName::Video, move |event| {
            events_clone.lock().unwrap().push(event.clone());
        });

        demuxer.start_streaming(0).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DemuxEvent::Video { dts, payload, .. } => {
                assert_eq!(*dts, 90000);
                assert_eq!(payload, &vec![0xDE, 0xAD, 0xBE, 0xEF]);
            }
            _ => panic!("expected a video event"),
        }
    }

    #[tokio::test]
    async fn test_end_event_fires_once() {
        let mut stream = Vec::new();
        stream.extend(ts_packet(PID_PAT, true, &pat_section(0x1000)));
        stream.extend(ts_packet(0x1000, true, &pmt_section(0x101)));
        stream.extend(ts_packet(0x101, true, &pes_packet(0xE0, 0, &[0x01])));

        let mut demuxer = Demuxer::new();
        demuxer.open_bytes(stream);

        let end_count = Arc::new(AtomicUsize::new(0));
        let end_count_clone = end_count.clone();
        demuxer.on(EventName::End, move |_| {
            end_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        demuxer.start_streaming(0).await.unwrap();
        assert_eq!(end_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deferred_pes_is_reparsed_after_pmt_arrives() {
        let mut stream = Vec::new();
        // Audio PES arrives before the PMT that declares its PID.
        stream.extend(ts_packet(0x102, true, &pes_packet(0xC0, 45000, &[0x01, 0x02])));
        stream.extend(ts_packet(PID_PAT, true, &pat_section(0x1000)));
        let mut pmt = vec![
            0x02, 0xB0, 0x12, 0x00, 0x01, 0xC1, 0x00, 0x00,
            0xE0, 0x02, 0xF0, 0x00,
            STREAM_TYPE_AAC,
            0xE1, 0x02, 0xF0, 0x00,
        ];
        let crc = Crc32Mpeg2::new().calculate(&pmt);
        pmt.extend_from_slice(&crc.to_be_bytes());
        let mut pmt_section_bytes = vec![0x00];
        pmt_section_bytes.extend_from_slice(&pmt);
        stream.extend(ts_packet(0x1000, true, &pmt_section_bytes));

        let mut demuxer = Demuxer::new();
        demuxer.open_bytes(stream);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        demuxer.on(EventName::Audio, move |event| {
            events_clone.lock().unwrap().push(event.clone());
        });

        demuxer.start_streaming(0).await.unwrap();
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
