use crate::error::{Result, VdkError};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// One access unit queued for pacing, carrying just enough to decide and
/// report its due time; the caller supplies the actual event payload
/// separately (see `format::ts::demuxer`).
#[derive(Debug, Clone)]
pub struct ScheduledUnit<T> {
    /// Decoding timestamp (90kHz), used to compute `emit_at`.
    pub dts: u64,
    /// Caller-supplied payload, handed back verbatim on emission.
    pub payload: T,
}

/// Which per-kind queue a timer fire or enqueue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The video queue.
    Video,
    /// The audio queue.
    Audio,
}

/// Explicit scheduler state machine, mirrored from the design notes: the
/// scheduler is idle with nothing queued, waiting on a single timer for
/// the next due unit, or draining (EOF observed, queues non-empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer outstanding and both queues empty.
    Idle,
    /// A timer is outstanding for the earlier of the two queue heads.
    WaitingTimer,
    /// EOF has been observed; draining remaining queued units with no
    /// further production.
    Draining,
}

/// DTS-anchored pacing scheduler with a bounded 2-deep look-ahead queue
/// per kind.
///
/// Ownership of the wall-clock anchor (`streaming_start_time`, `first_dts`)
/// lives here; the `Demuxer` (C8) drives this via `enqueue`/`next_due`/
/// `pop_due` from its single `tokio::select!` loop.
pub struct PacingScheduler<T> {
    pending_video: VecDeque<ScheduledUnit<T>>,
    pending_audio: VecDeque<ScheduledUnit<T>>,
    streaming_start_time: Instant,
    first_dts: Option<u64>,
    lookahead_depth: usize,
    advance_ms: u64,
    state: SchedulerState,
    eof: bool,
}

impl<T> PacingScheduler<T> {
    /// Creates a scheduler anchored at `now - initial_skip_ms`.
    pub fn new(initial_skip_ms: u64, lookahead_depth: usize, advance_ms: u64) -> Self {
        let now = Instant::now();
        let streaming_start_time = now
            .checked_sub(Duration::from_millis(initial_skip_ms))
            .unwrap_or(now);
        Self {
            pending_video: VecDeque::new(),
            pending_audio: VecDeque::new(),
            streaming_start_time,
            first_dts: None,
            lookahead_depth,
            advance_ms,
            state: SchedulerState::Idle,
            eof: false,
        }
    }

    /// Current state, for observability/tests.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn queue_mut(&mut self, kind: Kind) -> &mut VecDeque<ScheduledUnit<T>> {
        match kind {
            Kind::Video => &mut self.pending_video,
            Kind::Audio => &mut self.pending_audio,
        }
    }

    /// Whether the producer loop should keep pulling more PES packets:
    /// true only while both queues have room under the look-ahead depth,
    /// so a single-stream-kind input still yields once its queue fills.
    pub fn wants_more(&self) -> bool {
        self.pending_video.len() < self.lookahead_depth && self.pending_audio.len() < self.lookahead_depth
    }

    /// Enqueues a unit with decoding timestamp `dts`. Establishes
    /// `first_dts` from the first unit seen across either queue.
    pub fn enqueue(&mut self, kind: Kind, dts: u64, payload: T) {
        if self.first_dts.is_none() {
            self.first_dts = Some(dts);
        }
        self.queue_mut(kind).push_back(ScheduledUnit { dts, payload });
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::WaitingTimer;
        }
    }

    /// Marks end of input: no more units will be enqueued.
    pub fn mark_eof(&mut self) {
        self.eof = true;
        if self.state != SchedulerState::Idle {
            self.state = SchedulerState::Draining;
        }
    }

    fn emit_at(&self, dts: u64) -> Result<Instant> {
        let first_dts = self.first_dts.ok_or(VdkError::NoAnchorYet)?;
        let delta_ms = dts.saturating_sub(first_dts) / 90;
        Ok(self.streaming_start_time + Duration::from_millis(delta_ms))
    }

    /// Returns the earlier-due `(kind, Instant)` among both queue heads,
    /// already offset by `advance_ms`, or `None` if both queues are empty.
    pub fn next_due(&self) -> Result<Option<(Kind, Instant)>> {
        let advance = Duration::from_millis(self.advance_ms);
        let video_due = match self.pending_video.front() {
            Some(u) => {
                let due = self.emit_at(u.dts)?;
                Some((Kind::Video, due.checked_sub(advance).unwrap_or(due)))
            }
            None => None,
        };
        let audio_due = match self.pending_audio.front() {
            Some(u) => {
                let due = self.emit_at(u.dts)?;
                Some((Kind::Audio, due.checked_sub(advance).unwrap_or(due)))
            }
            None => None,
        };

        Ok(match (video_due, audio_due) {
            (Some(v), Some(a)) => Some(if v.1 <= a.1 { v } else { a }),
            (Some(v), None) => Some(v),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        })
    }

    /// Dequeues and returns the head of `kind`'s queue, updating state.
    /// Call after the timer for `next_due`'s `(kind, instant)` has fired.
    pub fn pop_due(&mut self, kind: Kind) -> Option<T> {
        let popped = self.queue_mut(kind).pop_front().map(|u| u.payload);

        if self.pending_video.is_empty() && self.pending_audio.is_empty() {
            self.state = if self.eof {
                SchedulerState::Draining
            } else {
                SchedulerState::Idle
            };
        } else {
            self.state = SchedulerState::WaitingTimer;
        }

        popped
    }

    /// True once EOF has been observed and both queues are empty: the
    /// `end` event fires exactly once at this transition.
    pub fn is_fully_drained(&self) -> bool {
        self.eof && self.pending_video.is_empty() && self.pending_audio.is_empty()
    }

    /// Cancels all pending units without emitting further events, per
    /// `close()`/fatal-error semantics.
    pub fn cancel(&mut self) {
        self.pending_video.clear();
        self.pending_audio.clear();
        self.state = SchedulerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_more_respects_lookahead_depth() {
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        assert!(s.wants_more());
        s.enqueue(Kind::Video, 0, 1);
        s.enqueue(Kind::Video, 90000, 2);
        assert!(!s.wants_more()); // video at depth, even with audio empty
        s.enqueue(Kind::Audio, 0, 3);
        s.enqueue(Kind::Audio, 90000, 4);
        assert!(!s.wants_more());
    }

    #[test]
    fn test_wants_more_stays_bounded_for_single_stream_kind() {
        // A video-only input (no audio PID ever appears) must still yield
        // once its queue reaches the look-ahead depth, rather than pulling
        // the entire input into memory.
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        s.enqueue(Kind::Video, 0, 1);
        assert!(s.wants_more());
        s.enqueue(Kind::Video, 90000, 2);
        assert!(!s.wants_more());
    }

    #[test]
    fn test_next_due_picks_earlier_kind() {
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        s.enqueue(Kind::Video, 180000, 1); // 2s in
        s.enqueue(Kind::Audio, 90000, 2); // 1s in
        let (kind, _) = s.next_due().unwrap().unwrap();
        assert_eq!(kind, Kind::Audio);
    }

    #[test]
    fn test_pop_due_transitions_to_idle_when_empty_and_not_eof() {
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        s.enqueue(Kind::Video, 0, 1);
        assert_eq!(s.pop_due(Kind::Video), Some(1));
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(!s.is_fully_drained());
    }

    #[test]
    fn test_eof_and_empty_queues_drain_once() {
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        s.enqueue(Kind::Video, 0, 1);
        s.mark_eof();
        assert_eq!(s.state(), SchedulerState::Draining);
        s.pop_due(Kind::Video);
        assert!(s.is_fully_drained());
    }

    #[test]
    fn test_next_due_with_empty_queues_is_none() {
        let s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        assert!(s.next_due().unwrap().is_none());
    }

    #[test]
    fn test_cancel_clears_queues_and_state() {
        let mut s: PacingScheduler<u8> = PacingScheduler::new(0, 2, 20);
        s.enqueue(Kind::Video, 0, 1);
        s.cancel();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.next_due().unwrap().is_none());
    }
}
