//! Per-call correlation state between caller playback and the model's output.

use std::collections::VecDeque;

/// Mark label sent after every chunk of assistant audio.
pub const MARK_NAME: &str = "responsePart";

/// What a barge-in has to undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    /// The assistant item being played, if the model named one
    pub item_id: Option<String>,
    /// How far into the item the caller got, in ms
    pub audio_end_ms: u64,
}

/// Playback bookkeeping for one call.
///
/// Timestamps are on the call leg's clock. `response_start_timestamp_ms` is
/// set exactly while an assistant utterance is in flight, and
/// `last_assistant_item_id` is only ever set alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    stream_id: Option<String>,
    latest_media_timestamp_ms: u64,
    response_start_timestamp_ms: Option<u64>,
    last_assistant_item_id: Option<String>,
    mark_queue: VecDeque<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn latest_media_timestamp_ms(&self) -> u64 {
        self.latest_media_timestamp_ms
    }

    pub fn response_start_timestamp_ms(&self) -> Option<u64> {
        self.response_start_timestamp_ms
    }

    pub fn last_assistant_item_id(&self) -> Option<&str> {
        self.last_assistant_item_id.as_deref()
    }

    pub fn pending_marks(&self) -> usize {
        self.mark_queue.len()
    }

    /// A new call stream started. Everything from a previous stream is dropped.
    pub fn start_stream(&mut self, stream_id: impl Into<String>) {
        *self = Self {
            stream_id: Some(stream_id.into()),
            ..Self::default()
        };
    }

    /// Advance the call clock.
    ///
    /// This keeps the largest timestamp seen rather than the latest one
    /// received, so the clock is monotonic: a late frame cannot pull it below
    /// a response start already recorded against it, and `audio_end_ms` stays
    /// measured from the furthest point the caller has heard.
    pub fn record_media(&mut self, timestamp_ms: u64) {
        self.latest_media_timestamp_ms = self.latest_media_timestamp_ms.max(timestamp_ms);
    }

    /// Note that a chunk of assistant audio went out to the caller.
    pub fn record_assistant_audio(&mut self, item_id: Option<String>) {
        if self.response_start_timestamp_ms.is_none() {
            self.response_start_timestamp_ms = Some(self.latest_media_timestamp_ms);
        }
        if let Some(item_id) = item_id {
            self.last_assistant_item_id = Some(item_id);
        }
    }

    /// Queue a mark for the chunk just sent and return its label.
    pub fn push_mark(&mut self) -> &'static str {
        self.mark_queue.push_back(MARK_NAME.to_string());
        MARK_NAME
    }

    /// The call leg finished playing one chunk.
    pub fn acknowledge_mark(&mut self) -> Option<String> {
        self.mark_queue.pop_front()
    }

    /// Whether assistant audio is still queued for the caller.
    pub fn is_assistant_speaking(&self) -> bool {
        !self.mark_queue.is_empty() && self.response_start_timestamp_ms.is_some()
    }

    /// Caller started talking. Returns what to truncate, or `None` (with the
    /// state untouched) when nothing is playing.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        if !self.is_assistant_speaking() {
            return None;
        }

        let started = self.response_start_timestamp_ms.take().unwrap_or_default();
        let interruption = Interruption {
            item_id: self.last_assistant_item_id.take(),
            audio_end_ms: self.latest_media_timestamp_ms.saturating_sub(started),
        };
        self.mark_queue.clear();
        Some(interruption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speaking_state(start_ms: u64, item: Option<&str>) -> SessionState {
        let mut state = SessionState::new();
        state.start_stream("MZ1");
        state.record_media(start_ms);
        state.record_assistant_audio(item.map(str::to_string));
        state.push_mark();
        state
    }

    #[test]
    fn test_media_clock_is_monotonic() {
        let mut state = SessionState::new();
        for (ts, expected) in [(20, 20), (40, 40), (30, 40), (40, 40), (60, 60)] {
            state.record_media(ts);
            assert_eq!(state.latest_media_timestamp_ms(), expected);
        }
    }

    #[test]
    fn test_start_stream_resets_everything() {
        let mut state = speaking_state(100, Some("item_1"));
        state.record_media(500);

        state.start_stream("MZ2");
        assert_eq!(state.stream_id(), Some("MZ2"));
        assert_eq!(state.latest_media_timestamp_ms(), 0);
        assert_eq!(state.response_start_timestamp_ms(), None);
        assert_eq!(state.last_assistant_item_id(), None);
        assert_eq!(state.pending_marks(), 0);
    }

    #[test]
    fn test_response_start_is_pinned_to_first_chunk() {
        let mut state = SessionState::new();
        state.start_stream("MZ1");
        state.record_media(100);
        state.record_assistant_audio(Some("item_1".to_string()));
        state.record_media(300);
        state.record_assistant_audio(Some("item_2".to_string()));

        assert_eq!(state.response_start_timestamp_ms(), Some(100));
        assert_eq!(state.last_assistant_item_id(), Some("item_2"));
    }

    #[test]
    fn test_missing_item_id_keeps_previous() {
        let mut state = speaking_state(0, Some("item_1"));
        state.record_assistant_audio(None);
        assert_eq!(state.last_assistant_item_id(), Some("item_1"));
    }

    #[test]
    fn test_marks_are_fifo() {
        let mut state = SessionState::new();
        assert_eq!(state.push_mark(), MARK_NAME);
        state.push_mark();
        assert_eq!(state.pending_marks(), 2);

        assert_eq!(state.acknowledge_mark().as_deref(), Some(MARK_NAME));
        assert_eq!(state.pending_marks(), 1);
        state.acknowledge_mark();
        assert_eq!(state.acknowledge_mark(), None);
        assert_eq!(state.pending_marks(), 0);
    }

    #[test]
    fn test_interrupt_computes_elapsed_and_resets() {
        let mut state = speaking_state(1000, Some("item_1"));
        state.record_media(1400);

        let interruption = state.interrupt().unwrap();
        assert_eq!(
            interruption,
            Interruption {
                item_id: Some("item_1".to_string()),
                audio_end_ms: 400,
            }
        );
        assert_eq!(state.response_start_timestamp_ms(), None);
        assert_eq!(state.last_assistant_item_id(), None);
        assert_eq!(state.pending_marks(), 0);
        assert_eq!(state.stream_id(), Some("MZ1"));
        assert_eq!(state.latest_media_timestamp_ms(), 1400);
    }

    #[test]
    fn test_late_frame_does_not_shorten_truncation() {
        let mut state = speaking_state(1000, Some("item_1"));
        state.record_media(1400);
        state.record_media(900);

        let interruption = state.interrupt().unwrap();
        assert_eq!(interruption.audio_end_ms, 400);
    }

    #[test]
    fn test_interrupt_without_item_still_clears() {
        let mut state = speaking_state(0, None);
        let interruption = state.interrupt().unwrap();
        assert_eq!(interruption.item_id, None);
        assert_eq!(state.pending_marks(), 0);
    }

    #[test]
    fn test_interrupt_is_noop_when_nothing_queued() {
        let mut state = speaking_state(200, Some("item_1"));
        state.acknowledge_mark();
        let before = state.clone();

        assert_eq!(state.interrupt(), None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_interrupt_is_noop_without_response_start() {
        let mut state = SessionState::new();
        state.start_stream("MZ1");
        state.push_mark();
        let before = state.clone();

        assert_eq!(state.interrupt(), None);
        assert_eq!(state, before);
    }
}
