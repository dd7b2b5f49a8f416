//! Debounced autosave.
//!
//! Every content-dirty update queues the freshest snapshot here; the event
//! loop polls [`SaveDebouncer::take_ready`] on its tick and performs the
//! actual write. Queueing again before the delay elapses replaces the
//! pending snapshot and restarts the clock, so a typing burst produces one
//! write carrying the final content.

/// Delay between the last edit and the snapshot write.
pub const DEFAULT_SAVE_DELAY_MS: u64 = 1000;

pub struct SaveDebouncer {
    delay_ms: u64,
    pending: Option<(String, u64)>,
}

impl SaveDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Queue a snapshot, replacing any pending one and restarting the delay.
    pub fn queue(&mut self, snapshot: String, now_ms: u64) {
        self.pending = Some((snapshot, now_ms));
    }

    /// Take the snapshot if its delay has elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<String> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now_ms.saturating_sub(*queued_at) >= self.delay_ms {
            self.pending.take().map(|(snapshot, _)| snapshot)
        } else {
            None
        }
    }

    /// Take the snapshot immediately, delay or not. Used for save-now and
    /// the flush on exit.
    pub fn take_now(&mut self) -> Option<String> {
        self.pending.take().map(|(snapshot, _)| snapshot)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
