//! Single-threaded event loop: millisecond timers and animation-frame requests.
//!
//! Nothing here runs callbacks. The owner drains due timers one at a time with
//! [`Scheduler::pop_due`] and reacts to each, so a reaction that clears another
//! timer takes effect before that timer could fire.

use std::collections::BTreeMap;

/// Handle on a pending interval or timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Handle on a pending animation-frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(u64);

/// A pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    /// Clock reading at which the timer fires next (milliseconds)
    pub due_ms: u64,
    /// Re-arm period for intervals, `None` for one-shot timeouts
    pub period_ms: Option<u64>,
}

/// Timers and frame requests against one millisecond clock
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer>,
    frames: Vec<FrameRequestId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Fire every `period_ms`, first at now + period
    pub fn set_interval(&mut self, period_ms: u64) -> TimerId {
        let period_ms = period_ms.max(1);
        let id = TimerId(self.next_id());
        self.timers.insert(
            id,
            Timer {
                due_ms: self.now_ms + period_ms,
                period_ms: Some(period_ms),
            },
        );
        id
    }

    /// Fire once at now + delay
    pub fn set_timeout(&mut self, delay_ms: u64) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers.insert(
            id,
            Timer {
                due_ms: self.now_ms + delay_ms,
                period_ms: None,
            },
        );
        id
    }

    /// Cancel a timer. Returns false if it had already fired or never existed.
    pub fn clear(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn timer(&self, id: TimerId) -> Option<Timer> {
        self.timers.get(&id).copied()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn timers(&self) -> impl Iterator<Item = (TimerId, Timer)> + '_ {
        self.timers.iter().map(|(&id, &timer)| (id, timer))
    }

    pub fn request_animation_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id());
        self.frames.push(id);
        id
    }

    pub fn cancel_animation_frame(&mut self, id: FrameRequestId) -> bool {
        let before = self.frames.len();
        self.frames.retain(|&pending| pending != id);
        self.frames.len() != before
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Hand out every request made before this display refresh
    pub fn take_frame_requests(&mut self) -> Vec<FrameRequestId> {
        std::mem::take(&mut self.frames)
    }

    /// Pop the earliest timer due at or before `until_ms`.
    ///
    /// The clock moves to the timer's due time. Intervals are re-armed,
    /// timeouts are removed. Ties fire in creation order.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<TimerId> {
        let (id, timer) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due_ms <= until_ms)
            .min_by_key(|(id, timer)| (timer.due_ms, **id))
            .map(|(&id, &timer)| (id, timer))?;

        self.now_ms = self.now_ms.max(timer.due_ms);
        match timer.period_ms {
            Some(period_ms) => {
                if let Some(pending) = self.timers.get_mut(&id) {
                    pending.due_ms += period_ms;
                }
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some(id)
    }

    /// Move the clock forward (never backward)
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}
