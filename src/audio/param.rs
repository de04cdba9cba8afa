//! Automatable node parameters with browser-style scheduling.

/// How an automation event reaches its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationKind {
    /// Jump to the value at the event time
    SetValue,
    /// Interpolate linearly from the previous event to the value
    LinearRamp,
}

/// One scheduled change of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationEvent {
    pub kind: AutomationKind,
    pub value: f32,
    /// Context time (seconds)
    pub time: f64,
}

/// A parameter whose value can be scheduled against the context clock
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    min: f32,
    max: f32,
    events: Vec<AutomationEvent>,
    /// Start point of a ramp that has no preceding event
    origin: (f64, f32),
}

impl AudioParam {
    /// Create a parameter with an intrinsic value and nominal range
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let value = value.clamp(min, max);
        Self {
            value,
            min,
            max,
            events: Vec::new(),
            origin: (0.0, value),
        }
    }

    /// Intrinsic value, used before the first event
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Scheduled events in time order
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64, now: f64) {
        self.insert(AutomationKind::SetValue, value, time, now);
    }

    /// Schedule a linear ramp ending at `time`.
    ///
    /// A ramp with no earlier event starts at `now` from the intrinsic value.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64, now: f64) {
        self.insert(AutomationKind::LinearRamp, value, time, now);
    }

    /// Remove every event at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time < time);
    }

    fn insert(&mut self, kind: AutomationKind, value: f32, time: f64, now: f64) {
        if self.events.is_empty() {
            self.origin = (now, self.value);
        }
        let value = value.clamp(self.min, self.max);
        let index = self.events.partition_point(|event| event.time <= time);
        self.events.insert(index, AutomationEvent { kind, value, time });
    }

    /// Computed value at context time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        let next_index = self.events.partition_point(|event| event.time <= t);

        let Some(next) = self.events.get(next_index) else {
            return self.events.last().map_or(self.value, |last| last.value);
        };

        let (start_time, start_value) = match next_index {
            0 => self.origin,
            i => {
                let prev = self.events[i - 1];
                (prev.time, prev.value)
            }
        };

        match next.kind {
            AutomationKind::SetValue => {
                if next_index == 0 {
                    self.value
                } else {
                    start_value
                }
            }
            AutomationKind::LinearRamp => {
                if t < start_time {
                    return start_value;
                }
                let span = next.time - start_time;
                if span <= 0.0 {
                    return next.value;
                }
                let progress = ((t - start_time) / span) as f32;
                start_value + (next.value - start_value) * progress
            }
        }
    }

    /// Fill `out` with per-frame values starting at `start_time`
    pub fn fill(&self, start_time: f64, frame_duration: f64, out: &mut [f32]) {
        if self.events.is_empty() {
            out.fill(self.value);
            return;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.value_at(start_time + i as f64 * frame_duration);
        }
    }
}
