//! Session timing and signal-strength simulation parameters.

/// Timers and ranges driving one simulated transmission
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Period of the signal-strength perturbation (milliseconds)
    pub strength_update_interval_ms: u64,

    /// Session length before the automatic stop (milliseconds)
    pub auto_stop_after_ms: u64,

    /// Lowest signal strength ever displayed (percent)
    pub strength_min: u8,

    /// Highest signal strength ever displayed (percent)
    pub strength_max: u8,

    /// Maximum perturbation per tick, applied as a uniform delta in [-j, +j] (percent)
    pub strength_jitter: f32,

    /// Internal level each session starts from (percent)
    pub initial_level: f32,

    /// Readout shown before the first session ever ticks (percent)
    pub initial_display: u8,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            strength_update_interval_ms: 800,
            auto_stop_after_ms: 15_000,
            strength_min: 10,
            strength_max: 100,
            strength_jitter: 5.0,
            initial_level: 80.0,
            initial_display: 100,
        }
    }
}

impl SessionTiming {
    pub fn validate(&self) -> Result<(), String> {
        if self.strength_update_interval_ms == 0 {
            return Err("Strength update interval must be > 0".to_string());
        }
        if self.strength_min > self.strength_max {
            return Err(format!(
                "Strength range is empty: {}..={}",
                self.strength_min, self.strength_max
            ));
        }
        if !self.strength_jitter.is_finite() || self.strength_jitter < 0.0 {
            return Err(format!(
                "Strength jitter must be finite and >= 0, got {}",
                self.strength_jitter
            ));
        }
        let range = self.strength_min..=self.strength_max;
        if !range.contains(&self.initial_display) {
            return Err(format!(
                "Initial display {} outside {}..={}",
                self.initial_display, self.strength_min, self.strength_max
            ));
        }
        let level_range = self.strength_min as f32..=self.strength_max as f32;
        if !level_range.contains(&self.initial_level) {
            return Err(format!(
                "Initial level {} outside {}..={}",
                self.initial_level, self.strength_min, self.strength_max
            ));
        }
        Ok(())
    }

    /// Clamp a raw level into the displayable strength range
    pub fn clamp_level(&self, level: f32) -> f32 {
        level.clamp(self.strength_min as f32, self.strength_max as f32)
    }
}
