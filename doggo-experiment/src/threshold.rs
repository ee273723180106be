/// Textbook median; even lengths average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Divisors that are not strictly positive fall back to 1.
pub(crate) fn guarded_divisor(value: f64) -> f64 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        1.0
    }
}

/// Running median of admitted reaction times, recomputed from the full
/// history on every admission. Levels only run a few dozen trials.
#[derive(Debug, Clone)]
pub struct ThresholdTracker {
    reaction_times: Vec<f64>,
    median_rt_ms: f64,
}

impl ThresholdTracker {
    pub fn new(initial_median_rt_ms: f64) -> Self {
        Self {
            reaction_times: Vec::new(),
            median_rt_ms: initial_median_rt_ms,
        }
    }

    /// Admits one RT and returns the new median. Non-finite values are dropped.
    pub fn admit(&mut self, rt_ms: f64) -> f64 {
        if !rt_ms.is_finite() {
            tracing::warn!(rt_ms, "non-finite reaction time not admitted");
            return self.median_rt_ms;
        }
        self.reaction_times.push(rt_ms);
        if let Some(m) = median(&self.reaction_times) {
            self.median_rt_ms = m;
        }
        self.median_rt_ms
    }

    pub fn median_rt_ms(&self) -> f64 {
        self.median_rt_ms
    }

    pub fn reaction_times(&self) -> &[f64] {
        &self.reaction_times
    }

    /// Fast/slow cutoff: `median / difficulty`.
    pub fn effective_threshold(&self, game_difficulty: f64) -> f64 {
        self.median_rt_ms / guarded_divisor(game_difficulty)
    }

    /// Response window length: `2 * median`, never below 1 ms.
    pub fn max_rt_ms(&self) -> f64 {
        guarded_divisor(2.0 * self.median_rt_ms)
    }
}
