use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source, in milliseconds since the clock was created.
pub trait Clock: Clone + Send + Sync {
    fn now_ms(&self) -> f64;

    fn elapsed_ms(&self, since_ms: f64) -> f64 {
        (self.now_ms() - since_ms).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

/// Wall clock backed by [`Instant`], with a ring of recorded frame durations
/// for display calibration.
#[derive(Debug, Clone)]
pub struct HighPrecisionClock {
    start: Instant,
    frame_times: Vec<Duration>,
    max_samples: usize,
}

impl Clock for HighPrecisionClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1_000.0
    }
}

impl HighPrecisionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return CalibrationStats {
                average_frame_time_ns: 0.0,
                jitter_ns: 0.0,
                min_frame_time_ns: 0.0,
                max_frame_time_ns: 0.0,
                effective_fps: 0.0,
            };
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

impl Default for HighPrecisionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-driven clock for simulation and tests. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(ms: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(ms.to_bits())),
        }
    }

    pub fn set_ms(&self, ms: f64) {
        self.bits.store(ms.to_bits(), Ordering::SeqCst);
    }

    /// Moves time forward; negative steps are ignored.
    pub fn advance_ms(&self, ms: f64) {
        if ms > 0.0 {
            self.set_ms(self.now_ms() + ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
