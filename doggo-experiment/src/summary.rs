//! Derived performance summary for score-percentile feedback.
//!
//! `IES = meanRT / (1 - errorRate)`, `z = (IES - popMean) / popSD`, and the
//! quantile is `Φ(z)` using the Abramowitz–Stegun 7.1.26 erf approximation.

use crate::threshold::guarded_divisor;
use doggo_core::{TrialRecord, TrialType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Stimuli shown: fast, slow, error and timeout trials.
    pub presented: usize,
    pub correct: usize,
    pub errors: usize,
    pub early_presses: usize,
    pub mean_rt_ms: Option<f64>,
    /// `(errors + timeouts) / presented`.
    pub error_rate: f64,
    pub ies: Option<f64>,
    pub z_score: Option<f64>,
    pub quantile: Option<f64>,
}

pub fn summarize(records: &[TrialRecord], population_mean: f64, population_sd: f64) -> PerformanceSummary {
    let mut correct_rts = Vec::new();
    let mut presented = 0;
    let mut errors = 0;
    let mut early_presses = 0;

    for record in records {
        match record.trial_type {
            TrialType::Fast | TrialType::Slow => {
                presented += 1;
                if let Some(rt) = record.rt_ms {
                    correct_rts.push(rt);
                }
            }
            TrialType::Error | TrialType::Timeout => {
                presented += 1;
                errors += 1;
            }
            TrialType::Early => early_presses += 1,
        }
    }

    let mean_rt_ms = if correct_rts.is_empty() {
        None
    } else {
        Some(correct_rts.iter().sum::<f64>() / correct_rts.len() as f64)
    };
    let error_rate = if presented == 0 {
        0.0
    } else {
        errors as f64 / presented as f64
    };
    let ies = mean_rt_ms.filter(|_| error_rate < 1.0).map(|m| m / (1.0 - error_rate));
    let z_score = ies.map(|ies| (ies - population_mean) / guarded_divisor(population_sd));
    let quantile = z_score.map(normal_cdf);

    PerformanceSummary {
        presented,
        correct: correct_rts.len(),
        errors,
        early_presses,
        mean_rt_ms,
        error_rate,
        ies,
        z_score,
        quantile,
    }
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
