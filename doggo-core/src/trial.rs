use crate::phase::LevelPhase;
use crate::stimulus::{Congruency, Side, Stimulus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialType {
    Fast,
    Slow,
    Early,
    Timeout,
    Error,
}

/// Classification of one trial. Each variant carries only what it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Correct response at or under the threshold. `normalized_rt` is `1 - rt/maxRT`.
    Fast {
        rt_ms: f64,
        normalized_rt: f64,
        points: f64,
    },
    /// Correct response over the threshold. `admitted` when `rt <= maxRT`.
    Slow {
        rt_ms: f64,
        points: f64,
        admitted: bool,
    },
    /// Press while no stimulus was live.
    Early { points: f64 },
    /// No press before the response window closed.
    Timeout,
    /// Wrong direction on a directional stimulus.
    Error { rt_ms: f64, points: f64 },
}

impl Outcome {
    pub fn trial_type(&self) -> TrialType {
        match self {
            Outcome::Fast { .. } => TrialType::Fast,
            Outcome::Slow { .. } => TrialType::Slow,
            Outcome::Early { .. } => TrialType::Early,
            Outcome::Timeout => TrialType::Timeout,
            Outcome::Error { .. } => TrialType::Error,
        }
    }

    pub fn points(&self) -> f64 {
        match self {
            Outcome::Fast { points, .. }
            | Outcome::Slow { points, .. }
            | Outcome::Early { points }
            | Outcome::Error { points, .. } => *points,
            Outcome::Timeout => 0.0,
        }
    }

    pub fn rt_ms(&self) -> Option<f64> {
        match self {
            Outcome::Fast { rt_ms, .. }
            | Outcome::Slow { rt_ms, .. }
            | Outcome::Error { rt_ms, .. } => Some(*rt_ms),
            Outcome::Early { .. } | Outcome::Timeout => None,
        }
    }

    /// Whether the RT feeds the running median.
    pub fn include_in_median(&self) -> bool {
        match self {
            Outcome::Fast { .. } => true,
            Outcome::Slow { admitted, .. } => *admitted,
            Outcome::Early { .. } | Outcome::Timeout | Outcome::Error { .. } => false,
        }
    }

    /// `None` when no stimulus was answered.
    pub fn correct(&self) -> Option<bool> {
        match self {
            Outcome::Fast { .. } | Outcome::Slow { .. } => Some(true),
            Outcome::Error { .. } => Some(false),
            Outcome::Early { .. } | Outcome::Timeout => None,
        }
    }
}

/// One logged trial, as handed to data export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub phase: LevelPhase,
    pub trial_type: TrialType,
    pub timestamp: Option<DateTime<Utc>>,
    pub trial_number: usize,
    #[serde(with = "na", default)]
    pub rt_ms: Option<f64>,
    #[serde(with = "na", default)]
    pub threshold_ms: Option<f64>,
    pub score_after: f64,
    pub score_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congruency: Option<Congruency>,
}

impl TrialRecord {
    pub fn with_stimulus(mut self, stimulus: Option<&Stimulus>) -> Self {
        if let Some(stimulus) = stimulus {
            self.region = stimulus.region();
            self.direction = stimulus.direction();
            self.congruency = stimulus.congruency();
        }
        self
    }
}

/// Missing numbers are exported as the string `"NA"`.
mod na {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_str("NA"),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrNa {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<NumberOrNa>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrNa::Number(v)) => Ok(Some(v)),
            Some(NumberOrNa::Text(s)) if s == "NA" => Ok(None),
            Some(NumberOrNa::Text(s)) => Err(D::Error::custom(format!("expected number or NA, got {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout_record() -> TrialRecord {
        TrialRecord {
            phase: LevelPhase::First,
            trial_type: TrialType::Timeout,
            timestamp: None,
            trial_number: 3,
            rt_ms: None,
            threshold_ms: None,
            score_after: 250.0,
            score_delta: 0.0,
            region: None,
            direction: None,
            congruency: None,
        }
    }

    #[test]
    fn timeout_contributes_nothing() {
        let outcome = Outcome::Timeout;
        assert_eq!(outcome.points(), 0.0);
        assert_eq!(outcome.rt_ms(), None);
        assert!(!outcome.include_in_median());
        assert_eq!(outcome.correct(), None);
    }

    #[test]
    fn slow_admission_is_carried_by_the_variant() {
        let admitted = Outcome::Slow {
            rt_ms: 1500.0,
            points: 0.0,
            admitted: true,
        };
        let late = Outcome::Slow {
            rt_ms: 2500.0,
            points: 0.0,
            admitted: false,
        };
        assert!(admitted.include_in_median());
        assert!(!late.include_in_median());
        assert_eq!(late.correct(), Some(true));
    }

    #[test]
    fn missing_rt_is_exported_as_na() {
        let json = serde_json::to_value(timeout_record()).unwrap();
        assert_eq!(json["rt_ms"], "NA");
        assert_eq!(json["threshold_ms"], "NA");
        assert_eq!(json["phase"], 0);
        assert!(json.get("region").is_none());

        let back: TrialRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, timeout_record());
    }

    #[test]
    fn rejects_non_na_text_for_rt() {
        let mut json = serde_json::to_value(timeout_record()).unwrap();
        json["rt_ms"] = serde_json::Value::from("fast");
        assert!(serde_json::from_value::<TrialRecord>(json).is_err());
    }

    #[test]
    fn record_picks_up_directional_fields() {
        let stimulus = Stimulus::Directional {
            region: Side::Right,
            direction: Side::Left,
        };
        let record = timeout_record().with_stimulus(Some(&stimulus));
        assert_eq!(record.region, Some(Side::Right));
        assert_eq!(record.direction, Some(Side::Left));
        assert_eq!(record.congruency, Some(Congruency::Incongruent));
    }
}
