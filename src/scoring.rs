//! Movement-specific scoring.
//!
//! [`score_from_metrics`] is a pure function of the movement name, the
//! per-frame feature arrays and the coverage ratio. Metrics are rounded for
//! display only; the score is always computed from unrounded values.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::features::FeatureSeries;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

/// Known movement categories. Anything unrecognised scores as `Generic`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Plank,
    Squat,
    SideBend,
    Generic,
}

impl Movement {
    /// Case-insensitive substring match; the first category that matches wins.
    pub fn classify(name: &str) -> Movement {
        // Compile once; classification runs per analysis.
        static PATTERNS: OnceLock<[(Regex, Movement); 3]> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                (Regex::new(r"(?i)plank").unwrap(), Movement::Plank),
                (Regex::new(r"(?i)squat").unwrap(), Movement::Squat),
                (Regex::new(r"(?i)side\s*bend").unwrap(), Movement::SideBend),
            ]
        });
        patterns
            .iter()
            .find(|(re, _)| re.is_match(name))
            .map(|(_, movement)| *movement)
            .unwrap_or(Movement::Generic)
    }
}

/// Population mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Round to a fixed number of decimal places for reporting.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn minimum_or(values: &[f64], empty: f64) -> f64 {
    if values.is_empty() {
        return empty;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Output of the scorer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scorecard {
    pub score: i64,
    pub feedback: String,
    pub metrics: BTreeMap<String, f64>,
    pub notes: Vec<String>,
}

#[derive(Default)]
struct Draft {
    raw: f64,
    metrics: BTreeMap<String, f64>,
    notes: Vec<String>,
}

impl Draft {
    fn metric(&mut self, name: &str, value: f64, places: i32) {
        self.metrics.insert(name.to_string(), round_to(value, places));
    }

    fn note_if(&mut self, condition: bool, note: &str) {
        if condition {
            self.notes.push(note.to_string());
        }
    }
}

/// Reduce feature arrays plus coverage into a bounded score with feedback.
pub fn score_from_metrics(movement: &str, series: &FeatureSeries, coverage: f64) -> Scorecard {
    let draft = match Movement::classify(movement) {
        Movement::Plank => score_plank(series, coverage),
        Movement::Squat => score_squat(series, coverage),
        Movement::SideBend => score_side_bend(series, coverage),
        Movement::Generic => score_generic(series, coverage),
    };

    // Without a single usable frame there is nothing to reward.
    let raw = if series.is_empty() { 0.0 } else { draft.raw };
    // `as` saturates and maps NaN to 0, which the clamp then lifts to 1.
    let score = (raw.round() as i64).clamp(MIN_SCORE, MAX_SCORE);
    let feedback = if draft.notes.is_empty() {
        tier_feedback(score).to_string()
    } else {
        draft.notes.join("; ")
    };

    Scorecard {
        score,
        feedback,
        metrics: draft.metrics,
        notes: draft.notes,
    }
}

fn tier_feedback(score: i64) -> &'static str {
    if score >= 8 {
        "Good form"
    } else if score >= 5 {
        "Needs improvement"
    } else {
        "Retake suggested"
    }
}

fn score_plank(series: &FeatureSeries, coverage: f64) -> Draft {
    let hip_mean = mean(&series.hip_angles);
    let hip_std = std_dev(&series.hip_angles);
    let tilt = mean(&series.spine_tilts);

    let straight = (10.0 - (180.0 - hip_mean).abs() / 4.0).max(0.0);
    let steady = (10.0 - hip_std * 10.0).max(0.0);
    let covered = coverage * 10.0;

    let mut draft = Draft {
        raw: 0.5 * straight + 0.3 * steady + 0.2 * covered,
        ..Draft::default()
    };
    draft.metric("hipMean", hip_mean, 1);
    draft.metric("hipStd", hip_std, 2);
    draft.metric("spineTilt", tilt, 1);
    draft.note_if(hip_mean < 170.0, "Hips low");
    draft.note_if(hip_mean > 190.0, "Hips high");
    draft.note_if(hip_std > 1.5, "Hold steady");
    draft
}

fn score_squat(series: &FeatureSeries, coverage: f64) -> Draft {
    let min_knee = (minimum_or(&series.knee_left, 180.0) + minimum_or(&series.knee_right, 180.0)) / 2.0;
    let torso = mean(&series.spine_tilts);

    // Left and right knees are pooled into a single spread.
    let pooled: Vec<f64> = series
        .knee_left
        .iter()
        .chain(series.knee_right.iter())
        .copied()
        .collect();

    let depth = (10.0 - (95.0 - min_knee).abs() / 3.0).max(0.0);
    let control = (10.0 - std_dev(&pooled)).max(0.0);
    let upright = (10.0 - torso / 2.0).max(0.0);
    let covered = coverage * 10.0;

    let mut draft = Draft {
        raw: 0.5 * depth + 0.2 * control + 0.1 * upright + 0.2 * covered,
        ..Draft::default()
    };
    draft.metric("minKnee", min_knee, 1);
    draft.metric("torsoTilt", torso, 1);
    draft.note_if(min_knee > 130.0, "Go deeper");
    draft.note_if(torso > 20.0, "Keep chest up");
    draft
}

fn score_side_bend(series: &FeatureSeries, coverage: f64) -> Draft {
    let tilt = mean(&series.spine_tilts);
    let spread = std_dev(&series.spine_tilts);
    let stability = (10.0 - spread).max(0.0);

    let mut draft = Draft {
        raw: 0.6 * stability + 0.4 * coverage * 10.0,
        ..Draft::default()
    };
    draft.metric("spineTilt", tilt, 1);
    draft.metric("spineStd", spread, 2);
    draft
}

fn score_generic(series: &FeatureSeries, coverage: f64) -> Draft {
    let spread = std_dev(&series.hip_angles);
    let stability = (10.0 - spread).max(0.0);

    let mut draft = Draft {
        raw: 0.6 * stability + 0.4 * coverage * 10.0,
        ..Draft::default()
    };
    draft.metric("hipStd", spread, 2);
    draft
}
