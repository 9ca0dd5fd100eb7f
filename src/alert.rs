//! Compares a live run's daily aggregates against a baseline profile.

use crate::analysis::DailyTotal;
use crate::config::{Stat, VehicleType};
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Factor applied to the summed weights to form the alert thresholds.
const THRESHOLD_FACTOR: f64 = 2.0;

/// The anomaly category of an [Alert].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertKind {
    /// The day's volume deviation score exceeded its threshold.
    Volume,
    /// The day's speed deviation score exceeded its threshold.
    Speed,
}

impl Display for AlertKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "Volume"),
            Self::Speed => write!(f, "Speed"),
        }
    }
}

/// One flagged (day, category) pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alert {
    /// The flagged day.
    pub day: u32,
    /// Whether the volume or the speed threshold was exceeded.
    pub kind: AlertKind,
    /// The accumulated weighted deviation score.
    pub score: f64,
    /// The threshold the score exceeded.
    pub threshold: f64,
}

impl Alert {
    /// The amount by which the threshold was exceeded.
    pub fn exceeded_by(&self) -> f64 {
        self.score - self.threshold
    }
}

/// Scores every day's totals against the baseline profile.
///
/// Totals must be ordered by day, as written by the analysis pass. Day
/// boundaries are an explicit state transition: the running scores are
/// flushed exactly once when the day index increases, and once more at
/// end-of-stream for the final day.
pub fn evaluate(
    totals: &[DailyTotal],
    baseline: &BTreeMap<String, Stat>,
    types: &BTreeMap<String, VehicleType>,
) -> Vec<Alert> {
    let volume_threshold =
        THRESHOLD_FACTOR * types.values().map(|t| t.volume_weight as f64).sum::<f64>();
    let speed_threshold =
        THRESHOLD_FACTOR * types.values().map(|t| t.speed_weight as f64).sum::<f64>();
    log::info!("volume anomaly threshold: {volume_threshold}");
    log::info!("speed anomaly threshold: {speed_threshold}");

    let mut alerts = Vec::new();
    let mut current_day = match totals.first() {
        Some(total) => total.day,
        None => return alerts,
    };
    let mut volume_score = 0.0;
    let mut speed_score = 0.0;

    for total in totals {
        if total.day > current_day {
            flush_day(
                &mut alerts,
                current_day,
                volume_score,
                volume_threshold,
                speed_score,
                speed_threshold,
            );
            volume_score = 0.0;
            speed_score = 0.0;
            current_day = total.day;
        }

        let stat = &baseline[&total.type_name];
        let vtype = &types[&total.type_name];
        volume_score +=
            deviation(total.count as f64, stat.number_mean, stat.number_std_dev)
                * vtype.volume_weight as f64;
        // Speed only counts when at least one vehicle was present.
        if total.count > 0 {
            speed_score += deviation(total.avg_speed, stat.speed_mean, stat.speed_std_dev)
                * vtype.speed_weight as f64;
        }
    }
    flush_day(
        &mut alerts,
        current_day,
        volume_score,
        volume_threshold,
        speed_score,
        speed_threshold,
    );
    alerts
}

/// Closes out one day's accumulators, flagging exceeded thresholds.
fn flush_day(
    alerts: &mut Vec<Alert>,
    day: u32,
    volume_score: f64,
    volume_threshold: f64,
    speed_score: f64,
    speed_threshold: f64,
) {
    log::info!("day {day} volume anomaly score: {volume_score}");
    log::info!("day {day} speed anomaly score: {speed_score}");
    if volume_score > volume_threshold {
        log::warn!("day {day}: volume anomaly threshold exceeded");
        alerts.push(Alert {
            day,
            kind: AlertKind::Volume,
            score: volume_score,
            threshold: volume_threshold,
        });
    }
    if speed_score > speed_threshold {
        log::warn!("day {day}: speed anomaly threshold exceeded");
        alerts.push(Alert {
            day,
            kind: AlertKind::Speed,
            score: speed_score,
            threshold: speed_threshold,
        });
    }
}

/// Normalized absolute deviation; a zero spread falls back to the raw
/// absolute difference.
fn deviation(observed: f64, mean: f64, std_dev: f64) -> f64 {
    let diff = (observed - mean).abs();
    if std_dev > 0.0 {
        diff / std_dev
    } else {
        diff
    }
}

/// Writes the intrusion report, one line per flagged (day, category).
/// No file is created when there is nothing to report.
pub fn write_intrusion_report(alerts: &[Alert], path: &Path) -> Result<()> {
    if alerts.is_empty() {
        return Ok(());
    }
    let mut w = BufWriter::new(fs::File::create(path)?);
    for alert in alerts {
        writeln!(
            w,
            "{} intrusion detected on day {}. The score {} exceeded the threshold by {}.",
            alert.kind,
            alert.day,
            alert.score,
            alert.exceeded_by()
        )?;
    }
    w.flush()?;
    Ok(())
}
