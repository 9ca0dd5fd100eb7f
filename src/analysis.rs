//! Replays an event log into trips, per-type profiles, daily totals
//! and speed-limit breaches.

use crate::config::{Road, Stat, TrafficConfig};
use crate::error::{Error, Result};
use crate::event::{EventKind, EventLog};
use itertools::iproduct;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One (day, type) aggregate row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyTotal {
    /// Day index, starting from 1.
    pub day: u32,
    /// The vehicle type name.
    pub type_name: String,
    /// Number of arrivals of this type on this day.
    pub count: u32,
    /// Mean arrival speed of this type on this day, 0 when none arrived.
    pub avg_speed: f64,
}

/// The output of one analysis pass over an event log.
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    /// Per-type volume/speed profile over the whole run, keyed by type
    /// name. Re-used as the baseline for a later live run.
    pub profiles: BTreeMap<String, Stat>,
    /// One row per (day, type), ordered by day then type name.
    pub daily_totals: Vec<DailyTotal>,
    /// Plates whose trip average speed exceeded the limit, by day.
    pub breaches: BTreeMap<u32, Vec<String>>,
}

/// Replays the event log in a single forward pass.
///
/// Trip average speed is road length over net moving time (elapsed
/// minutes minus minutes spent parked), converted to km/h. A trip with
/// zero or negative net moving time counts as an immediate breach
/// rather than an arithmetic fault.
pub fn analyze(log: &EventLog, config: &TrafficConfig) -> AnalysisReport {
    let days = log.days as usize;
    let mut counts: HashMap<&str, Vec<u32>> = HashMap::new();
    let mut speed_sums: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut speeds: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut arrival_minute: HashMap<&str, u32> = HashMap::new();
    let mut park_start: HashMap<&str, u32> = HashMap::new();
    let mut parked_total: HashMap<&str, u32> = HashMap::new();
    let mut breaches: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    log::info!("analyzing {} events over {} days", log.events.len(), log.days);
    for event in &log.events {
        let vtype = event.vehicle_type.as_str();
        let plate = event.plate.as_str();
        let day_idx = (event.day - 1) as usize;
        match event.kind {
            EventKind::Arrival { speed } => {
                counts.entry(vtype).or_insert_with(|| vec![0; days])[day_idx] += 1;
                speed_sums.entry(vtype).or_insert_with(|| vec![0.0; days])[day_idx] += speed;
                speeds.entry(vtype).or_default().push(speed);
                arrival_minute.insert(plate, event.minute);
            }
            EventKind::ParkStart => {
                park_start.insert(plate, event.minute);
            }
            EventKind::ParkStop => {
                if let Some(start) = park_start.remove(plate) {
                    *parked_total.entry(plate).or_insert(0) += event.minute - start;
                }
            }
            EventKind::DepartEnd => {
                if let Some(arrived) = arrival_minute.get(plate) {
                    let parked = parked_total.get(plate).copied().unwrap_or(0);
                    let moving = event.minute as i64 - *arrived as i64 - parked as i64;
                    if is_breach(config.road.length, moving, config.road.max_speed) {
                        breaches.entry(event.day).or_default().push(plate.to_string());
                    }
                }
            }
            EventKind::Move | EventKind::DepartSide => {}
        }
    }

    let profiles = config
        .types
        .keys()
        .map(|name| {
            let day_counts: Vec<f64> = counts
                .get(name.as_str())
                .map(|v| v.iter().map(|&c| c as f64).collect())
                .unwrap_or_default();
            let (number_mean, number_std_dev) = mean_std_dev(&day_counts);
            let type_speeds = speeds.get(name.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let (speed_mean, speed_std_dev) = mean_std_dev(type_speeds);
            let profile = Stat {
                number_mean,
                number_std_dev,
                speed_mean,
                speed_std_dev,
            };
            (name.clone(), profile)
        })
        .collect();

    let daily_totals = iproduct!(1..=log.days, config.types.keys())
        .map(|(day, name)| {
            let day_idx = (day - 1) as usize;
            let count = counts.get(name.as_str()).map_or(0, |v| v[day_idx]);
            let speed_sum = speed_sums.get(name.as_str()).map_or(0.0, |v| v[day_idx]);
            let avg_speed = if count > 0 {
                speed_sum / count as f64
            } else {
                if speed_sum > 0.0 {
                    log::warn!(
                        "internal inconsistency: no {name} arrivals on day {day} \
                         but tracked speed mass {speed_sum}"
                    );
                }
                0.0
            };
            DailyTotal {
                day,
                type_name: name.clone(),
                count,
                avg_speed,
            }
        })
        .collect();

    AnalysisReport {
        profiles,
        daily_totals,
        breaches,
    }
}

/// Whether a completed trip breached the speed limit.
fn is_breach(length: f64, moving_minutes: i64, max_speed: f64) -> bool {
    if moving_minutes <= 0 {
        // Instantaneous travel reads as infinitely fast.
        return true;
    }
    length / moving_minutes as f64 * 60.0 > max_speed
}

/// Sample mean and standard deviation (divisor n - 1, 0 when n < 2).
fn mean_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let squared: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (mean, (squared / (values.len() - 1) as f64).sqrt())
}

/// Writes the per-type statistics file, re-readable as a baseline by
/// the configuration loader.
pub fn write_stats_file(
    profiles: &BTreeMap<String, Stat>,
    road: &Road,
    path: &Path,
) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    writeln!(
        w,
        "{} {} {} {}",
        profiles.len(),
        road.length,
        road.max_speed,
        road.parking_spaces
    )?;
    for (name, stat) in profiles {
        writeln!(
            w,
            "{name}:{}:{}:{}:{}",
            stat.number_mean, stat.number_std_dev, stat.speed_mean, stat.speed_std_dev
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Writes the breach report, grouped by day.
pub fn write_breach_report(breaches: &BTreeMap<u32, Vec<String>>, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    for (day, plates) in breaches {
        writeln!(w, "On day: {day}")?;
        for plate in plates {
            writeln!(w, "{plate}")?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Writes the daily totals file, one `day:type:count:avgSpeed` line per
/// (day, type) pair.
pub fn write_daily_totals(totals: &[DailyTotal], path: &Path) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    for total in totals {
        writeln!(
            w,
            "{}:{}:{}:{}",
            total.day, total.type_name, total.count, total.avg_speed
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Reads a daily totals file previously written by [write_daily_totals].
pub fn read_daily_totals(path: &Path) -> Result<Vec<DailyTotal>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let malformed = || Error::MalformedInput(format!("bad daily total: {line:?}"));
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 4 {
                return Err(malformed());
            }
            Ok(DailyTotal {
                day: fields[0].parse().map_err(|_| malformed())?,
                type_name: fields[1].to_string(),
                count: fields[2].parse().map_err(|_| malformed())?,
                avg_speed: fields[3].parse().map_err(|_| malformed())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::VehicleType;
    use crate::event::Event;
    use crate::plate::PlateTemplate;
    use assert_approx_eq::assert_approx_eq;

    fn config(length: f64, max_speed: f64) -> TrafficConfig {
        let name = "Car".to_string();
        let vtype = VehicleType {
            name: name.clone(),
            can_park: true,
            template: PlateTemplate::parse("LLLDDD"),
            volume_weight: 1,
            speed_weight: 1,
        };
        TrafficConfig {
            road: Road {
                length,
                max_speed,
                parking_spaces: 5,
            },
            types: [(name.clone(), vtype)].into(),
            stats: [(name, Stat::default())].into(),
        }
    }

    fn event(plate: &str, minute: u32, kind: EventKind) -> Event {
        Event {
            vehicle_type: "Car".to_string(),
            plate: plate.to_string(),
            day: 1,
            minute,
            kind,
        }
    }

    #[test]
    fn trip_speed_is_exact_for_a_hand_built_log() {
        // 10 km in 60 minutes is 10 km/h; breaches a 9 km/h limit
        // but not a 10 km/h one.
        let log = EventLog {
            days: 1,
            events: vec![
                event("AAA111", 10, EventKind::Arrival { speed: 10.0 }),
                event("AAA111", 70, EventKind::DepartEnd),
            ],
        };
        let report = analyze(&log, &config(10.0, 9.0));
        assert_eq!(report.breaches[&1], vec!["AAA111".to_string()]);
        let report = analyze(&log, &config(10.0, 10.0));
        assert!(report.breaches.is_empty());
    }

    #[test]
    fn parked_minutes_are_subtracted_from_the_trip() {
        // Two park episodes of 10 and 5 minutes leave 45 moving
        // minutes for 10 km: 13.33 km/h.
        let log = EventLog {
            days: 1,
            events: vec![
                event("AAA111", 10, EventKind::Arrival { speed: 10.0 }),
                event("AAA111", 20, EventKind::ParkStart),
                event("AAA111", 30, EventKind::ParkStop),
                event("AAA111", 50, EventKind::ParkStart),
                event("AAA111", 55, EventKind::ParkStop),
                event("AAA111", 70, EventKind::DepartEnd),
            ],
        };
        let report = analyze(&log, &config(10.0, 13.0));
        assert_eq!(report.breaches[&1], vec!["AAA111".to_string()]);
        let report = analyze(&log, &config(10.0, 14.0));
        assert!(report.breaches.is_empty());
    }

    #[test]
    fn zero_moving_time_is_an_immediate_breach() {
        let log = EventLog {
            days: 1,
            events: vec![
                event("AAA111", 10, EventKind::Arrival { speed: 10.0 }),
                event("AAA111", 10, EventKind::DepartEnd),
            ],
        };
        let report = analyze(&log, &config(10.0, 1000.0));
        assert_eq!(report.breaches[&1], vec!["AAA111".to_string()]);
    }

    #[test]
    fn single_day_deviation_is_zero() {
        let log = EventLog {
            days: 1,
            events: vec![
                event("AAA111", 10, EventKind::Arrival { speed: 40.0 }),
                event("BBB222", 20, EventKind::Arrival { speed: 60.0 }),
            ],
        };
        let report = analyze(&log, &config(10.0, 60.0));
        let profile = &report.profiles["Car"];
        assert_approx_eq!(profile.number_mean, 2.0);
        assert_eq!(profile.number_std_dev, 0.0);
        assert_approx_eq!(profile.speed_mean, 50.0);
        assert_approx_eq!(profile.speed_std_dev, (200.0_f64).sqrt());
    }

    #[test]
    fn absent_days_report_zero_counts_and_speeds() {
        let mut arrival = event("AAA111", 10, EventKind::Arrival { speed: 40.0 });
        arrival.day = 2;
        let log = EventLog {
            days: 3,
            events: vec![arrival],
        };
        let report = analyze(&log, &config(10.0, 60.0));
        assert_eq!(report.daily_totals.len(), 3);
        assert_eq!(report.daily_totals[0].count, 0);
        assert_eq!(report.daily_totals[0].avg_speed, 0.0);
        assert_eq!(report.daily_totals[1].count, 1);
        assert_approx_eq!(report.daily_totals[1].avg_speed, 40.0);
        // volume over days [0, 1, 0]
        let profile = &report.profiles["Car"];
        assert_approx_eq!(profile.number_mean, 1.0 / 3.0);
        assert_approx_eq!(profile.number_std_dev, (1.0_f64 / 3.0).sqrt());
    }

    #[test]
    fn unseen_type_reports_all_zeros() {
        let log = EventLog {
            days: 2,
            events: vec![],
        };
        let report = analyze(&log, &config(10.0, 60.0));
        assert_eq!(report.profiles["Car"], Stat::default());
        assert!(report.daily_totals.iter().all(|t| t.count == 0));
    }
}
