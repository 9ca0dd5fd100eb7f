//! Configuration of the monitored road and its vehicle population.
//!
//! Two files describe a run: the vehicle-type file (names, parking
//! permission, plate template and anomaly weights) and the statistics
//! file (road geometry plus per-type distribution parameters). Both are
//! validated here, before any simulation starts; the engines assume a
//! consistent [TrafficConfig].

use crate::error::{Error, Result};
use crate::plate::PlateTemplate;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// An immutable descriptor of one monitored vehicle type.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleType {
    /// The type name, unique within a configuration.
    pub name: String,
    /// Whether vehicles of this type may occupy a parking space.
    pub can_park: bool,
    /// The registration plate template.
    pub template: PlateTemplate,
    /// Weight of this type in the volume anomaly score.
    pub volume_weight: u32,
    /// Weight of this type in the speed anomaly score.
    pub speed_weight: u32,
}

/// Per-type distribution parameters for daily population and speed.
///
/// A standard deviation of 0 means "always the mean".
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    /// Mean daily population count.
    pub number_mean: f64,
    /// Standard deviation of the daily population count.
    pub number_std_dev: f64,
    /// Mean speed in km/h.
    pub speed_mean: f64,
    /// Standard deviation of the speed in km/h.
    pub speed_std_dev: f64,
}

/// The monitored road segment.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Road {
    /// Length of the road in km.
    pub length: f64,
    /// The speed limit in km/h.
    pub max_speed: f64,
    /// Total number of parking spaces along the road.
    pub parking_spaces: u32,
}

/// A validated configuration for one simulated road.
///
/// Types and stats are keyed by type name in ordered maps, so every
/// iteration over them is deterministic; a seeded run consumes its
/// random source in a reproducible order.
#[derive(Clone, Debug)]
pub struct TrafficConfig {
    /// The road segment being monitored.
    pub road: Road,
    /// The monitored vehicle types, keyed by name.
    pub types: BTreeMap<String, VehicleType>,
    /// Distribution parameters per type name.
    pub stats: BTreeMap<String, Stat>,
}

impl TrafficConfig {
    /// Loads and cross-checks the two configuration files.
    pub fn load(vehicle_path: &Path, stat_path: &Path) -> Result<Self> {
        let types = read_vehicle_file(vehicle_path)?;
        let (road, stats) = read_stat_file(stat_path, &types)?;
        Ok(Self { road, types, stats })
    }
}

/// Reads the vehicle-type definition file.
///
/// Format: a count header, then one `name:canPark:template:volumeWeight:speedWeight`
/// record per line, where `canPark` is `0` for no and anything else for yes.
pub fn read_vehicle_file(path: &Path) -> Result<BTreeMap<String, VehicleType>> {
    parse_vehicle_file(&fs::read_to_string(path)?)
}

/// Reads the road/statistics definition file, checking it against the
/// already-loaded vehicle types.
///
/// Format: a `typeCount length maxSpeed parkingSpaces` header, then one
/// `name:numberMean:numberStdDev:speedMean:speedStdDev` record per line.
/// The same format is produced by the analysis pass for baseline and
/// live profiles, so this reader also loads a baseline.
pub fn read_stat_file(
    path: &Path,
    types: &BTreeMap<String, VehicleType>,
) -> Result<(Road, BTreeMap<String, Stat>)> {
    parse_stat_file(&fs::read_to_string(path)?, types)
}

fn parse_vehicle_file(content: &str) -> Result<BTreeMap<String, VehicleType>> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::MalformedInput("vehicle file is empty".to_string()))?;
    let declared: i64 = parse_field(header, "vehicle type count")?;
    if declared < 1 {
        return Err(Error::InvalidParameter(
            "vehicle type count must be greater than 0".to_string(),
        ));
    }

    let mut types = BTreeMap::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 5 {
            return Err(Error::MalformedInput(format!(
                "vehicle record needs 5 fields: {line:?}"
            )));
        }
        let name = fields[0].to_string();
        let can_park = fields[1] != "0";
        let template = PlateTemplate::parse(fields[2]);
        let volume_weight: i64 = parse_field(fields[3], "volume weight")?;
        let speed_weight: i64 = parse_field(fields[4], "speed weight")?;
        if volume_weight < 0 || speed_weight < 0 {
            return Err(Error::InvalidParameter(format!(
                "weights for type {name} must not be negative"
            )));
        }
        types.insert(
            name.clone(),
            VehicleType {
                name,
                can_park,
                template,
                volume_weight: volume_weight as u32,
                speed_weight: speed_weight as u32,
            },
        );
    }

    if types.len() as i64 != declared {
        return Err(Error::ConfigMismatch(format!(
            "vehicle file declares {declared} types but contains {}",
            types.len()
        )));
    }
    Ok(types)
}

fn parse_stat_file(
    content: &str,
    types: &BTreeMap<String, VehicleType>,
) -> Result<(Road, BTreeMap<String, Stat>)> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::MalformedInput("statistics file is empty".to_string()))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(Error::MalformedInput(format!(
            "statistics header needs 4 fields: {header:?}"
        )));
    }
    let declared: i64 = parse_field(fields[0], "vehicle type count")?;
    if declared != types.len() as i64 {
        return Err(Error::ConfigMismatch(
            "number of vehicle types is not consistent between the two files".to_string(),
        ));
    }
    let length: f64 = parse_field(fields[1], "road length")?;
    let max_speed: f64 = parse_field(fields[2], "maximum speed")?;
    let parking_spaces: i64 = parse_field(fields[3], "parking space count")?;
    if length < 0.0 || max_speed < 0.0 || parking_spaces < 0 {
        return Err(Error::InvalidParameter(
            "road length, maximum speed and parking spaces must not be negative".to_string(),
        ));
    }
    let road = Road {
        length,
        max_speed,
        parking_spaces: parking_spaces as u32,
    };

    let mut stats = BTreeMap::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 5 {
            return Err(Error::MalformedInput(format!(
                "statistics record needs 5 fields: {line:?}"
            )));
        }
        let name = fields[0].to_string();
        if !types.contains_key(&name) {
            return Err(Error::ConfigMismatch(format!(
                "statistics file names unknown vehicle type {name}"
            )));
        }
        let stat = Stat {
            number_mean: parse_field(fields[1], "number mean")?,
            number_std_dev: parse_field(fields[2], "number standard deviation")?,
            speed_mean: parse_field(fields[3], "speed mean")?,
            speed_std_dev: parse_field(fields[4], "speed standard deviation")?,
        };
        if stat.number_mean < 0.0
            || stat.number_std_dev < 0.0
            || stat.speed_mean < 0.0
            || stat.speed_std_dev < 0.0
        {
            return Err(Error::InvalidParameter(format!(
                "distribution parameters for type {name} must not be negative"
            )));
        }
        stats.insert(name, stat);
    }

    if stats.len() as i64 != declared {
        return Err(Error::ConfigMismatch(format!(
            "statistics file declares {declared} types but contains {}",
            stats.len()
        )));
    }
    Ok((road, stats))
}

fn parse_field<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::MalformedInput(format!("cannot parse {what} from {field:?}")))
}
