pub use alert::{evaluate, write_intrusion_report, Alert, AlertKind};
pub use analysis::{
    analyze, read_daily_totals, write_breach_report, write_daily_totals, write_stats_file,
    AnalysisReport, DailyTotal,
};
pub use config::{read_stat_file, read_vehicle_file, Road, Stat, TrafficConfig, VehicleType};
pub use error::{Error, Result};
pub use event::{Event, EventKind, EventLog};
pub use plate::{PlateRegistry, PlateTemplate};
pub use sample::{sample_count, sample_speed};
pub use simulation::{Simulation, CURFEW_MINUTE, MINUTES_PER_DAY};
use slotmap::{new_key_type, SlotMap};
use vehicle::Vehicle;

mod alert;
mod analysis;
mod config;
mod error;
mod event;
mod plate;
mod sample;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a vehicle on the road.
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
