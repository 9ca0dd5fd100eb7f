//! The per-minute stochastic simulation engine.

use crate::config::TrafficConfig;
use crate::event::{Event, EventKind, EventLog};
use crate::plate::PlateRegistry;
use crate::sample::{sample_count, sample_speed};
use crate::vehicle::Vehicle;
use crate::{VehicleId, VehicleSet};
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};

/// Minutes in one simulated day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// The curfew minute (23:00); no new vehicle is introduced after it.
pub const CURFEW_MINUTE: u32 = 1380;

/// Percentage of per-vehicle draws that trigger a side departure.
const DEPART_SIDE_PCT: u32 = 5;

/// Percentage of per-vehicle draws that toggle parking.
/// The remaining share triggers arrivals.
const PARK_PCT: u32 = 5;

/// The random event class drawn for each vehicle each minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventClass {
    DepartSide,
    ArrivalTrigger,
    ParkToggle,
}

/// Mutable per-day road state.
struct RoadState {
    /// Plates not yet introduced today, FIFO per type name.
    remains: BTreeMap<String, VecDeque<String>>,
    /// Total number of plates left in `remains`.
    remaining: u32,
    /// Currently free parking spaces.
    parking_free: u32,
    /// The vehicles currently on the road.
    vehicles: VehicleSet,
    /// Vehicles that arrived this minute; they join the road at its end
    /// so they are not moved during their own arrival minute.
    arrivals: Vec<Vehicle>,
    /// Whether the post-curfew "no more arrivals" condition was logged today.
    curfew_noted: bool,
    /// Whether the exhausted-population condition was logged today.
    exhausted_noted: bool,
}

/// A single-road traffic simulation.
///
/// The random source is injected so a seeded run produces an exactly
/// reproducible event stream; independent runs get independent sources
/// and plate registries.
pub struct Simulation<R: Rng> {
    /// The validated configuration the run draws from.
    config: TrafficConfig,
    /// The random source for the whole run.
    rng: R,
    /// Plates issued during this run.
    plates: PlateRegistry,
}

impl<R: Rng> Simulation<R> {
    /// Creates a new simulation over the given configuration.
    pub fn new(config: TrafficConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            plates: PlateRegistry::new(),
        }
    }

    /// The configuration this simulation runs over.
    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Simulates the given number of days and returns the event log.
    pub fn run(&mut self, days: u32) -> EventLog {
        let mut events = Vec::new();
        for day in 1..=days {
            log::info!("simulating day {day}");
            self.run_day(day, &mut events);
        }
        EventLog { days, events }
    }

    /// Simulates one day's minute loop.
    fn run_day(&mut self, day: u32, events: &mut Vec<Event>) {
        let mut state = self.day_start();
        for minute in 1..=MINUTES_PER_DAY {
            if state.vehicles.is_empty() {
                if minute > CURFEW_MINUTE {
                    log::info!("day {day}: road empty after 23:00, done for the day");
                    break;
                } else if state.remaining == 0 {
                    log::info!("day {day}: road empty and population exhausted, done for the day");
                    break;
                }
                // remaining > 0, so the draw is guaranteed to succeed
                let event = self.draw_arrival(&mut state, day, minute).unwrap();
                log::debug!("day {day}: road empty, forced arrival of {}", event.plate);
                events.push(event);
            }

            let ids: Vec<VehicleId> = state.vehicles.keys().collect();
            for id in ids {
                self.step_vehicle(id, day, minute, &mut state, events);
            }

            for vehicle in state.arrivals.drain(..) {
                state.vehicles.insert(vehicle);
            }
        }
    }

    /// Samples today's population and pre-generates its plates.
    fn day_start(&mut self) -> RoadState {
        let mut remains = BTreeMap::new();
        let mut remaining = 0;
        for (name, vtype) in &self.config.types {
            let count = sample_count(&self.config.stats[name], &mut self.rng);
            let mut plates = VecDeque::with_capacity(count as usize);
            for _ in 0..count {
                plates.push_back(self.plates.generate_unique(&vtype.template, &mut self.rng));
            }
            log::debug!("population for {name}: {count}");
            remaining += count;
            remains.insert(name.clone(), plates);
        }
        RoadState {
            remains,
            remaining,
            parking_free: self.config.road.parking_spaces,
            vehicles: VehicleSet::default(),
            arrivals: Vec::new(),
            curfew_noted: false,
            exhausted_noted: false,
        }
    }

    /// Processes one vehicle for one minute: movement, then the random
    /// event-class draw.
    fn step_vehicle(
        &mut self,
        id: VehicleId,
        day: u32,
        minute: u32,
        state: &mut RoadState,
        events: &mut Vec<Event>,
    ) {
        if !state.vehicles[id].parked {
            let delta = self.rng.gen_range(-1.0..=1.0);
            let vehicle = &mut state.vehicles[id];
            vehicle.advance(delta);
            events.push(event_for(vehicle, day, minute, EventKind::Move));
            if vehicle.distance >= self.config.road.length {
                events.push(event_for(vehicle, day, minute, EventKind::DepartEnd));
                state.vehicles.remove(id);
                return;
            }
        }

        match self.draw_event_class() {
            EventClass::DepartSide => {
                let vehicle = &state.vehicles[id];
                if !vehicle.parked {
                    events.push(event_for(vehicle, day, minute, EventKind::DepartSide));
                    state.vehicles.remove(id);
                }
            }
            EventClass::ParkToggle => self.toggle_parking(id, day, minute, state, events),
            EventClass::ArrivalTrigger => {
                // Models a per-minute, per-occupant chance of a new car
                // entering; independent of the vehicle that drew it.
                if minute <= CURFEW_MINUTE && state.remaining > 0 {
                    let event = self.draw_arrival(state, day, minute).unwrap();
                    events.push(event);
                } else if state.remaining == 0 {
                    if !state.exhausted_noted {
                        log::debug!("day {day}: population exhausted, no further arrivals");
                        state.exhausted_noted = true;
                    }
                } else if !state.curfew_noted {
                    log::debug!("day {day}: past 23:00, no further arrivals");
                    state.curfew_noted = true;
                }
            }
        }
    }

    /// Parks an unparked vehicle (given permission and a free space) or
    /// unparks a parked one, resampling its speed.
    fn toggle_parking(
        &mut self,
        id: VehicleId,
        day: u32,
        minute: u32,
        state: &mut RoadState,
        events: &mut Vec<Event>,
    ) {
        let can_park = self.config.types[&state.vehicles[id].type_name].can_park;
        let vehicle = &mut state.vehicles[id];
        if vehicle.parked {
            vehicle.parked = false;
            state.parking_free += 1;
            let stat = &self.config.stats[&vehicle.type_name];
            vehicle.speed = sample_speed(stat, &mut self.rng);
            events.push(event_for(vehicle, day, minute, EventKind::ParkStop));
        } else if can_park && state.parking_free > 0 {
            vehicle.parked = true;
            state.parking_free -= 1;
            events.push(event_for(vehicle, day, minute, EventKind::ParkStart));
        }
    }

    /// Introduces one vehicle from the remaining population.
    ///
    /// The type is chosen uniformly among types with plates still
    /// queued; the new vehicle is staged and joins the road at the end
    /// of the current minute. Returns `None` when the population is
    /// exhausted.
    fn draw_arrival(&mut self, state: &mut RoadState, day: u32, minute: u32) -> Option<Event> {
        if state.remaining == 0 {
            return None;
        }
        let name = {
            let candidates: Vec<&String> = state
                .remains
                .iter()
                .filter(|(_, queue)| !queue.is_empty())
                .map(|(name, _)| name)
                .collect();
            candidates[self.rng.gen_range(0..candidates.len())].clone()
        };
        let plate = state.remains.get_mut(&name)?.pop_front()?;
        state.remaining -= 1;
        let speed = sample_speed(&self.config.stats[&name], &mut self.rng);
        let vehicle = Vehicle::new(name, plate, speed);
        let event = event_for(&vehicle, day, minute, EventKind::Arrival { speed });
        state.arrivals.push(vehicle);
        Some(event)
    }

    /// Draws the per-vehicle event class with fixed proportions:
    /// 5% side departure, 5% park toggle, 90% arrival trigger.
    fn draw_event_class(&mut self) -> EventClass {
        let n = self.rng.gen_range(0..100);
        if n < DEPART_SIDE_PCT {
            EventClass::DepartSide
        } else if n < 100 - PARK_PCT {
            EventClass::ArrivalTrigger
        } else {
            EventClass::ParkToggle
        }
    }
}

fn event_for(vehicle: &Vehicle, day: u32, minute: u32, kind: EventKind) -> Event {
    Event {
        vehicle_type: vehicle.type_name.clone(),
        plate: vehicle.plate.clone(),
        day,
        minute,
        kind,
    }
}
