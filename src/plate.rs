//! Registration plate templates and the run-scoped plate registry.

use rand::Rng;
use std::collections::HashSet;

/// One slot of a plate template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
    /// A random digit, `0` to `9`.
    Digit,
    /// A random uppercase letter, `A` to `Z`.
    Letter,
}

/// A registration plate template, one slot per character.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlateTemplate {
    slots: Vec<Slot>,
}

impl PlateTemplate {
    /// Parses a template string; `D` is a digit slot,
    /// any other character a letter slot.
    pub fn parse(format: &str) -> Self {
        let slots = format
            .chars()
            .map(|c| if c == 'D' { Slot::Digit } else { Slot::Letter })
            .collect();
        Self { slots }
    }

    /// The number of slots in the template.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the template has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Instantiates the template with random digits and letters.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> String {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Digit => (b'0' + rng.gen_range(0..10u8)) as char,
                Slot::Letter => (b'A' + rng.gen_range(0..26u8)) as char,
            })
            .collect()
    }
}

/// The set of plates issued during one simulation run.
///
/// Scoped to a run rather than shared process-wide, so independent
/// runs never observe each other's plates.
#[derive(Debug, Default)]
pub struct PlateRegistry {
    used: HashSet<String>,
}

impl PlateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Generates a plate not issued before in this run and records it.
    ///
    /// Termination is only probabilistic: a template with very few
    /// combinations and a large population may retry indefinitely.
    pub fn generate_unique<R: Rng>(&mut self, template: &PlateTemplate, rng: &mut R) -> String {
        let mut plate = template.generate(rng);
        while !self.used.insert(plate.clone()) {
            plate = template.generate(rng);
        }
        plate
    }

    /// Whether the given plate has been issued in this run.
    pub fn contains(&self, plate: &str) -> bool {
        self.used.contains(plate)
    }

    /// The number of plates issued so far.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether no plates have been issued yet.
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
