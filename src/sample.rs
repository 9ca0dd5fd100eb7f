//! Gaussian sampling of daily populations and speeds.

use crate::config::Stat;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Samples today's population count for a type.
///
/// The draw is truncated toward zero and clamped to a minimum of 0, so
/// a stat with high variance never yields a negative population.
pub fn sample_count<R: Rng>(stat: &Stat, rng: &mut R) -> u32 {
    let normal =
        Normal::new(stat.number_mean, stat.number_std_dev).expect("invalid standard deviation");
    (normal.sample(rng) as i64).max(0) as u32
}

/// Samples a speed in km/h, clamped to a minimum of 0.
pub fn sample_speed<R: Rng>(stat: &Stat, rng: &mut R) -> f64 {
    let normal =
        Normal::new(stat.speed_mean, stat.speed_std_dev).expect("invalid standard deviation");
    normal.sample(rng).max(0.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_deviation_always_yields_the_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        let stat = Stat {
            number_mean: 7.9,
            number_std_dev: 0.0,
            speed_mean: 42.5,
            speed_std_dev: 0.0,
        };
        for _ in 0..20 {
            assert_eq!(sample_count(&stat, &mut rng), 7);
            assert_approx_eq!(sample_speed(&stat, &mut rng), 42.5);
        }
    }

    #[test]
    fn samples_are_never_negative() {
        let mut rng = StdRng::seed_from_u64(2);
        let stat = Stat {
            number_mean: 0.5,
            number_std_dev: 10.0,
            speed_mean: 1.0,
            speed_std_dev: 30.0,
        };
        for _ in 0..500 {
            assert!(sample_count(&stat, &mut rng) < 1000);
            assert!(sample_speed(&stat, &mut rng) >= 0.0);
        }
    }
}
