//! Logarithmic distance compression
//!
//! Maps a normalized distance onto `ln(1 + 9999·x) / ln(10000)`, so the first
//! few miles away from Home move a hand noticeably while the difference
//! between 3000 and 6000 miles barely registers.

use crate::units::{Distance, DISTANCE_FULL_SCALE};

/// Log curve samples
///
/// Table format: (distance_ppm, scaled_ppm), sorted by distance. Sampled
/// densely near zero where the curve is steepest.
const LOG_TABLE: &[(u32, u32)] = &[
    (0, 0),
    (50, 44_019),          // 0.5 mi
    (100, 75_252),         // 1 mi
    (200, 119_273),        // 2 mi
    (500, 194_529),        // 5 mi
    (1_000, 260_338),      // 10 mi
    (2_000, 330_544),      // 20 mi
    (5_000, 426_882),      // 50 mi
    (10_000, 501_070),     // 100 mi
    (20_000, 575_788),     // 200 mi
    (50_000, 674_949),     // 500 mi
    (100_000, 750_098),    // 1000 mi
    (200_000, 825_301),    // 2000 mi
    (500_000, 924_753),    // 5000 mi
    (1_000_000, 1_000_000), // 10000 mi
];

/// Scale a distance onto the log curve, in parts per million
///
/// Monotonic non-decreasing and concave; 0 maps to 0 and [`Distance::FAR`]
/// maps to full scale. Uses linear interpolation between table entries.
pub fn log_scale(distance: Distance) -> u32 {
    let x = distance.ppm();

    for pair in LOG_TABLE.windows(2) {
        let (x_low, y_low) = pair[0];
        let (x_high, y_high) = pair[1];

        if x <= x_high {
            let x_range = (x_high - x_low) as u64;
            let y_range = (y_high - y_low) as u64;
            let x_offset = (x - x_low) as u64;

            return y_low + (y_range * x_offset / x_range) as u32;
        }
    }

    DISTANCE_FULL_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(log_scale(Distance::ZERO), 0);
        assert_eq!(log_scale(Distance::FAR), DISTANCE_FULL_SCALE);
    }

    #[test]
    fn test_table_points() {
        assert_eq!(log_scale(Distance::from_ppm(100)), 75_252);
        assert_eq!(log_scale(Distance::from_ppm(500_000)), 924_753);
    }

    #[test]
    fn test_interpolates_between_points() {
        // Halfway between the 1 mi and 2 mi samples
        assert_eq!(log_scale(Distance::from_ppm(150)), 97_262);
    }

    #[test]
    fn test_above_linear() {
        for ppm in [1_000, 100_000, 500_000, 900_000] {
            assert!(log_scale(Distance::from_ppm(ppm)) > ppm);
        }
    }

    #[test]
    fn test_table_is_concave() {
        let slopes = LOG_TABLE.windows(2).map(|p| {
            let (x0, y0) = p[0];
            let (x1, y1) = p[1];
            (y1 - y0) as f64 / (x1 - x0) as f64
        });
        let mut previous = f64::INFINITY;
        for slope in slopes {
            assert!(slope <= previous);
            previous = slope;
        }
    }

    proptest! {
        #[test]
        fn scale_is_monotonic(a in 0u32..=1_000_000, b in 0u32..=1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(log_scale(Distance::from_ppm(lo)) <= log_scale(Distance::from_ppm(hi)));
        }

        #[test]
        fn scale_stays_in_range(x in 0u32..=2_000_000) {
            prop_assert!(log_scale(Distance::from_ppm(x)) <= DISTANCE_FULL_SCALE);
        }
    }
}
