//! Great-circle distance
//!
//! Sources that only know where someone is (latitude/longitude) get their
//! distance from Home computed here, on a spherical Earth.

use crate::messages::MessageError;

/// Mean Earth radius in miles (6371.009 km)
pub const EARTH_RADIUS_MILES: f64 = 3_958.761;

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coordinates {
    /// Degrees north, -90..=90
    pub latitude: f32,
    /// Degrees east, -180..=180
    pub longitude: f32,
}

impl Coordinates {
    /// Create validated coordinates
    pub fn new(latitude: f32, longitude: f32) -> Result<Self, MessageError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(MessageError::InvalidCoordinate);
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(MessageError::InvalidCoordinate);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Haversine distance to `other` in miles
    pub fn great_circle_miles(&self, other: &Coordinates) -> f32 {
        let (lat1, lon1) = (radians(self.latitude), radians(self.longitude));
        let (lat2, lon2) = (radians(other.latitude), radians(other.longitude));

        let half_dlat = libm::sin((lat2 - lat1) / 2.0);
        let half_dlon = libm::sin((lon2 - lon1) / 2.0);
        let h = half_dlat * half_dlat + libm::cos(lat1) * libm::cos(lat2) * half_dlon * half_dlon;

        // Rounding can push h a hair past 1 for antipodal points
        let central = 2.0 * libm::asin(libm::sqrt(h.min(1.0)));
        (EARTH_RADIUS_MILES * central) as f32
    }
}

fn radians(degrees: f32) -> f64 {
    degrees as f64 * (core::f64::consts::PI / 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: Coordinates = Coordinates {
        latitude: 51.5074,
        longitude: -0.1278,
    };
    const PARIS: Coordinates = Coordinates {
        latitude: 48.8566,
        longitude: 2.3522,
    };
    const NEW_YORK: Coordinates = Coordinates {
        latitude: 40.7128,
        longitude: -74.0060,
    };

    fn close(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 0.5
    }

    #[test]
    fn test_known_city_pairs() {
        assert!(close(LONDON.great_circle_miles(&PARIS), 213.5));
        assert!(close(NEW_YORK.great_circle_miles(&LONDON), 3_461.2));
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_at_home() {
        assert_eq!(LONDON.great_circle_miles(&LONDON), 0.0);
        assert!(
            (LONDON.great_circle_miles(&PARIS) - PARIS.great_circle_miles(&LONDON)).abs() < 1e-3
        );
    }

    #[test]
    fn test_antipodes_are_half_the_circumference() {
        let a = Coordinates::new(0.0, 0.0).unwrap();
        let b = Coordinates::new(0.0, 180.0).unwrap();
        assert!(close(a.great_circle_miles(&b), 12_436.8));
    }

    #[test]
    fn test_coordinates_validated() {
        assert_eq!(Coordinates::new(90.5, 0.0), Err(MessageError::InvalidCoordinate));
        assert_eq!(Coordinates::new(0.0, -181.0), Err(MessageError::InvalidCoordinate));
        assert_eq!(Coordinates::new(f32::NAN, 0.0), Err(MessageError::InvalidCoordinate));
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }
}
