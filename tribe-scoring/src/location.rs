//! Geographic proximity

use tribe_core::{Coordinates, EARTH_RADIUS_KM, KM_TO_MILES};

use crate::ScoreError;

fn check(c: &Coordinates) -> Result<(), ScoreError> {
    if c.is_valid() {
        Ok(())
    } else {
        Err(ScoreError::InvalidCoordinates {
            latitude: c.latitude,
            longitude: c.longitude,
        })
    }
}

/// Great-circle distance in miles
pub fn haversine_miles(a: &Coordinates, b: &Coordinates) -> Result<f64, ScoreError> {
    check(a)?;
    check(b)?;

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    Ok(EARTH_RADIUS_KM * c * KM_TO_MILES)
}

/// Linear decay from 1.0 at distance 0 to 0.0 at `max_distance_miles`
pub fn distance_score(distance_miles: f64, max_distance_miles: f64) -> f64 {
    if distance_miles >= max_distance_miles {
        return 0.0;
    }
    (1.0 - distance_miles / max_distance_miles).clamp(0.0, 1.0)
}

/// Proximity score with the distance it was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationMatch {
    pub score: f64,
    pub distance_miles: f64,
    pub max_distance_miles: f64,
}

impl LocationMatch {
    pub fn describe(&self) -> String {
        if self.score == 0.0 {
            format!(
                "{:.1} miles apart, beyond the {:.0}-mile radius",
                self.distance_miles, self.max_distance_miles
            )
        } else {
            format!(
                "{:.1} miles apart (within {:.0} miles)",
                self.distance_miles, self.max_distance_miles
            )
        }
    }
}

pub fn location_match(
    a: &Coordinates,
    b: &Coordinates,
    max_distance_miles: f64,
) -> Result<LocationMatch, ScoreError> {
    if !max_distance_miles.is_finite() || max_distance_miles <= 0.0 {
        return Err(ScoreError::InvalidMaxDistance(max_distance_miles));
    }

    let distance_miles = haversine_miles(a, b)?;
    Ok(LocationMatch {
        score: distance_score(distance_miles, max_distance_miles),
        distance_miles,
        max_distance_miles,
    })
}

/// Proximity score, 0.0 - 1.0
pub fn location_score(
    a: &Coordinates,
    b: &Coordinates,
    max_distance_miles: f64,
) -> Result<f64, ScoreError> {
    location_match(a, b, max_distance_miles).map(|m| m.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_scores_one() {
        let p = Coordinates::new(40.7128, -74.0060);
        assert_eq!(location_score(&p, &p, 25.0).unwrap(), 1.0);
    }

    #[test]
    fn test_known_distance() {
        // Manhattan to Newark, roughly 9 miles
        let nyc = Coordinates::new(40.7128, -74.0060);
        let newark = Coordinates::new(40.7357, -74.1724);

        let miles = haversine_miles(&nyc, &newark).unwrap();
        assert!((miles - 8.9).abs() < 0.3, "got {}", miles);
    }

    #[test]
    fn test_thirty_miles_scores_zero() {
        // 30 miles due north: 30 / 69.09 degrees of latitude
        let a = Coordinates::new(40.0, -105.0);
        let b = Coordinates::new(40.0 + 30.0 / 69.0933, -105.0);

        let m = location_match(&a, &b, 25.0).unwrap();
        assert!((m.distance_miles - 30.0).abs() < 0.1);
        assert_eq!(m.score, 0.0);
        assert!(m.describe().contains("beyond"));
    }

    #[test]
    fn test_linear_decay() {
        assert_eq!(distance_score(0.0, 25.0), 1.0);
        assert!((distance_score(12.5, 25.0) - 0.5).abs() < 1e-12);
        assert_eq!(distance_score(25.0, 25.0), 0.0);
        assert_eq!(distance_score(400.0, 25.0), 0.0);
    }

    #[test]
    fn test_malformed_coordinates() {
        let ok = Coordinates::new(0.0, 0.0);
        let bad = Coordinates::new(123.0, 0.0);

        assert!(matches!(
            location_score(&ok, &bad, 25.0),
            Err(ScoreError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_invalid_max_distance() {
        let p = Coordinates::new(0.0, 0.0);
        assert_eq!(
            location_score(&p, &p, 0.0),
            Err(ScoreError::InvalidMaxDistance(0.0))
        );
    }
}
