//! Geotag reduction to city codes
//!
//! Precise coordinates never reach the wire. They are mapped onto a fixed,
//! ordered catalogue of cities; the first city whose radius contains the
//! point wins, so catalogue order is part of the format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Nearest-city fallback range
pub const NEAREST_CITY_MAX_KM: f64 = 100.0;

/// Code used when no city matches
pub const UNKNOWN_CITY: &str = "MA-UNK";

/// Catalogue entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    /// Wire code
    pub code: &'static str,
    /// Display name
    pub name: &'static str,
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lng: f64,
    /// Radius around the center that belongs to this city
    pub radius_km: f64,
}

const fn city(code: &'static str, name: &'static str, lat: f64, lng: f64, radius_km: f64) -> City {
    City {
        code,
        name,
        lat,
        lng,
        radius_km,
    }
}

/// City catalogue, in match order
pub const CITIES: &[City] = &[
    city("MA-CAS", "Casablanca", 33.5731, -7.5898, 15.0),
    city("MA-RAB", "Rabat", 34.0209, -6.8416, 5.0),
    city("MA-SAL", "Salé", 34.0531, -6.7985, 4.0),
    city("MA-MOH", "Mohammedia", 33.6866, -7.3830, 8.0),
    city("MA-KEN", "Kénitra", 34.2610, -6.5802, 10.0),
    city("MA-FES", "Fès", 34.0181, -5.0078, 15.0),
    city("MA-MEK", "Meknès", 33.8935, -5.5473, 12.0),
    city("MA-TNG", "Tanger", 35.7595, -5.8340, 15.0),
    city("MA-TET", "Tétouan", 35.5889, -5.3626, 10.0),
    city("MA-MAR", "Marrakech", 31.6295, -7.9811, 20.0),
    city("MA-AGA", "Agadir", 30.4278, -9.5981, 15.0),
    city("MA-SAF", "Safi", 32.2994, -9.2372, 10.0),
    city("MA-ELJ", "El Jadida", 33.2316, -8.5007, 10.0),
    city("MA-BEM", "Béni Mellal", 32.3373, -6.3498, 10.0),
    city("MA-OUJ", "Oujda", 34.6814, -1.9086, 12.0),
    city("MA-NAD", "Nador", 35.1681, -2.9335, 10.0),
    city("MA-LAY", "Laâyoune", 27.1536, -13.2033, 12.0),
];

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting out-of-range or non-finite values
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// Parse `"lat,lng"`
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lng) = s.split_once(',')?;
        Self::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?)
    }

    /// Read `{lat, lng}` (numbers or numeric strings) or a `"lat,lng"` string
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Object(map) => Self::new(number(map.get("lat")?)?, number(map.get("lng")?)?),
            _ => None,
        }
    }

    /// Great-circle distance to another point
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Haversine distance in km
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Catalogue entry for a code
pub fn city_by_code(code: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.code == code)
}

/// Map a point to a city code
///
/// First catalogue city containing the point, else the nearest city within
/// [`NEAREST_CITY_MAX_KM`], else [`UNKNOWN_CITY`].
pub fn city_from_coordinates(lat: f64, lng: f64) -> &'static str {
    let mut nearest: Option<(&'static City, f64)> = None;

    for city in CITIES {
        let distance = haversine_km(lat, lng, city.lat, city.lng);
        if distance <= city.radius_km {
            return city.code;
        }
        if nearest.map_or(true, |(_, best)| distance < best) {
            nearest = Some((city, distance));
        }
    }

    match nearest {
        Some((city, distance)) if distance <= NEAREST_CITY_MAX_KM => city.code,
        _ => UNKNOWN_CITY,
    }
}

/// Resolve any accepted geotag form, `None` when malformed
///
/// Accepts a catalogue code (or [`UNKNOWN_CITY`]), `{lat, lng}`, or `"lat,lng"`.
pub fn resolve_geotag(input: &Value) -> Option<&'static str> {
    if let Value::String(s) = input {
        let code = s.trim();
        if code == UNKNOWN_CITY {
            return Some(UNKNOWN_CITY);
        }
        if let Some(city) = city_by_code(code) {
            return Some(city.code);
        }
    }

    Coordinates::from_value(input).map(|point| city_from_coordinates(point.lat, point.lng))
}

/// Reduce a geotag to a city code; malformed or missing input yields [`UNKNOWN_CITY`]
pub fn compress_geotag(input: &Value) -> &'static str {
    resolve_geotag(input).unwrap_or(UNKNOWN_CITY)
}

/// Distance between two city centers
///
/// `Some(0.0)` for equal codes, `None` when either code is not in the catalogue.
pub fn distance_between_cities(code_a: &str, code_b: &str) -> Option<f64> {
    if code_a == code_b {
        return Some(0.0);
    }
    let a = city_by_code(code_a)?;
    let b = city_by_code(code_b)?;
    Some(haversine_km(a.lat, a.lng, b.lat, b.lng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_city_centers_map_to_themselves() {
        for city in CITIES {
            assert_eq!(city_from_coordinates(city.lat, city.lng), city.code, "{}", city.name);
        }
    }

    #[test]
    fn test_nearest_city_fallback() {
        // Settat: ~60 km south of Casablanca, outside every radius
        assert_eq!(city_from_coordinates(33.0010, -7.6166), "MA-CAS");
    }

    #[test]
    fn test_far_point_is_unknown() {
        // Paris
        assert_eq!(city_from_coordinates(48.8566, 2.3522), UNKNOWN_CITY);
    }

    #[test]
    fn test_compress_geotag_forms() {
        assert_eq!(compress_geotag(&json!("MA-FES")), "MA-FES");
        assert_eq!(compress_geotag(&json!({"lat": 31.63, "lng": -7.98})), "MA-MAR");
        assert_eq!(compress_geotag(&json!({"lat": "34.02", "lng": "-6.84"})), "MA-RAB");
        assert_eq!(compress_geotag(&json!("35.7595, -5.8340")), "MA-TNG");
        assert_eq!(compress_geotag(&json!(UNKNOWN_CITY)), UNKNOWN_CITY);
    }

    #[test]
    fn test_compress_geotag_malformed() {
        assert_eq!(compress_geotag(&json!(null)), UNKNOWN_CITY);
        assert_eq!(compress_geotag(&json!("somewhere")), UNKNOWN_CITY);
        assert_eq!(compress_geotag(&json!({"lat": 200.0, "lng": 0.0})), UNKNOWN_CITY);
        assert_eq!(compress_geotag(&json!([33.5, -7.5])), UNKNOWN_CITY);
        assert!(resolve_geotag(&json!("nope")).is_none());
    }

    #[test]
    fn test_distance_between_cities() {
        assert_eq!(distance_between_cities("MA-CAS", "MA-CAS"), Some(0.0));
        assert_eq!(distance_between_cities("MA-CAS", "XX-ZZZ"), None);
        assert_eq!(distance_between_cities(UNKNOWN_CITY, "MA-CAS"), None);

        let cas_mar = distance_between_cities("MA-CAS", "MA-MAR").unwrap();
        assert!((cas_mar - 219.2).abs() < 1.0, "{}", cas_mar);

        let rab_sal = distance_between_cities("MA-RAB", "MA-SAL").unwrap();
        assert!(rab_sal < 20.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = haversine_km(33.5731, -7.5898, 34.0181, -5.0078);
        let b = haversine_km(34.0181, -5.0078, 33.5731, -7.5898);
        assert!((a - b).abs() < 1e-9);
        assert_eq!(haversine_km(1.0, 1.0, 1.0, 1.0), 0.0);
    }
}
