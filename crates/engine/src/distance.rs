//! City-to-city mileage lookup.
//!
//! The engine only needs miles between two city/state pairs. Anything able to
//! answer that implements [`DistanceResolver`]; [`GeoDistanceResolver`] is the
//! built-in implementation backed by a coordinates table.

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::Place;

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Default ratio between road miles and great-circle miles.
pub const DEFAULT_CIRCUITY_FACTOR: f64 = 1.2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceError {
    #[error("unknown city: {0}")]
    UnknownCity(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("lookup timed out after {0} ms")]
    Timeout(u128),
}

#[async_trait]
pub trait DistanceResolver: Send + Sync + fmt::Debug {
    /// Estimated driving miles from `origin` to `destination`.
    async fn resolve_miles(&self, origin: &Place, destination: &Place)
    -> Result<f64, DistanceError>;
}

/// Coordinates of a city, as read from settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CityCoordinates {
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

fn city_key(city: &str, state: &str) -> String {
    let city = city.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}|{}", city.to_lowercase(), state.trim().to_lowercase())
}

/// Great-circle distance scaled by a road circuity factor.
#[derive(Clone, Debug)]
pub struct GeoDistanceResolver {
    cities: HashMap<String, (f64, f64)>,
    circuity_factor: f64,
}

impl GeoDistanceResolver {
    pub fn new(cities: impl IntoIterator<Item = CityCoordinates>, circuity_factor: f64) -> Self {
        let cities = cities
            .into_iter()
            .map(|c| (city_key(&c.city, &c.state), (c.lat, c.lon)))
            .collect();
        Self {
            cities,
            circuity_factor,
        }
    }

    fn coordinates(&self, place: &Place) -> Result<(f64, f64), DistanceError> {
        self.cities
            .get(&city_key(&place.city, &place.state))
            .copied()
            .ok_or_else(|| DistanceError::UnknownCity(format!("{}, {}", place.city, place.state)))
    }
}

fn haversine_miles((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}

#[async_trait]
impl DistanceResolver for GeoDistanceResolver {
    async fn resolve_miles(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<f64, DistanceError> {
        let from = self.coordinates(origin)?;
        let to = self.coordinates(destination)?;
        Ok(haversine_miles(from, to) * self.circuity_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> GeoDistanceResolver {
        GeoDistanceResolver::new(
            [
                CityCoordinates {
                    city: "Dallas".to_string(),
                    state: "TX".to_string(),
                    lat: 32.7767,
                    lon: -96.7970,
                },
                CityCoordinates {
                    city: "Chicago".to_string(),
                    state: "IL".to_string(),
                    lat: 41.8781,
                    lon: -87.6298,
                },
            ],
            DEFAULT_CIRCUITY_FACTOR,
        )
    }

    #[tokio::test]
    async fn dallas_to_chicago_is_road_scaled() {
        let miles = resolver()
            .resolve_miles(&Place::new("Dallas", "TX"), &Place::new("Chicago", "IL"))
            .await
            .unwrap();
        // ~803 great-circle miles.
        assert!((950.0..980.0).contains(&miles), "got {miles}");
    }

    #[tokio::test]
    async fn lookup_ignores_case_and_spacing() {
        let miles = resolver()
            .resolve_miles(&Place::new("  dallas ", "tx"), &Place::new("DALLAS", "TX"))
            .await
            .unwrap();
        assert_eq!(miles, 0.0);
    }

    #[tokio::test]
    async fn unknown_city_is_an_error() {
        let err = resolver()
            .resolve_miles(&Place::new("Dallas", "TX"), &Place::new("Nowhere", "ZZ"))
            .await
            .unwrap_err();
        assert_eq!(err, DistanceError::UnknownCity("Nowhere, ZZ".to_string()));
    }
}
