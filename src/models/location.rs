//! Modelo de coordenadas
//!
//! Puntos geográficos compartidos por viajes, tracking y oráculo de rutas.

use serde::{Deserialize, Serialize};

/// Punto geográfico en grados decimales
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distancia al cuadrado en espacio de grados.
    ///
    /// No es geodésica: 1 grado de latitud ~ 111 km, y la longitud se encoge
    /// con la latitud. Se mantiene por compatibilidad con el umbral de
    /// llegada histórico; para precisión usar [`GeoPoint::haversine_meters`].
    pub fn squared_degree_distance(&self, other: &GeoPoint) -> f64 {
        let lat_diff = self.latitude - other.latitude;
        let lng_diff = self.longitude - other.longitude;
        (lat_diff * lat_diff) + (lng_diff * lng_diff)
    }

    /// Distancia geodésica en metros (fórmula de haversine)
    pub fn haversine_meters(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

/// Destino de un viaje: coordenadas más dirección legible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Destination {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance_is_zero_at_same_point() {
        let p = GeoPoint::new(8.2954, -62.7114);
        assert_eq!(p.squared_degree_distance(&p), 0.0);
    }

    #[test]
    fn haversine_close_to_known_value() {
        // Ciudad Guayana -> Ciudad Bolívar, ~100 km en línea recta
        let a = GeoPoint::new(8.3596, -62.6517);
        let b = GeoPoint::new(8.1222, -63.5497);
        let d = a.haversine_meters(&b);
        assert!((95_000.0..108_000.0).contains(&d), "distance {}", d);
    }
}
