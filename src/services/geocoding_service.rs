//! Servicio de geocoding (Nominatim / OpenStreetMap)
//!
//! Geocodificación directa e inversa contra la API pública de Nominatim.
//! Todas las llamadas son best-effort: el caller decide el fallback cuando el
//! oráculo no responde (p.ej. crear el viaje con dirección desconocida).

use serde::{Deserialize, Serialize};

use crate::utils::errors::AppError;

/// Dirección usada cuando el reverse geocoding falla al crear un viaje
pub const UNKNOWN_ADDRESS: &str = "Ubicación desconocida";

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    state: Option<String>,
    province: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    // Nominatim devuelve lat/lon como strings
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

/// Resultado de una búsqueda de dirección
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressHit {
    pub latitude: f64,
    pub longitude: f64,
    pub display_address: String,
}

/// Resultado de una geocodificación inversa
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocodeResult {
    pub display_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

pub struct GeocodingService {
    base_url: String,
    country_code: String,
    client: reqwest::Client,
}

impl GeocodingService {
    pub fn new(base_url: String, country_code: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("TaxiMarketplace/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            country_code,
            client,
        }
    }

    /// Coordenadas a dirección legible
    pub async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ReverseGeocodeResult, AppError> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}&zoom=18&addressdetails=1",
            self.base_url, latitude, longitude
        );

        log::info!("🗺️ Reverse geocoding: {},{}", latitude, longitude);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("Nominatim: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("❌ Nominatim reverse failed with status {}", status);
            return Err(AppError::OracleUnavailable(format!(
                "Nominatim status {}",
                status
            )));
        }

        let place: NominatimPlace = response
            .json()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("Nominatim body: {}", e)))?;

        let region_name = place
            .address
            .as_ref()
            .and_then(|a| a.state.clone().or_else(|| a.province.clone()));

        Ok(ReverseGeocodeResult {
            display_address: place
                .display_name
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            region_name,
        })
    }

    /// Búsqueda de dirección (geocodificación directa).
    ///
    /// Si se pasa `region`, se agrega a la query cuando falta y se filtra el
    /// resultado del lado del cliente, igual que hacía el buscador original.
    pub async fn search_address(
        &self,
        query: &str,
        limit: u32,
        region: Option<&str>,
    ) -> Result<Vec<AddressHit>, AppError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut q = query.to_string();
        if let Some(region) = region {
            if !q.to_lowercase().contains(&region.to_lowercase()) {
                q = format!("{}, {}", q, region);
            }
        }

        let url = format!(
            "{}/search?format=json&q={}&limit={}&countrycodes={}&addressdetails=1",
            self.base_url,
            urlencoding::encode(&q),
            limit,
            self.country_code
        );

        log::info!("🌐 Searching address: {}", q);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("Nominatim: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::OracleUnavailable(format!(
                "Nominatim status {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("Nominatim body: {}", e)))?;

        let hits = places
            .into_iter()
            .filter(|place| match (region, &place.address) {
                (Some(region), Some(address)) => {
                    let region = region.to_lowercase();
                    address
                        .state
                        .as_deref()
                        .or(address.province.as_deref())
                        .map(|s| s.to_lowercase().contains(&region))
                        .unwrap_or(false)
                }
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|place| {
                let latitude = place.lat.as_deref()?.parse().ok()?;
                let longitude = place.lon.as_deref()?.parse().ok()?;
                Some(AddressHit {
                    latitude,
                    longitude,
                    display_address: place.display_name?,
                })
            })
            .collect();

        Ok(hits)
    }
}
