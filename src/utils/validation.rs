//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! compartidas entre controllers.

use rust_decimal::Decimal;
use validator::ValidationError;

/// Validar que un par de coordenadas sea geográficamente posible
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &latitude);
        return Err(error);
    }
    if !(-180.0..=180.0).contains(&longitude) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &longitude);
        return Err(error);
    }
    Ok(())
}

/// Validar el porcentaje de comisión global (rango admitido 1-90)
pub fn validate_service_percentage(value: u32) -> Result<(), ValidationError> {
    if !(1..=90).contains(&value) {
        let mut error = ValidationError::new("service_percentage");
        error.add_param("value".into(), &value);
        error.add_param("min".into(), &1);
        error.add_param("max".into(), &90);
        return Err(error);
    }
    Ok(())
}

/// Un precio de oferta es válido solo si es estrictamente positivo
pub fn is_valid_price(price: Decimal) -> bool {
    price > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_percentage() {
        assert!(validate_service_percentage(0).is_err());
        assert!(validate_service_percentage(91).is_err());
        assert!(validate_service_percentage(1).is_ok());
        assert!(validate_service_percentage(90).is_ok());
    }

    #[test]
    fn rejects_impossible_coordinates() {
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -181.0).is_err());
        assert!(validate_coordinates(8.29, -62.72).is_ok());
    }

    #[test]
    fn price_must_be_positive() {
        assert!(!is_valid_price(Decimal::ZERO));
        assert!(!is_valid_price(Decimal::new(-5, 0)));
        assert!(is_valid_price(Decimal::new(1, 2)));
    }
}
