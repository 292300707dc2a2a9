//! Controllers module
//!
//! Validación de requests y orquestación sobre los services.

pub mod geocoding_controller;
pub mod offer_controller;
pub mod payment_controller;
pub mod settings_controller;
pub mod tracking_controller;
pub mod trip_controller;

pub use geocoding_controller::GeocodingController;
pub use offer_controller::OfferController;
pub use payment_controller::PaymentController;
pub use settings_controller::SettingsController;
pub use tracking_controller::TrackingController;
pub use trip_controller::TripController;
