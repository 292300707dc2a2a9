//! Models module
//!
//! Este módulo contiene los documentos del sistema tal como viven en el
//! document store, más la tabla de transiciones del viaje.

pub mod location;
pub mod notification;
pub mod payment;
pub mod settings;
pub mod trip;
pub mod user;

pub use location::{Destination, GeoPoint};
pub use notification::Notification;
pub use payment::{Payment, PaymentDoc, PaymentStatus};
pub use settings::CommissionRateSetting;
pub use trip::{
    generate_trip_id, CommissionStatus, TripDoc, TripEvent, TripRequest, TripStatus, VehicleType,
};
pub use user::UserProfile;
