//! Services module
//!
//! Este módulo contiene la lógica de negocio: máquina de estados del viaje,
//! protocolo de ofertas, tracking con detección de llegada, ledger de
//! comisiones y los clientes de los oráculos externos.

pub mod commission_service;
pub mod geocoding_service;
pub mod notification_service;
pub mod offer_service;
pub mod routing_service;
pub mod tracking_service;
pub mod trip_service;

pub use commission_service::{
    commission_for, CommissionRateProvider, CommissionService, FixedRateProvider,
    StoredRateProvider,
};
pub use geocoding_service::GeocodingService;
pub use notification_service::NotificationService;
pub use offer_service::{OfferDecision, OfferService, PoolView};
pub use routing_service::RoutingService;
pub use tracking_service::{ArrivalDetector, TrackingLeg, TrackingService};
pub use trip_service::{NewTripRequest, TripService};
