use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};

use taxi_marketplace::config::EnvironmentConfig;
use taxi_marketplace::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use taxi_marketplace::routes;
use taxi_marketplace::state::AppState;
use taxi_marketplace::store::{DocumentStore, MemoryStore, PgDocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚕 Taxi Marketplace - API del ciclo de vida de viajes");
    info!("====================================================");

    let config = EnvironmentConfig::default();

    // Inicializar el document store: PostgreSQL si hay DATABASE_URL,
    // en memoria si no (solo desarrollo)
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = match sqlx::PgPool::connect(url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            let pg_store = PgDocumentStore::new(pool);
            if let Err(e) = pg_store.init().await {
                error!("❌ Error inicializando el document store: {}", e);
                return Err(anyhow::anyhow!("Error de inicialización: {}", e));
            }
            info!("✅ Document store PostgreSQL conectado");
            Arc::new(pg_store)
        }
        None => {
            warn!("⚠️ Sin DATABASE_URL: usando store en memoria (solo desarrollo)");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(config.clone(), store);

    // Barrido periódico de solicitudes pendientes viejas (idempotente,
    // seguro de correr redundante)
    let sweep_service = app_state.trip_service.clone();
    let sweep_interval = config.sweep_interval_secs;
    let max_age = config.stale_trip_max_age();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            match sweep_service.sweep_stale_pending(max_age).await {
                Ok(0) => {}
                Ok(swept) => {
                    info!("🧹 Barrido: {} solicitudes canceladas por inactividad", swept)
                }
                Err(e) => error!("❌ Error en el barrido de solicitudes: {}", e),
            }
        }
    });

    // CORS permisivo en desarrollo; orígenes explícitos en producción
    let cors = if config.is_production() && !config.cors_origins.is_empty() {
        cors_middleware_with_origins(config.cors_origins.clone())
    } else {
        cors_middleware()
    };

    let app = routes::create_api_router()
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   GET  /metrics - Métricas Prometheus");
    info!("🚕 Viajes:");
    info!("   POST /api/trips - Crear solicitud de viaje");
    info!("   GET  /api/trips?userId= - Historial de viajes");
    info!("   GET  /api/trips/:id - Obtener viaje");
    info!("   GET  /api/trips/:id/events - Stream SSE de cambios");
    info!("   POST /api/trips/:id/cancel - Cancelar (pasajero)");
    info!("   POST /api/trips/:id/offers - Ofertar precio (conductor)");
    info!("   POST /api/trips/:id/accept - Aceptar oferta");
    info!("   POST /api/trips/:id/decline - Rechazar oferta");
    info!("   POST /api/trips/:id/release - Liberar viaje (conductor)");
    info!("   POST /api/trips/:id/arrived - Llegada al punto de recogida");
    info!("   POST /api/trips/:id/start - Iniciar carrera");
    info!("   POST /api/trips/:id/complete - Completar viaje");
    info!("📍 Tracking:");
    info!("   POST /api/trips/:id/tracking/start - Abrir sesión de tracking");
    info!("   POST /api/trips/:id/location - Muestra de posición");
    info!("   POST /api/trips/:id/tracking/stop - Teardown");
    info!("🧾 Facturación:");
    info!("   GET  /api/billing/debt?driverId= - Deuda pendiente");
    info!("   POST /api/billing/payments - Reportar pago");
    info!("   GET  /api/billing/payments - Listar pagos (admin)");
    info!("   POST /api/billing/payments/:id/approve - Aprobar pago");
    info!("   POST /api/billing/payments/:id/reject - Rechazar pago");
    info!("⚙️ Configuración:");
    info!("   GET  /api/settings/commission - Tasa de comisión vigente");
    info!("   PUT  /api/settings/commission - Actualizar tasa (1-90)");
    info!("🗺️ Geocoding:");
    info!("   GET  /api/geocoding/reverse?lat=&lng= - Dirección legible");
    info!("   GET  /api/geocoding/search?q= - Búsqueda de direcciones");
    info!("   GET  /api/geocoding/route - Polilínea de ruta");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
