// Biblioteca raíz del crate `aifa_sms`.
// Indicadores del Sistema de Gestión de Seguridad Operacional (SMS):
// catálogo con control de acceso por área, captura mensual y validación,
// metas por escenario, reportes comparativos y exportación CSV.
pub mod acceso;
pub mod api_json;
pub mod cache;
pub mod captura;
pub mod config;
pub mod error;
pub mod export;
pub mod indicadores;
pub mod metas;
pub mod models;
pub mod reportes;
pub mod server;
pub mod store;
pub mod text;
pub mod validacion;
pub mod vistas;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::AppConfig;
pub use error::{SmsError, SmsResult};
/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::{run_server, AppState};

/// Inicializa el subscriber de `tracing`. `RUST_LOG` manda sobre el nivel
/// `info` por defecto. Llamarla dos veces no falla.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
}
