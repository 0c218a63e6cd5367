use std::sync::{Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::{error, web, App, HttpResponse, HttpServer};
use serde_json::json;
use tracing::info;

use crate::api_json::handlers::*;
use crate::cache::QueryCache;
use crate::config::AppConfig;
use crate::store::SqliteStore;
use crate::vistas::{EmbedRegistry, OverlayManager};

/// Estado compartido por todos los workers.
pub struct AppState {
    pub store: Mutex<SqliteStore>,
    pub cache: QueryCache,
    pub embebidas: Mutex<EmbedRegistry>,
    pub overlay: Mutex<OverlayManager>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: SqliteStore, config: AppConfig) -> Self {
        AppState {
            store: Mutex::new(store),
            cache: QueryCache::new(config.cache_ttl),
            embebidas: Mutex::new(EmbedRegistry::new()),
            overlay: Mutex::new(OverlayManager::new()),
            config,
        }
    }

    pub fn store(&self) -> MutexGuard<'_, SqliteStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn embebidas(&self) -> MutexGuard<'_, EmbedRegistry> {
        self.embebidas.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn overlay(&self) -> MutexGuard<'_, OverlayManager> {
        self.overlay.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({"error": format!("cuerpo JSON inválido: {}", err), "tipo": "validacion", "reintentar": false});
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let body = json!({"error": format!("parámetros inválidos: {}", err), "tipo": "validacion", "reintentar": false});
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// Rutas del servicio. Se usa tanto en `run_server` como en las pruebas.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/help", web::get().to(help_handler))
        .route("/cache/stats", web::get().to(cache_stats_handler))
        // catálogo
        .route("/areas", web::get().to(areas_handler))
        .route("/indicadores", web::get().to(indicadores_handler))
        .route("/indicadores/{id}/historial", web::get().to(historial_handler))
        // captura y validación
        .route("/indicadores/{id}/mediciones", web::post().to(crear_medicion_handler))
        .route("/indicadores/{id}/mediciones/{mid}", web::put().to(editar_medicion_handler))
        .route("/mediciones/{id}/validar", web::post().to(validar_handler))
        .route("/mediciones/{id}/rechazar", web::post().to(rechazar_handler))
        .route("/captura/compuesta", web::post().to(vista_previa_compuesta_handler))
        .route("/captura/fauna/tasa", web::get().to(vista_previa_fauna_handler))
        // metas
        .route("/indicadores/{id}/metas", web::get().to(metas_handler))
        .route("/indicadores/{id}/metas", web::post().to(registrar_meta_handler))
        // reportes
        .route("/reportes/iluminacion/pistas", web::get().to(pistas_iluminacion_handler))
        .route("/reportes/{familia}", web::get().to(reporte_handler))
        .route("/reportes/{familia}/anios", web::get().to(anios_handler))
        .route("/reportes/{familia}/csv", web::get().to(reporte_csv_handler))
        // vistas
        .route("/vistas", web::post().to(montar_vista_handler))
        .route("/vistas/{contenedor}", web::delete().to(desmontar_vista_handler))
        .route("/modal", web::get().to(modal_estado_handler))
        .route("/modal", web::post().to(abrir_modal_handler))
        .route("/modal", web::delete().to(cerrar_modal_handler));
}

pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let bind = state.config.bind.clone();
    let state = web::Data::new(state);
    info!(%bind, "servidor SMS escuchando");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
