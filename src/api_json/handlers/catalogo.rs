use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::{json, Value};

use crate::acceso::{areas_visibles, indicadores_visibles};
use crate::api_json::{error_response, solicitante_de, IndicadoresQuery};
use crate::cache::claves;
use crate::captura;
use crate::error::SmsResult;
use crate::indicadores::OpcionIndicador;
use crate::models::Area;
use crate::server::AppState;
use crate::store::SmsBackend;

use super::indicador_visible;

fn listar_areas(req: &HttpRequest, state: &AppState) -> SmsResult<Vec<Area>> {
    let solicitante = solicitante_de(req)?;
    let areas = state.store().list_areas()?;
    Ok(areas_visibles(&areas, &solicitante))
}

/// GET /areas
/// Áreas activas visibles para el solicitante, en orden de visualización.
pub async fn areas_handler(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    match listar_areas(&req, &state) {
        Ok(areas) => HttpResponse::Ok().json(json!({"areas": areas})),
        Err(e) => error_response(&e),
    }
}

fn listar_indicadores(req: &HttpRequest, state: &AppState, area: Option<&str>) -> SmsResult<Vec<OpcionIndicador>> {
    let solicitante = solicitante_de(req)?;
    let todos = state.store().list_indicators()?;
    Ok(indicadores_visibles(&todos, &solicitante, area).iter().map(OpcionIndicador::from).collect())
}

/// GET /indicadores?area=<id>
pub async fn indicadores_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<IndicadoresQuery>,
) -> impl Responder {
    match listar_indicadores(&req, &state, query.area.as_deref()) {
        Ok(indicadores) => HttpResponse::Ok().json(json!({"indicadores": indicadores})),
        Err(e) => error_response(&e),
    }
}

// La visibilidad se revisa antes de tocar el caché: la entrada es compartida
// entre usuarios.
fn leer_historial(req: &HttpRequest, state: &AppState, id: &str) -> SmsResult<Arc<Value>> {
    let solicitante = solicitante_de(req)?;
    let indicador = indicador_visible(&*state.store(), &solicitante, id)?;
    state.cache.get_or_fetch(&claves::historial(id), None, || {
        let historial = captura::historial(&*state.store(), &solicitante, &indicador)?;
        Ok(serde_json::to_value(historial)?)
    })
}

/// GET /indicadores/{id}/historial
/// Últimos doce registros, del más reciente al más antiguo.
pub async fn historial_handler(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match leer_historial(&req, &state, &path) {
        Ok(v) => HttpResponse::Ok().json(&*v),
        Err(e) => error_response(&e),
    }
}
