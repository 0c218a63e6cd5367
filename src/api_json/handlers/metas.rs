use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::{json, Value};

use crate::api_json::{error_response, solicitante_de, AnioQuery};
use crate::cache::claves;
use crate::error::SmsResult;
use crate::metas::{self, FormularioMeta, ResultadoMeta};
use crate::server::AppState;

use super::{anio_actual, indicador_visible};

fn leer_metas(req: &HttpRequest, state: &AppState, id: &str, anio: i32) -> SmsResult<Arc<Value>> {
    let solicitante = solicitante_de(req)?;
    let indicador = indicador_visible(&*state.store(), &solicitante, id)?;
    state.cache.get_or_fetch(&claves::metas(id, anio), None, || {
        let lista = metas::metas_del_anio(&*state.store(), &solicitante, &indicador, anio)?;
        Ok(json!({"indicador_id": indicador.id, "anio": anio, "metas": lista}))
    })
}

/// GET /indicadores/{id}/metas?anio=2025
pub async fn metas_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<AnioQuery>,
) -> impl Responder {
    let anio = query.anio.unwrap_or_else(anio_actual);
    match leer_metas(&req, &state, &path, anio) {
        Ok(v) => HttpResponse::Ok().json(&*v),
        Err(e) => error_response(&e),
    }
}

fn guardar_meta(req: &HttpRequest, state: &AppState, id: &str, form: &FormularioMeta) -> SmsResult<ResultadoMeta> {
    let solicitante = solicitante_de(req)?;
    let resultado = {
        let store = state.store();
        let indicador = indicador_visible(&*store, &solicitante, id)?;
        metas::registrar_meta(&*store, &solicitante, &indicador, form)?
    };
    state.cache.invalidate_prefix(&claves::metas_prefijo(id));
    Ok(resultado)
}

/// POST /indicadores/{id}/metas
/// Body: `{"anio": 2025, "mes": 3, "escenario": "ALTO", "valor": 98.5}`.
pub async fn registrar_meta_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<FormularioMeta>,
) -> impl Responder {
    match guardar_meta(&req, &state, &path, &body) {
        Ok(r) => HttpResponse::Ok().json(r),
        Err(e) => error_response(&e),
    }
}
