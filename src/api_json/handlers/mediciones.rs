use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api_json::{error_response, solicitante_de, TasaQuery, VistaPreviaCompuestaRequest, VistaPreviaCompuestaResponse};
use crate::cache::claves;
use crate::captura::compuesta::CapturaCompuesta;
use crate::captura::{self, fauna, FormularioFauna, FormularioMedicion, ResultadoCaptura, ResultadoEstatus};
use crate::error::{SmsError, SmsResult};
use crate::indicadores::is_fauna_impact_rate_indicator;
use crate::server::AppState;

use super::indicador_visible;

fn responder<T: Serialize>(resultado: SmsResult<ResultadoCaptura<T>>) -> HttpResponse {
    match resultado {
        Ok(r @ ResultadoCaptura::Creado { .. }) => HttpResponse::Created().json(r),
        Ok(r) => HttpResponse::Ok().json(r),
        Err(e) => error_response(&e),
    }
}

/// Despacha la captura según el tipo de indicador: impactos con fauna o
/// valor (directo o compuesto).
fn capturar(req: &HttpRequest, state: &AppState, id: &str, body: Value, edicion: Option<i64>) -> HttpResponse {
    let solicitante = match solicitante_de(req) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    let store = state.store();
    let indicador = match indicador_visible(&*store, &solicitante, id) {
        Ok(i) => i,
        Err(e) => return error_response(&e),
    };

    let respuesta = if is_fauna_impact_rate_indicator(&indicador) {
        let form: FormularioFauna = match serde_json::from_value(body) {
            Ok(f) => f,
            Err(e) => return error_response(&SmsError::from(e)),
        };
        responder(match edicion {
            None => captura::registrar_impacto_fauna(&*store, &solicitante, &indicador, &form),
            Some(rid) => captura::editar_impacto_fauna(&*store, &solicitante, &indicador, rid, &form),
        })
    } else {
        let form: FormularioMedicion = match serde_json::from_value(body) {
            Ok(f) => f,
            Err(e) => return error_response(&SmsError::from(e)),
        };
        responder(match edicion {
            None => captura::registrar_medicion(&*store, &solicitante, &indicador, &form),
            Some(mid) => captura::editar_medicion(&*store, &solicitante, &indicador, mid, &form),
        })
    };
    if respuesta.status().is_success() {
        state.cache.invalidate(&claves::historial(&indicador.id));
    }
    respuesta
}

/// POST /indicadores/{id}/mediciones
/// Cuerpo `FormularioMedicion` o, para la tasa de impactos con fauna,
/// `FormularioFauna`. Si el periodo ya tiene registro se devuelve ese
/// registro con `"resultado": "existente_cargado"`, salvo que esté
/// RECHAZADO: entonces se reemplaza y responde `"actualizado"`.
pub async fn crear_medicion_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> impl Responder {
    capturar(&req, &state, &path, body.into_inner(), None)
}

/// PUT /indicadores/{id}/mediciones/{mid}
pub async fn editar_medicion_handler(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, i64)>,
    body: web::Json<Value>,
) -> impl Responder {
    let (id, mid) = path.into_inner();
    capturar(&req, &state, &id, body.into_inner(), Some(mid))
}

fn cambiar_estatus(
    req: &HttpRequest,
    state: &AppState,
    id: i64,
    rechazar: bool,
) -> SmsResult<ResultadoEstatus> {
    let solicitante = solicitante_de(req)?;
    let resultado = {
        let store = state.store();
        if rechazar {
            captura::rechazar_medicion(&*store, &solicitante, id)?
        } else {
            captura::validar_medicion(&*store, &solicitante, id)?
        }
    };
    if resultado.cambio {
        state.cache.invalidate(&claves::historial(&resultado.registro.indicador_id));
    }
    Ok(resultado)
}

/// POST /mediciones/{id}/validar
/// Validar una medición ya validada responde 200 con `"cambio": false`.
pub async fn validar_handler(req: HttpRequest, state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match cambiar_estatus(&req, &state, path.into_inner(), false) {
        Ok(r) => HttpResponse::Ok().json(r),
        Err(e) => error_response(&e),
    }
}

/// POST /mediciones/{id}/rechazar
pub async fn rechazar_handler(req: HttpRequest, state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match cambiar_estatus(&req, &state, path.into_inner(), true) {
        Ok(r) => HttpResponse::Ok().json(r),
        Err(e) => error_response(&e),
    }
}

/// POST /captura/compuesta
/// Vista previa de la captura compuesta; no persiste nada.
pub async fn vista_previa_compuesta_handler(body: web::Json<VistaPreviaCompuestaRequest>) -> impl Responder {
    let req = body.into_inner();
    let compuesta = CapturaCompuesta::from_valores(req.valores, req.agregacion);
    let validas = compuesta.valores_numericos().len();
    let (resultado, aviso) = match compuesta.resultado() {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e.to_string())),
    };
    HttpResponse::Ok().json(VistaPreviaCompuestaResponse {
        agregacion: compuesta.agregacion,
        capturas_validas: validas,
        vista_previa: compuesta.vista_previa(),
        resultado,
        aviso,
    })
}

/// GET /captura/fauna/tasa?total_operaciones=&impactos=
pub async fn vista_previa_fauna_handler(query: web::Query<TasaQuery>) -> impl Responder {
    let vista = fauna::vista_previa(query.total_operaciones, query.impactos);
    HttpResponse::Ok().json(json!({"vista_previa": vista}))
}
