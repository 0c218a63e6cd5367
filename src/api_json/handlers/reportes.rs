use std::sync::Arc;

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use serde_json::{json, Value};

use crate::api_json::{error_response, ReporteQuery};
use crate::cache::claves;
use crate::error::{SmsError, SmsResult};
use crate::export::DescargaCsv;
use crate::models::FamiliaSerie;
use crate::reportes::familias::{self, ParametrosReporte};
use crate::reportes::VistaReporte;
use crate::server::AppState;
use crate::store::SmsBackend;

use super::anio_actual;

fn familia_de(slug: &str) -> SmsResult<FamiliaSerie> {
    FamiliaSerie::from_slug(slug).ok_or_else(|| SmsError::NoEncontrado(format!("reporte {}", slug)))
}

fn parametros(query: &ReporteQuery) -> ParametrosReporte {
    ParametrosReporte {
        anio: query.anio.unwrap_or_else(anio_actual),
        pista: query.pista.clone().filter(|p| !p.trim().is_empty()),
        meta: query.meta,
    }
}

fn construir(state: &AppState, familia: FamiliaSerie, params: &ParametrosReporte) -> SmsResult<VistaReporte> {
    familias::construir(&*state.store(), familia, params)
}

fn reporte_json(state: &AppState, slug: &str, query: &ReporteQuery) -> SmsResult<Arc<Value>> {
    let familia = familia_de(slug)?;
    let params = parametros(query);
    let clave = claves::reporte(familia, params.anio, params.pista.as_deref(), params.meta);
    state.cache.get_or_fetch(&clave, None, || Ok(serde_json::to_value(construir(state, familia, &params)?)?))
}

/// GET /reportes/{familia}?anio=&pista=&meta=
/// Serie mensual lista para graficar. Sin datos responde 200 con
/// `"estado": "sin_datos"`.
pub async fn reporte_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ReporteQuery>,
) -> impl Responder {
    match reporte_json(&state, &path, &query) {
        Ok(v) => HttpResponse::Ok().json(&*v),
        Err(e) => error_response(&e),
    }
}

fn descarga(state: &AppState, slug: &str, query: &ReporteQuery) -> SmsResult<DescargaCsv> {
    let familia = familia_de(slug)?;
    let params = parametros(query);
    match construir(state, familia, &params)? {
        VistaReporte::Datos(reporte) => DescargaCsv::desde_reporte(&reporte),
        VistaReporte::SinDatos { mensaje, .. } => Err(SmsError::validacion(mensaje)),
    }
}

/// GET /reportes/{familia}/csv?anio=&pista=
pub async fn reporte_csv_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ReporteQuery>,
) -> impl Responder {
    match descarga(&state, &path, &query) {
        Ok(csv) => HttpResponse::Ok()
            .content_type(csv.content_type)
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(csv.filename)],
            })
            .body(csv.contenido),
        Err(e) => error_response(&e),
    }
}

fn anios(state: &AppState, slug: &str) -> SmsResult<Arc<Value>> {
    let familia = familia_de(slug)?;
    state.cache.get_or_fetch(&claves::anios(familia), Some(state.config.years_ttl), || {
        let mut anios = state.store().available_years(familia)?;
        // El selector siempre ofrece el año en curso.
        let actual = anio_actual();
        if !anios.contains(&actual) {
            anios.push(actual);
            anios.sort_unstable_by(|a, b| b.cmp(a));
        }
        Ok(json!({"familia": familia, "anios": anios, "predeterminado": actual}))
    })
}

/// GET /reportes/{familia}/anios
pub async fn anios_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match anios(&state, &path) {
        Ok(v) => HttpResponse::Ok().json(&*v),
        Err(e) => error_response(&e),
    }
}

/// GET /reportes/iluminacion/pistas
pub async fn pistas_iluminacion_handler(state: web::Data<AppState>) -> impl Responder {
    let resultado = state.cache.get_or_fetch(claves::PISTAS_ILUMINACION, Some(state.config.years_ttl), || {
        Ok(json!({"pistas": state.store().lighting_tracks()?}))
    });
    match resultado {
        Ok(v) => HttpResponse::Ok().json(&*v),
        Err(e) => error_response(&e),
    }
}
