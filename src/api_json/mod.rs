use actix_web::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::acceso::Solicitante;
use crate::captura::compuesta::Agregacion;
use crate::error::{SmsError, SmsResult};
use crate::models::normalize::normalize_profile;
use crate::models::FamiliaSerie;

pub mod handlers;

/// Encabezado con el perfil del usuario (JSON) que entrega la capa de
/// autenticación.
///
/// ```text
/// x-perfil: {"id": "u-17", "rol_principal": "Subdirector", "area": {"id": 7}, "subdireccion_id": 2}
/// ```
///
/// Se aceptan las mismas variantes de campo que en el catálogo
/// (`rol` / `rol_principal` / `puesto`, `area_id` o `area.id`, ...).
pub const HEADER_PERFIL: &str = "x-perfil";

/// Lee y normaliza el perfil del solicitante. Sin encabezado no hay
/// solicitante.
pub fn solicitante_de(req: &HttpRequest) -> SmsResult<Solicitante> {
    let raw = req
        .headers()
        .get(HEADER_PERFIL)
        .ok_or_else(|| SmsError::PermisoDenegado(format!("falta el encabezado {}", HEADER_PERFIL)))?;
    let texto = raw
        .to_str()
        .map_err(|_| SmsError::validacion(format!("el encabezado {} no es texto válido", HEADER_PERFIL)))?;
    let valor: Value = serde_json::from_str(texto)?;
    if !valor.is_object() {
        return Err(SmsError::validacion(format!("el encabezado {} debe ser un objeto JSON", HEADER_PERFIL)));
    }
    Ok(Solicitante::new(normalize_profile(&valor)))
}

/// Traduce el error a su estado HTTP con cuerpo
/// `{"error": ..., "tipo": ..., "reintentar": bool}`.
pub fn error_response(e: &SmsError) -> HttpResponse {
    let body = json!({"error": e.to_string(), "tipo": e.tipo(), "reintentar": e.reintentable()});
    match e {
        SmsError::Validacion(_) | SmsError::Vista(_) | SmsError::Serializacion(_) => HttpResponse::BadRequest().json(body),
        SmsError::PermisoDenegado(_) => HttpResponse::Forbidden().json(body),
        SmsError::NoEncontrado(_) => HttpResponse::NotFound().json(body),
        SmsError::Conflicto(_) => HttpResponse::Conflict().json(body),
        SmsError::Backend(_) | SmsError::Configuracion(_) | SmsError::Io(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndicadoresQuery {
    pub area: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnioQuery {
    pub anio: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReporteQuery {
    pub anio: Option<i32>,
    pub pista: Option<String>,
    pub meta: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TasaQuery {
    pub total_operaciones: Option<f64>,
    pub impactos: Option<f64>,
}

/// Cuerpo de `POST /captura/compuesta`.
#[derive(Debug, Deserialize)]
pub struct VistaPreviaCompuestaRequest {
    pub valores: Vec<String>,
    #[serde(default)]
    pub agregacion: Agregacion,
}

#[derive(Debug, Serialize)]
pub struct VistaPreviaCompuestaResponse {
    pub agregacion: Agregacion,
    pub capturas_validas: usize,
    pub vista_previa: Option<f64>,
    /// Valor definitivo; `None` mientras no haya dos capturas válidas.
    pub resultado: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aviso: Option<String>,
}

/// Cuerpo de `POST /vistas`.
#[derive(Debug, Deserialize)]
pub struct MontarVistaRequest {
    pub contenedor: String,
    pub tipo: String,
    #[serde(default)]
    pub opciones: Value,
    pub anio: Option<i32>,
}

/// Cuerpo de `POST /modal`.
#[derive(Debug, Deserialize)]
pub struct AbrirModalRequest {
    pub familia: FamiliaSerie,
    pub titulo: Option<String>,
    pub meta: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn perfil_desde_encabezado() {
        let req = TestRequest::default()
            .insert_header((HEADER_PERFIL, r#"{"id": 4, "puesto": "Subdirectora", "area": {"id": "7"}}"#))
            .to_http_request();
        let s = solicitante_de(&req).unwrap();
        assert!(s.rol.subdirector);
        assert_eq!(s.id().as_deref(), Some("4"));
        assert!(s.areas_permitidas().contains("7"));
    }

    #[test]
    fn sin_encabezado_es_403() {
        let req = TestRequest::default().to_http_request();
        let err = solicitante_de(&req).unwrap_err();
        assert_eq!(error_response(&err).status(), actix_web::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn encabezado_invalido_es_400() {
        let req = TestRequest::default().insert_header((HEADER_PERFIL, "[1,2]")).to_http_request();
        let err = solicitante_de(&req).unwrap_err();
        assert_eq!(error_response(&err).status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
