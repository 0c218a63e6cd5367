use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::api_json::HEADER_PERFIL;
use crate::models::FamiliaSerie;
use crate::server::AppState;

/// GET /help
pub async fn help_handler() -> impl Responder {
    let familias: Vec<_> = FamiliaSerie::TODAS
        .iter()
        .map(|f| json!({"slug": f.slug(), "titulo": f.titulo(), "claves": f.claves(), "meta": f.meta_default()}))
        .collect();

    HttpResponse::Ok().json(json!({
        "description": "API de indicadores SMS: captura mensual, validación, metas por escenario y reportes comparativos con exportación CSV.",
        "perfil": format!("Las rutas de catálogo, captura y metas requieren el encabezado '{}' con el perfil del usuario en JSON.", HEADER_PERFIL),
        "perfil_example": {"id": "u-17", "rol_principal": "Subdirector", "area": {"id": 7}, "subdireccion_id": 2},
        "medicion_example": {"anio": 2025, "mes": 3, "escenario": "REAL", "valor": 97.5, "subsistema": null},
        "compuesta_example": {"anio": 2025, "mes": 3, "compuesta": {"valores": ["12", "15.5", ""], "agregacion": "promedio"}},
        "fauna_example": {"anio": 2025, "mes": 3, "total_operaciones": 4200, "impactos": 3},
        "meta_example": {"anio": 2025, "mes": 3, "escenario": "ALTO", "valor": 99.0},
        "reportes": familias,
        "routes": [
            "GET /areas", "GET /indicadores?area=", "GET /indicadores/{id}/historial",
            "POST /indicadores/{id}/mediciones", "PUT /indicadores/{id}/mediciones/{mid}",
            "POST /mediciones/{id}/validar", "POST /mediciones/{id}/rechazar",
            "GET /indicadores/{id}/metas?anio=", "POST /indicadores/{id}/metas",
            "POST /captura/compuesta", "GET /captura/fauna/tasa?total_operaciones=&impactos=",
            "GET /reportes/{familia}?anio=&pista=&meta=", "GET /reportes/{familia}/anios",
            "GET /reportes/iluminacion/pistas", "GET /reportes/{familia}/csv",
            "POST /vistas", "DELETE /vistas/{contenedor}",
            "GET /modal", "POST /modal", "DELETE /modal",
            "GET /cache/stats"
        ]
    }))
}

/// GET /cache/stats
pub async fn cache_stats_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.cache.stats())
}
