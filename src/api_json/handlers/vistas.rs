use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::api_json::{error_response, AbrirModalRequest, MontarVistaRequest};
use crate::error::SmsResult;
use crate::reportes::familias;
use crate::server::AppState;
use crate::vistas::{EmbedRegistry, TipoVista};

use super::anio_actual;

/// La vista solo queda registrada si su contenido se pudo construir.
fn montar(state: &AppState, req: &MontarVistaRequest) -> SmsResult<serde_json::Value> {
    let vista = EmbedRegistry::preparar(&req.contenedor, &req.tipo, &req.opciones)?;
    let anio = req.anio.unwrap_or_else(anio_actual);
    let contenido = match vista.tipo {
        TipoVista::PciComparativo => familias::reporte_pci(&*state.store(), anio, vista.opciones.meta)?,
    };
    let vista = state.embebidas().registrar(vista);
    Ok(json!({"vista": vista, "contenido": contenido}))
}

/// POST /vistas
/// Monta una vista embebida en el contenedor indicado y devuelve su contenido
/// inicial. Body: `{"contenedor": "pci-chart", "tipo": "pci-comparativo",
/// "opciones": {"indicadorA": 12, "indicadorB": 13, "meta": 70}}`.
pub async fn montar_vista_handler(state: web::Data<AppState>, body: web::Json<MontarVistaRequest>) -> impl Responder {
    match montar(&state, &body) {
        Ok(v) => HttpResponse::Ok().json(v),
        Err(e) => error_response(&e),
    }
}

/// DELETE /vistas/{contenedor}
pub async fn desmontar_vista_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.embebidas().desmontar(&path) {
        Some(v) => HttpResponse::Ok().json(json!({"desmontada": v})),
        None => HttpResponse::NotFound().json(json!({
            "error": format!("no hay vista montada en {}", path.as_str()),
            "tipo": "no_encontrado",
            "reintentar": false
        })),
    }
}

/// GET /modal
pub async fn modal_estado_handler(state: web::Data<AppState>) -> impl Responder {
    let overlay = state.overlay();
    HttpResponse::Ok().json(json!({"abierto": overlay.esta_abierto(), "modal": overlay.activo()}))
}

/// POST /modal
/// Con un modal abierto responde 400 (`tipo: "vista"`); hay que cerrarlo
/// primero.
pub async fn abrir_modal_handler(state: web::Data<AppState>, body: web::Json<AbrirModalRequest>) -> impl Responder {
    let req = body.into_inner();
    match state.overlay().abrir(req.familia, req.titulo.as_deref(), req.meta) {
        Ok(modal) => HttpResponse::Ok().json(json!({"abierto": true, "modal": modal})),
        Err(e) => error_response(&e),
    }
}

/// DELETE /modal
pub async fn cerrar_modal_handler(state: web::Data<AppState>) -> impl Responder {
    let cerrado = state.overlay().cerrar();
    HttpResponse::Ok().json(json!({"abierto": false, "cerrado": cerrado}))
}
