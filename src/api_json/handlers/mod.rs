pub mod catalogo;
pub mod docs;
pub mod mediciones;
pub mod metas;
pub mod reportes;
pub mod vistas;

pub use catalogo::*;
pub use docs::*;
pub use mediciones::*;
pub use metas::*;
pub use reportes::*;
pub use vistas::*;

use chrono::{Datelike, Utc};

use crate::acceso::Solicitante;
use crate::error::{SmsError, SmsResult};
use crate::models::Indicador;
use crate::store::SmsBackend;

/// Indicador por id, solo si el solicitante lo puede ver.
pub(crate) fn indicador_visible<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    id: &str,
) -> SmsResult<Indicador> {
    let indicador = backend
        .get_indicator(id)?
        .ok_or_else(|| SmsError::NoEncontrado(format!("indicador {}", id)))?;
    if !solicitante.puede_ver_indicador(&indicador) {
        return Err(SmsError::PermisoDenegado(format!("sin acceso al indicador {}", id)));
    }
    Ok(indicador)
}

pub(crate) fn anio_actual() -> i32 {
    Utc::now().year()
}
