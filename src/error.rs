//! Errores del servicio SMS.
//!
//! La taxonomía sigue las cuatro familias que la capa de captura distingue:
//! errores de validación local (no se llama al backend), errores del backend,
//! errores de lectura (reintentables por el usuario) y "sin datos", que NO es
//! un error y se modela aparte en `reportes::VistaReporte`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmsError {
    /// Validación local: la captura se bloquea y no se contacta al backend.
    #[error("{0}")]
    Validacion(String),

    #[error("permiso denegado: {0}")]
    PermisoDenegado(String),

    #[error("no encontrado: {0}")]
    NoEncontrado(String),

    /// Violación de unicidad reportada por el backend.
    #[error("conflicto: {0}")]
    Conflicto(String),

    #[error("error de backend: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("error de serialización: {0}")]
    Serializacion(#[from] serde_json::Error),

    #[error("configuración inválida: {0}")]
    Configuracion(String),

    #[error("vista: {0}")]
    Vista(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SmsError {
    pub fn validacion(msg: impl Into<String>) -> Self {
        SmsError::Validacion(msg.into())
    }

    /// Etiqueta estable usada en el campo `tipo` de las respuestas JSON.
    pub fn tipo(&self) -> &'static str {
        match self {
            SmsError::Validacion(_) => "validacion",
            SmsError::PermisoDenegado(_) => "permiso_denegado",
            SmsError::NoEncontrado(_) => "no_encontrado",
            SmsError::Conflicto(_) => "conflicto",
            SmsError::Backend(_) => "backend",
            SmsError::Serializacion(_) => "serializacion",
            SmsError::Configuracion(_) => "configuracion",
            SmsError::Vista(_) => "vista",
            SmsError::Io(_) => "io",
        }
    }

    /// Las lecturas fallidas por el backend se pueden reintentar manualmente;
    /// los errores de validación o permisos no cambian al reintentar.
    pub fn reintentable(&self) -> bool {
        matches!(self, SmsError::Backend(_) | SmsError::Io(_))
    }

    /// Detecta violaciones de UNIQUE en SQLite para tratarlas como conflicto.
    pub(crate) fn es_violacion_unicidad(err: &rusqlite::Error) -> bool {
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

pub type SmsResult<T> = Result<T, SmsError>;
