//! Flujo de estatus de validación de mediciones.
//!
//! PENDIENTE -> VALIDADO | RECHAZADO por un rol elevado; cualquier edición
//! del valor regresa la medición a PENDIENTE.

use serde_json::Value;

use crate::acceso::Rol;
use crate::error::{SmsError, SmsResult};
use crate::models::EstatusValidacion;

/// Acción solicitada sobre el estatus de una medición.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccionValidacion {
    Validar,
    Rechazar,
}

/// Resultado de aplicar una acción: transición efectiva o no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transicion {
    Cambia(EstatusValidacion),
    SinCambio,
}

/// Decide la transición. Los permisos se revisan antes que el estado.
pub fn transicion(actual: EstatusValidacion, accion: AccionValidacion, rol: &Rol) -> SmsResult<Transicion> {
    if !rol.puede_validar() {
        return Err(SmsError::PermisoDenegado(
            "solo administración o subdirección pueden validar mediciones".to_string(),
        ));
    }
    match (accion, actual) {
        (AccionValidacion::Validar, EstatusValidacion::Validado) => Ok(Transicion::SinCambio),
        (AccionValidacion::Validar, _) => Ok(Transicion::Cambia(EstatusValidacion::Validado)),
        (AccionValidacion::Rechazar, EstatusValidacion::Pendiente) => Ok(Transicion::Cambia(EstatusValidacion::Rechazado)),
        (AccionValidacion::Rechazar, EstatusValidacion::Rechazado) => Ok(Transicion::SinCambio),
        (AccionValidacion::Rechazar, EstatusValidacion::Validado) => Err(SmsError::validacion(
            "La medición ya fue validada; edítala para volver a enviarla a revisión.",
        )),
    }
}

/// Estatus que recibe una medición ordinaria al editarse.
pub fn estatus_tras_edicion() -> EstatusValidacion {
    EstatusValidacion::Pendiente
}

/// Estatus de un registro crudo. Orden: texto explícito
/// (`estatus_validacion`, `estado_validacion`, `estatus`), booleano
/// `validado`, presencia de `validado_por`; si nada aplica, PENDIENTE.
pub fn computar_estatus(raw: &Value) -> EstatusValidacion {
    for key in ["estatus_validacion", "estado_validacion", "estatus"] {
        if let Some(Value::String(s)) = raw.get(key) {
            if let Some(e) = EstatusValidacion::parse(s) {
                return e;
            }
        }
    }
    if let Some(Value::Bool(b)) = raw.get("validado") {
        return if *b { EstatusValidacion::Validado } else { EstatusValidacion::Pendiente };
    }
    match raw.get("validado_por") {
        Some(Value::Null) | None => EstatusValidacion::Pendiente,
        Some(Value::String(s)) if s.trim().is_empty() => EstatusValidacion::Pendiente,
        Some(_) => EstatusValidacion::Validado,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADMIN: Rol = Rol { admin: true, subdirector: false };
    const CAPTURISTA: Rol = Rol { admin: false, subdirector: false };

    #[test]
    fn validar_desde_pendiente_o_rechazado() {
        assert_eq!(
            transicion(EstatusValidacion::Pendiente, AccionValidacion::Validar, &ADMIN).unwrap(),
            Transicion::Cambia(EstatusValidacion::Validado)
        );
        assert_eq!(
            transicion(EstatusValidacion::Rechazado, AccionValidacion::Validar, &ADMIN).unwrap(),
            Transicion::Cambia(EstatusValidacion::Validado)
        );
    }

    #[test]
    fn validar_dos_veces_es_noop() {
        assert_eq!(
            transicion(EstatusValidacion::Validado, AccionValidacion::Validar, &ADMIN).unwrap(),
            Transicion::SinCambio
        );
    }

    #[test]
    fn capturista_no_valida() {
        let err = transicion(EstatusValidacion::Pendiente, AccionValidacion::Validar, &CAPTURISTA).unwrap_err();
        assert_eq!(err.tipo(), "permiso_denegado");
    }

    #[test]
    fn rechazar_validado_es_error() {
        assert!(transicion(EstatusValidacion::Validado, AccionValidacion::Rechazar, &ADMIN).is_err());
    }

    #[test]
    fn estatus_desde_registro_crudo() {
        assert_eq!(computar_estatus(&json!({"estatus_validacion": "rechazado"})), EstatusValidacion::Rechazado);
        assert_eq!(computar_estatus(&json!({"validado": false, "validado_por": "x"})), EstatusValidacion::Pendiente);
        assert_eq!(computar_estatus(&json!({"validado_por": "u9"})), EstatusValidacion::Validado);
        assert_eq!(computar_estatus(&json!({})), EstatusValidacion::Pendiente);
    }
}
