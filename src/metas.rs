//! Metas por escenario (BAJO / MEDIO / ALTO) de cada indicador y mes.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::acceso::Solicitante;
use crate::captura::validar_periodo;
use crate::error::{SmsError, SmsResult};
use crate::models::{Escenario, Indicador, Meta, MetaUpsert};
use crate::store::SmsBackend;

pub const MENSAJE_META_REGISTRADA: &str = "Meta registrada correctamente.";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormularioMeta {
    pub anio: i32,
    pub mes: u32,
    #[serde(default)]
    pub escenario: Option<String>,
    pub valor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultadoMeta {
    pub registro: Meta,
    /// `true` cuando la meta ya existía y se sobrescribió.
    pub editada: bool,
    pub mensaje: String,
}

/// Escenario de meta; sin valor se usa MEDIO y REAL no es válido.
pub fn escenario_meta(raw: Option<&str>) -> SmsResult<Escenario> {
    let Some(texto) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Escenario::Medio);
    };
    match Escenario::parse(texto) {
        Some(e) if e.es_de_meta() => Ok(e),
        _ => Err(SmsError::validacion(format!(
            "Escenario de meta no válido: {} (usa BAJO, MEDIO o ALTO).",
            texto
        ))),
    }
}

/// Metas capturadas para el año, por mes y escenario.
pub fn metas_del_anio<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    anio: i32,
) -> SmsResult<Vec<Meta>> {
    if !solicitante.puede_ver_indicador(indicador) {
        return Err(SmsError::PermisoDenegado(format!("sin acceso al indicador {}", indicador.id)));
    }
    backend.targets(&indicador.id, anio)
}

/// Crea o sobrescribe la meta del periodo y escenario.
pub fn registrar_meta<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    form: &FormularioMeta,
) -> SmsResult<ResultadoMeta> {
    if !solicitante.rol.puede_gestionar_metas() {
        return Err(SmsError::PermisoDenegado(
            "solo administración o subdirección pueden registrar metas".to_string(),
        ));
    }
    validar_periodo(form.anio, form.mes)?;
    let escenario = escenario_meta(form.escenario.as_deref())?;
    let valor = match form.valor {
        Some(v) if v.is_finite() => v,
        _ => return Err(SmsError::validacion("Captura un valor numérico para la meta.")),
    };

    let existente = backend
        .targets(&indicador.id, form.anio)?
        .into_iter()
        .find(|m| m.mes == form.mes && m.escenario == escenario);

    let quien = solicitante.id();
    let upsert = MetaUpsert {
        id: existente.as_ref().map(|m| m.id),
        indicador_id: indicador.id.clone(),
        anio: form.anio,
        mes: form.mes,
        escenario,
        valor,
        capturado_por: if existente.is_none() { quien.clone() } else { None },
        editado_por: if existente.is_some() { quien } else { None },
    };
    let registro = backend.upsert_target(&upsert)?;
    info!(indicador = %indicador.id, anio = form.anio, mes = form.mes, escenario = %escenario, "meta guardada");
    Ok(ResultadoMeta { registro, editada: existente.is_some(), mensaje: MENSAJE_META_REGISTRADA.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escenario_por_defecto_medio() {
        assert_eq!(escenario_meta(None).unwrap(), Escenario::Medio);
        assert_eq!(escenario_meta(Some("  ")).unwrap(), Escenario::Medio);
        assert_eq!(escenario_meta(Some("Meta alto")).unwrap(), Escenario::Alto);
    }

    #[test]
    fn real_no_es_meta() {
        assert!(escenario_meta(Some("REAL")).is_err());
        assert!(escenario_meta(Some("optimista")).is_err());
    }
}
