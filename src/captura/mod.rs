//! Captura, edición y validación de mediciones.
//!
//! Cada operación revisa permisos y datos antes de tocar el backend; un error
//! de validación nunca llega a `SmsBackend`.

pub mod compuesta;
pub mod fauna;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::acceso::Solicitante;
use crate::error::{SmsError, SmsResult};
use crate::indicadores::{is_fauna_impact_rate_indicator, is_sms_indicator, requires_subsystem};
use crate::models::{
    CambiosImpactoFauna, CambiosMedicion, Escenario, EstatusValidacion, ImpactoFauna, Indicador, Medicion,
    NuevaMedicion, NuevoImpactoFauna, PeriodoClave,
};
use crate::store::{SmsBackend, HISTORIAL_LIMITE};
use crate::validacion::{estatus_tras_edicion, transicion, AccionValidacion, Transicion};

use compuesta::{Agregacion, CapturaCompuesta};

pub const MENSAJE_MEDICION_REGISTRADA: &str = "Medición registrada correctamente y enviada a validación.";
pub const MENSAJE_MEDICION_ACTUALIZADA: &str = "Medición actualizada; se requiere una nueva validación.";
pub const MENSAJE_FAUNA_REGISTRADA: &str = "Impacto de fauna registrado correctamente.";
pub const MENSAJE_FAUNA_ACTUALIZADA: &str = "Impacto de fauna actualizado correctamente.";
pub const MENSAJE_MEDICION_VALIDADA: &str = "Medición validada correctamente.";
pub const MENSAJE_YA_VALIDADA: &str = "La medición ya estaba validada.";
pub const MENSAJE_MEDICION_RECHAZADA: &str = "Medición rechazada; deberá capturarse de nuevo.";
pub const MENSAJE_YA_RECHAZADA: &str = "La medición ya estaba rechazada.";
pub const MENSAJE_MEDICION_RECAPTURADA: &str = "Medición capturada de nuevo y enviada a validación.";
pub const MENSAJE_REGISTRO_EXISTENTE: &str = "Ya existe un registro para este periodo. Se cargó para edición.";

/// Sub-capturas enviadas por el formulario cuando el operador eligió captura
/// compuesta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntradaCompuesta {
    pub valores: Vec<String>,
    #[serde(default)]
    pub agregacion: Agregacion,
}

impl EntradaCompuesta {
    pub fn a_captura(&self) -> CapturaCompuesta {
        CapturaCompuesta::from_valores(self.valores.iter().cloned(), self.agregacion)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormularioMedicion {
    pub anio: i32,
    pub mes: u32,
    /// Clave o etiqueta; sin escenario se asume REAL.
    #[serde(default)]
    pub escenario: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
    #[serde(default)]
    pub subsistema: Option<String>,
    #[serde(default)]
    pub compuesta: Option<EntradaCompuesta>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormularioFauna {
    pub anio: i32,
    pub mes: u32,
    pub total_operaciones: Option<i64>,
    pub impactos: Option<i64>,
}

/// Desenlace de una captura o edición.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum ResultadoCaptura<T> {
    Creado { registro: T, mensaje: String },
    Actualizado { registro: T, mensaje: String },
    /// El periodo ya tenía registro: se devuelve para editarlo.
    ExistenteCargado { registro: T, mensaje: String },
}

impl<T> ResultadoCaptura<T> {
    pub fn registro(&self) -> &T {
        match self {
            ResultadoCaptura::Creado { registro, .. }
            | ResultadoCaptura::Actualizado { registro, .. }
            | ResultadoCaptura::ExistenteCargado { registro, .. } => registro,
        }
    }

    pub fn mensaje(&self) -> &str {
        match self {
            ResultadoCaptura::Creado { mensaje, .. }
            | ResultadoCaptura::Actualizado { mensaje, .. }
            | ResultadoCaptura::ExistenteCargado { mensaje, .. } => mensaje,
        }
    }

    pub fn es_existente(&self) -> bool {
        matches!(self, ResultadoCaptura::ExistenteCargado { .. })
    }
}

/// Desenlace de validar o rechazar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultadoEstatus {
    pub registro: Medicion,
    pub cambio: bool,
    pub mensaje: String,
}

/// Historial reciente según el tipo de captura del indicador.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo", content = "registros", rename_all = "snake_case")]
pub enum Historial {
    Mediciones(Vec<Medicion>),
    ImpactosFauna(Vec<ImpactoFauna>),
}

fn ahora() -> String {
    Utc::now().to_rfc3339()
}

fn exigir_visibilidad(solicitante: &Solicitante, indicador: &Indicador) -> SmsResult<()> {
    if solicitante.puede_ver_indicador(indicador) {
        Ok(())
    } else {
        Err(SmsError::PermisoDenegado(format!(
            "el indicador {} no pertenece a tus áreas asignadas",
            indicador.id
        )))
    }
}

pub fn validar_periodo(anio: i32, mes: u32) -> SmsResult<()> {
    if !(1..=12).contains(&mes) {
        return Err(SmsError::validacion("Selecciona un mes válido (1 a 12)."));
    }
    if !(1900..=9999).contains(&anio) {
        return Err(SmsError::validacion("Selecciona un año válido."));
    }
    Ok(())
}

fn resolver_escenario(raw: Option<&str>) -> SmsResult<Escenario> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Escenario::Real),
        Some(s) => Escenario::parse(s).ok_or_else(|| SmsError::validacion(format!("Escenario no reconocido: {}", s))),
    }
}

/// Valores listos para persistir, ya validados.
struct ValoresMedicion {
    escenario: Escenario,
    valor: f64,
    subsistema: Option<String>,
}

fn preparar_valores(indicador: &Indicador, form: &FormularioMedicion) -> SmsResult<ValoresMedicion> {
    if is_fauna_impact_rate_indicator(indicador) {
        return Err(SmsError::validacion(
            "Este indicador se captura con total de operaciones e impactos con fauna.",
        ));
    }
    validar_periodo(form.anio, form.mes)?;
    let escenario = resolver_escenario(form.escenario.as_deref())?;

    let valor = match &form.compuesta {
        Some(entrada) => {
            if !is_sms_indicator(indicador) {
                return Err(SmsError::validacion("La captura compuesta solo aplica a indicadores SMS."));
            }
            entrada.a_captura().resultado()?
        }
        None => match form.valor {
            Some(v) if v.is_finite() => v,
            Some(_) => return Err(SmsError::validacion("El valor capturado no es un número válido.")),
            None => return Err(SmsError::validacion("Captura el valor del indicador.")),
        },
    };

    let subsistema = form.subsistema.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
    if subsistema.is_none() && requires_subsystem(indicador) {
        return Err(SmsError::validacion("Selecciona el subsistema para este indicador."));
    }

    Ok(ValoresMedicion { escenario, valor, subsistema })
}

fn registro_existente<T>(registro: T) -> ResultadoCaptura<T> {
    ResultadoCaptura::ExistenteCargado { registro, mensaje: MENSAJE_REGISTRO_EXISTENTE.to_string() }
}

/// Registra un valor nuevo. Si el periodo ya tiene medición para el mismo
/// escenario, devuelve la existente en lugar de duplicarla; si esa medición
/// fue rechazada, la captura la reemplaza y vuelve a PENDIENTE.
pub fn registrar_medicion<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    form: &FormularioMedicion,
) -> SmsResult<ResultadoCaptura<Medicion>> {
    exigir_visibilidad(solicitante, indicador)?;
    let valores = preparar_valores(indicador, form)?;

    let clave = PeriodoClave {
        indicador_id: indicador.id.clone(),
        anio: form.anio,
        mes: form.mes,
        escenario: valores.escenario,
    };
    if let Some(existente) = backend.find_measurement(&clave)? {
        if existente.estatus_validacion == EstatusValidacion::Rechazado {
            return recapturar(backend, solicitante, &existente, form, valores);
        }
        info!(indicador = %indicador.id, anio = form.anio, mes = form.mes, "periodo ya capturado");
        return Ok(registro_existente(existente));
    }

    let nueva = NuevaMedicion {
        indicador_id: indicador.id.clone(),
        anio: form.anio,
        mes: form.mes,
        escenario: valores.escenario,
        valor: valores.valor,
        subsistema: valores.subsistema,
        capturado_por: solicitante.id(),
        estatus_validacion: EstatusValidacion::Pendiente,
    };
    match backend.create_measurement(&nueva) {
        Ok(registro) => {
            info!(indicador = %indicador.id, anio = form.anio, mes = form.mes, escenario = %valores.escenario, "medición registrada");
            Ok(ResultadoCaptura::Creado { registro, mensaje: MENSAJE_MEDICION_REGISTRADA.to_string() })
        }
        // Otro usuario capturó el mismo periodo entre la búsqueda y el insert.
        Err(SmsError::Conflicto(msg)) => match backend.find_measurement(&clave)? {
            Some(existente) => Ok(registro_existente(existente)),
            None => Err(SmsError::Conflicto(msg)),
        },
        Err(e) => Err(e),
    }
}

fn recapturar<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    rechazada: &Medicion,
    form: &FormularioMedicion,
    valores: ValoresMedicion,
) -> SmsResult<ResultadoCaptura<Medicion>> {
    let cambios = CambiosMedicion {
        anio: form.anio,
        mes: form.mes,
        escenario: valores.escenario,
        valor: valores.valor,
        subsistema: valores.subsistema,
        editado_por: solicitante.id(),
        estatus_validacion: estatus_tras_edicion(),
        validado_por: None,
        fecha_validacion: None,
        fecha_ultima_edicion: ahora(),
    };
    let registro = backend.update_measurement(rechazada.id, &cambios)?;
    info!(id = registro.id, indicador = %registro.indicador_id, "medición rechazada capturada de nuevo");
    Ok(ResultadoCaptura::Actualizado { registro, mensaje: MENSAJE_MEDICION_RECAPTURADA.to_string() })
}

/// Edita una medición ordinaria. Requiere rol elevado; la medición regresa a
/// PENDIENTE y pierde validador y fecha de validación.
pub fn editar_medicion<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    medicion_id: i64,
    form: &FormularioMedicion,
) -> SmsResult<ResultadoCaptura<Medicion>> {
    if !solicitante.rol.es_elevado() {
        return Err(SmsError::PermisoDenegado(
            "solo administración o subdirección pueden editar mediciones".to_string(),
        ));
    }
    exigir_visibilidad(solicitante, indicador)?;
    let actual = backend
        .get_measurement(medicion_id)?
        .filter(|m| m.indicador_id == indicador.id)
        .ok_or_else(|| SmsError::NoEncontrado(format!("medición {}", medicion_id)))?;
    let valores = preparar_valores(indicador, form)?;

    let cambios = CambiosMedicion {
        anio: form.anio,
        mes: form.mes,
        escenario: valores.escenario,
        valor: valores.valor,
        subsistema: valores.subsistema,
        editado_por: solicitante.id(),
        estatus_validacion: estatus_tras_edicion(),
        validado_por: None,
        fecha_validacion: None,
        fecha_ultima_edicion: ahora(),
    };
    let registro = backend.update_measurement(actual.id, &cambios)?;
    info!(
        id = registro.id,
        indicador = %indicador.id,
        estatus_anterior = actual.estatus_validacion.as_str(),
        "medición editada"
    );
    Ok(ResultadoCaptura::Actualizado { registro, mensaje: MENSAJE_MEDICION_ACTUALIZADA.to_string() })
}

fn conteos_fauna(form: &FormularioFauna) -> SmsResult<(i64, i64)> {
    validar_periodo(form.anio, form.mes)?;
    let total = form
        .total_operaciones
        .ok_or_else(|| SmsError::validacion("Captura el total de operaciones del mes."))?;
    let impactos = form
        .impactos
        .ok_or_else(|| SmsError::validacion("Captura el número de impactos con fauna."))?;
    if total < 0 || impactos < 0 {
        return Err(SmsError::validacion("Operaciones e impactos no pueden ser negativos."));
    }
    Ok((total, impactos))
}

fn exigir_fauna(indicador: &Indicador) -> SmsResult<()> {
    if is_fauna_impact_rate_indicator(indicador) {
        Ok(())
    } else {
        Err(SmsError::validacion("El indicador no es de tasa de impactos con fauna."))
    }
}

pub fn registrar_impacto_fauna<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    form: &FormularioFauna,
) -> SmsResult<ResultadoCaptura<ImpactoFauna>> {
    exigir_visibilidad(solicitante, indicador)?;
    exigir_fauna(indicador)?;
    let (total_operaciones, impactos) = conteos_fauna(form)?;

    if let Some(existente) = backend.find_fauna_impact(&indicador.id, form.anio, form.mes)? {
        return Ok(registro_existente(existente));
    }
    let nuevo = NuevoImpactoFauna {
        indicador_id: indicador.id.clone(),
        anio: form.anio,
        mes: form.mes,
        total_operaciones,
        impactos,
        capturado_por: solicitante.id(),
    };
    match backend.create_fauna_impact(&nuevo) {
        Ok(registro) => {
            info!(indicador = %indicador.id, anio = form.anio, mes = form.mes, tasa = registro.tasa, "impacto de fauna registrado");
            Ok(ResultadoCaptura::Creado { registro, mensaje: MENSAJE_FAUNA_REGISTRADA.to_string() })
        }
        Err(SmsError::Conflicto(msg)) => match backend.find_fauna_impact(&indicador.id, form.anio, form.mes)? {
            Some(existente) => Ok(registro_existente(existente)),
            None => Err(SmsError::Conflicto(msg)),
        },
        Err(e) => Err(e),
    }
}

/// Edita un registro de fauna: suma una edición y sella fecha y editor. El
/// estatus de validación no cambia.
pub fn editar_impacto_fauna<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
    registro_id: i64,
    form: &FormularioFauna,
) -> SmsResult<ResultadoCaptura<ImpactoFauna>> {
    exigir_visibilidad(solicitante, indicador)?;
    exigir_fauna(indicador)?;
    let actual = backend
        .get_fauna_impact(registro_id)?
        .filter(|r| r.indicador_id == indicador.id)
        .ok_or_else(|| SmsError::NoEncontrado(format!("impacto de fauna {}", registro_id)))?;
    let (total_operaciones, impactos) = conteos_fauna(form)?;

    let cambios = CambiosImpactoFauna {
        anio: form.anio,
        mes: form.mes,
        total_operaciones,
        impactos,
        editado_por: solicitante.id(),
        fecha_ultima_edicion: ahora(),
        numero_ediciones: actual.numero_ediciones + 1,
    };
    let registro = backend.update_fauna_impact(actual.id, &cambios)?;
    info!(id = registro.id, ediciones = registro.numero_ediciones, "impacto de fauna editado");
    Ok(ResultadoCaptura::Actualizado { registro, mensaje: MENSAJE_FAUNA_ACTUALIZADA.to_string() })
}

fn cambiar_estatus<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    medicion_id: i64,
    accion: AccionValidacion,
) -> SmsResult<ResultadoEstatus> {
    let actual = backend
        .get_measurement(medicion_id)?
        .ok_or_else(|| SmsError::NoEncontrado(format!("medición {}", medicion_id)))?;
    let indicador = backend
        .get_indicator(&actual.indicador_id)?
        .ok_or_else(|| SmsError::NoEncontrado(format!("indicador {}", actual.indicador_id)))?;
    exigir_visibilidad(solicitante, &indicador)?;
    let (msg_cambio, msg_igual) = match accion {
        AccionValidacion::Validar => (MENSAJE_MEDICION_VALIDADA, MENSAJE_YA_VALIDADA),
        AccionValidacion::Rechazar => (MENSAJE_MEDICION_RECHAZADA, MENSAJE_YA_RECHAZADA),
    };

    let cambio = match transicion(actual.estatus_validacion, accion, &solicitante.rol)? {
        Transicion::SinCambio => false,
        Transicion::Cambia(_) => {
            let quien = solicitante.id();
            let fecha = ahora();
            match accion {
                AccionValidacion::Validar => backend.mark_validated(actual.id, quien.as_deref(), &fecha)?,
                AccionValidacion::Rechazar => backend.mark_rejected(actual.id, quien.as_deref(), &fecha)?,
            }
        }
    };
    if !cambio {
        warn!(id = medicion_id, accion = ?accion, "sin cambio de estatus");
    }
    let registro = backend
        .get_measurement(medicion_id)?
        .ok_or_else(|| SmsError::NoEncontrado(format!("medición {}", medicion_id)))?;
    let mensaje = if cambio { msg_cambio } else { msg_igual };
    Ok(ResultadoEstatus { registro, cambio, mensaje: mensaje.to_string() })
}

/// Valida una medición. Validar dos veces no vuelve a sellar validador ni
/// fecha y se reporta como sin cambio.
pub fn validar_medicion<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    medicion_id: i64,
) -> SmsResult<ResultadoEstatus> {
    cambiar_estatus(backend, solicitante, medicion_id, AccionValidacion::Validar)
}

pub fn rechazar_medicion<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    medicion_id: i64,
) -> SmsResult<ResultadoEstatus> {
    cambiar_estatus(backend, solicitante, medicion_id, AccionValidacion::Rechazar)
}

/// Últimos doce registros del indicador, del más reciente al más antiguo.
pub fn historial<B: SmsBackend + ?Sized>(
    backend: &B,
    solicitante: &Solicitante,
    indicador: &Indicador,
) -> SmsResult<Historial> {
    exigir_visibilidad(solicitante, indicador)?;
    if is_fauna_impact_rate_indicator(indicador) {
        Ok(Historial::ImpactosFauna(backend.fauna_history(&indicador.id, HISTORIAL_LIMITE)?))
    } else {
        Ok(Historial::Mediciones(backend.measurement_history(&indicador.id, HISTORIAL_LIMITE)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Perfil;

    fn form(valor: Option<f64>) -> FormularioMedicion {
        FormularioMedicion { anio: 2024, mes: 3, escenario: None, valor, subsistema: None, compuesta: None }
    }

    fn sms() -> Indicador {
        Indicador {
            id: "10".into(),
            nombre: "Disponibilidad".into(),
            clave: Some("SMS-07".into()),
            activo: true,
            ..Default::default()
        }
    }

    #[test]
    fn mes_fuera_de_rango() {
        assert!(validar_periodo(2024, 0).is_err());
        assert!(validar_periodo(2024, 13).is_err());
        assert!(validar_periodo(2024, 12).is_ok());
    }

    #[test]
    fn escenario_por_defecto_real() {
        let v = preparar_valores(&sms(), &form(Some(5.0))).ok().unwrap();
        assert_eq!(v.escenario, Escenario::Real);
        assert_eq!(v.valor, 5.0);
    }

    #[test]
    fn compuesta_reemplaza_valor_manual() {
        let mut f = form(Some(1.0));
        f.compuesta = Some(EntradaCompuesta { valores: vec!["2".into(), "4".into()], agregacion: Agregacion::Promedio });
        let v = preparar_valores(&sms(), &f).ok().unwrap();
        assert_eq!(v.valor, 3.0);
    }

    #[test]
    fn compuesta_solo_sms() {
        let mut ind = sms();
        ind.clave = Some("OPS-1".into());
        let mut f = form(None);
        f.compuesta = Some(EntradaCompuesta { valores: vec!["2".into(), "4".into()], agregacion: Agregacion::Suma });
        assert!(preparar_valores(&ind, &f).is_err());
    }

    #[test]
    fn subsistema_requerido() {
        let mut ind = sms();
        ind.clave = Some("SMS-03".into());
        let mut f = form(Some(90.0));
        assert!(preparar_valores(&ind, &f).is_err());
        f.subsistema = Some("  Luces de borde ".into());
        let v = preparar_valores(&ind, &f).ok().unwrap();
        assert_eq!(v.subsistema.as_deref(), Some("Luces de borde"));
    }

    #[test]
    fn fuera_de_area_no_captura() {
        let store = crate::store::SqliteStore::open_in_memory().unwrap();
        let mut ind = sms();
        ind.area_id = Some("7".into());
        let s = Solicitante::new(Perfil { rol: "capturista".into(), area_id: Some("3".into()), ..Default::default() });
        let err = registrar_medicion(&store, &s, &ind, &form(Some(1.0))).unwrap_err();
        assert_eq!(err.tipo(), "permiso_denegado");
    }

    #[test]
    fn medicion_sin_indicador_no_se_valida() {
        let store = crate::store::SqliteStore::open_in_memory().unwrap();
        let huerfana = store
            .create_measurement(&NuevaMedicion {
                indicador_id: "99".into(),
                anio: 2024,
                mes: 3,
                escenario: Escenario::Real,
                valor: 1.0,
                subsistema: None,
                capturado_por: Some("op-1".into()),
                estatus_validacion: EstatusValidacion::Pendiente,
            })
            .unwrap();
        let s = Solicitante::new(Perfil { rol: "Administrador".into(), ..Default::default() });
        let err = validar_medicion(&store, &s, huerfana.id).unwrap_err();
        assert_eq!(err.tipo(), "no_encontrado");
        let err = rechazar_medicion(&store, &s, huerfana.id).unwrap_err();
        assert_eq!(err.tipo(), "no_encontrado");
        let sigue = store.get_measurement(huerfana.id).unwrap().unwrap();
        assert_eq!(sigue.estatus_validacion, EstatusValidacion::Pendiente);
    }
}
