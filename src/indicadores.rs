//! Clasificación de indicadores especiales del catálogo.

use serde::Serialize;

use crate::models::Indicador;
use crate::text::{normalize_text, normalize_upper};

const FAUNA_IMPACT_CODES: [&str; 1] = ["SMS-01"];
const SUBSISTEMA_REQUIRED_CODES: [&str; 3] = ["SMS-02", "SMS-03", "SMS-04"];

/// Indicador de la familia SMS: el área se llama "SMS..." o la clave empieza
/// con `SMS-`. Solo estos admiten captura compuesta.
pub fn is_sms_indicator(ind: &Indicador) -> bool {
    let area = ind.area_nombre.as_deref().map(normalize_text).unwrap_or_default();
    let clave = ind.clave.as_deref().map(normalize_upper).unwrap_or_default();
    area.contains("sms") || clave.starts_with("SMS-")
}

/// Indicador de tasa de impactos con fauna, por clave fija o por texto que
/// mencione "fauna" junto con "impact" o "tasa".
pub fn is_fauna_impact_rate_indicator(ind: &Indicador) -> bool {
    if let Some(clave) = ind.clave.as_deref() {
        if FAUNA_IMPACT_CODES.contains(&normalize_upper(clave).as_str()) {
            return true;
        }
    }
    std::iter::once(&ind.nombre)
        .chain(ind.descripcion.iter())
        .chain(ind.alias.iter())
        .map(|t| normalize_text(t))
        .filter(|t| !t.is_empty())
        .any(|t| t.contains("fauna") && (t.contains("impact") || t.contains("tasa")))
}

pub fn requires_subsystem(ind: &Indicador) -> bool {
    if ind.requiere_subsistema {
        return true;
    }
    let clave = ind.clave.as_deref().map(normalize_upper).unwrap_or_default();
    SUBSISTEMA_REQUIRED_CODES.contains(&clave.as_str())
}

/// Tipo de captura que corresponde a un indicador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoCaptura {
    /// Total de operaciones + impactos; la tasa se deriva.
    ImpactoFauna,
    /// Valor directo o compuesto por varias capturas.
    Sms,
    Ordinaria,
}

pub fn tipo_captura(ind: &Indicador) -> TipoCaptura {
    if is_fauna_impact_rate_indicator(ind) {
        TipoCaptura::ImpactoFauna
    } else if is_sms_indicator(ind) {
        TipoCaptura::Sms
    } else {
        TipoCaptura::Ordinaria
    }
}

/// Opción de indicador para los selectores de la pantalla de captura.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpcionIndicador {
    pub id: String,
    pub nombre: String,
    pub area: String,
    pub unidad: String,
    pub clave: Option<String>,
    pub tipo_captura: TipoCaptura,
    pub requiere_subsistema: bool,
}

impl From<&Indicador> for OpcionIndicador {
    fn from(ind: &Indicador) -> Self {
        OpcionIndicador {
            id: ind.id.clone(),
            nombre: ind.nombre.clone(),
            area: ind.area_label().to_string(),
            unidad: ind.unidad().to_string(),
            clave: ind.clave.clone(),
            tipo_captura: tipo_captura(ind),
            requiere_subsistema: requires_subsystem(ind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(nombre: &str, clave: Option<&str>, area: Option<&str>) -> Indicador {
        Indicador {
            id: "1".into(),
            nombre: nombre.into(),
            clave: clave.map(String::from),
            area_nombre: area.map(String::from),
            activo: true,
            ..Default::default()
        }
    }

    #[test]
    fn fauna_por_clave_o_texto() {
        assert!(is_fauna_impact_rate_indicator(&ind("Cualquier cosa", Some(" sms-01 "), None)));
        assert!(is_fauna_impact_rate_indicator(&ind("Tasa de IMPACTOS con Fauna", None, None)));
        assert!(is_fauna_impact_rate_indicator(&ind("Índice fáuna – tasa", None, None)));
        assert!(!is_fauna_impact_rate_indicator(&ind("Capturas de fauna", None, None)));
    }

    #[test]
    fn fauna_por_alias() {
        let mut i = ind("SMS indicador", None, None);
        i.alias = vec!["Impactos con fauna por cada 10,000 operaciones".into()];
        assert!(is_fauna_impact_rate_indicator(&i));
    }

    #[test]
    fn sms_por_area_o_clave() {
        assert!(is_sms_indicator(&ind("PCI", Some("SMS-05A"), None)));
        assert!(is_sms_indicator(&ind("PCI", None, Some("Área SMS"))));
        assert!(!is_sms_indicator(&ind("Pasajeros", Some("OPS-1"), Some("Operaciones"))));
    }

    #[test]
    fn subsistema_por_bandera_o_clave() {
        assert!(requires_subsystem(&ind("Luces", Some("sms-03"), None)));
        let mut i = ind("Otro", None, None);
        assert!(!requires_subsystem(&i));
        i.requiere_subsistema = true;
        assert!(requires_subsystem(&i));
    }

    #[test]
    fn tipo_captura_prioriza_fauna() {
        assert_eq!(tipo_captura(&ind("x", Some("SMS-01"), Some("SMS"))), TipoCaptura::ImpactoFauna);
        assert_eq!(tipo_captura(&ind("x", Some("SMS-06"), None)), TipoCaptura::Sms);
        assert_eq!(tipo_captura(&ind("x", None, None)), TipoCaptura::Ordinaria);
    }
}
