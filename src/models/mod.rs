// Estructuras de datos principales del dominio SMS.
//
// Todas tienen forma fija: la tolerancia a distintos nombres de campo que
// llegan en payloads crudos vive únicamente en `normalize`.

pub mod normalize;
pub mod series;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::normalize_scenario_key;

pub use series::*;

/// Etiqueta de escenario. `REAL` es el valor observado; BAJO/MEDIO/ALTO son
/// escenarios de planeación (los únicos válidos para metas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Escenario {
    #[default]
    Real,
    Bajo,
    Medio,
    Alto,
}

impl Escenario {
    pub const METAS: [Escenario; 3] = [Escenario::Bajo, Escenario::Medio, Escenario::Alto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Escenario::Real => "REAL",
            Escenario::Bajo => "BAJO",
            Escenario::Medio => "MEDIO",
            Escenario::Alto => "ALTO",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Escenario::Real => "Valor real",
            Escenario::Bajo => "Escenario bajo",
            Escenario::Medio => "Escenario medio",
            Escenario::Alto => "Escenario alto",
        }
    }

    /// Acepta la clave o una etiqueta humana ("Escenario bajo", "meta alto").
    pub fn parse(raw: &str) -> Option<Escenario> {
        match normalize_scenario_key(raw).as_str() {
            "REAL" => Some(Escenario::Real),
            "BAJO" => Some(Escenario::Bajo),
            "MEDIO" => Some(Escenario::Medio),
            "ALTO" => Some(Escenario::Alto),
            _ => None,
        }
    }

    pub fn es_de_meta(&self) -> bool {
        !matches!(self, Escenario::Real)
    }
}

impl fmt::Display for Escenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EstatusValidacion {
    #[default]
    Pendiente,
    Validado,
    Rechazado,
}

impl EstatusValidacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstatusValidacion::Pendiente => "PENDIENTE",
            EstatusValidacion::Validado => "VALIDADO",
            EstatusValidacion::Rechazado => "RECHAZADO",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EstatusValidacion::Pendiente => "Pendiente de validación",
            EstatusValidacion::Validado => "Validado por subdirección",
            EstatusValidacion::Rechazado => "Rechazado por subdirección",
        }
    }

    pub fn parse(raw: &str) -> Option<EstatusValidacion> {
        match raw.trim().to_uppercase().as_str() {
            "PENDIENTE" => Some(EstatusValidacion::Pendiente),
            "VALIDADO" => Some(EstatusValidacion::Validado),
            "RECHAZADO" => Some(EstatusValidacion::Rechazado),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub nombre: String,
    pub activo: bool,
    pub orden_visualizacion: Option<i64>,
    /// Subdirección a la que pertenece el área.
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicador {
    pub id: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    /// Otros títulos con los que el backend nombra al indicador.
    #[serde(default)]
    pub alias: Vec<String>,
    pub area_id: Option<String>,
    pub area_nombre: Option<String>,
    pub parent_area_id: Option<String>,
    pub unidad_medida: Option<String>,
    pub orden_visualizacion: Option<i64>,
    pub activo: bool,
    #[serde(default)]
    pub requiere_subsistema: bool,
    pub clave: Option<String>,
}

impl Indicador {
    /// Ids de área candidatos: área directa y área padre / subdirección.
    pub fn area_candidates(&self) -> BTreeSet<String> {
        self.area_id
            .iter()
            .chain(self.parent_area_id.iter())
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn unidad(&self) -> &str {
        self.unidad_medida.as_deref().unwrap_or("No definida")
    }

    pub fn area_label(&self) -> &str {
        self.area_nombre.as_deref().unwrap_or("Área no definida")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicion {
    pub id: i64,
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
    pub valor: f64,
    pub subsistema: Option<String>,
    pub estatus_validacion: EstatusValidacion,
    pub capturado_por: Option<String>,
    pub editado_por: Option<String>,
    pub validado_por: Option<String>,
    pub fecha_captura: Option<String>,
    pub fecha_ultima_edicion: Option<String>,
    pub fecha_validacion: Option<String>,
    #[serde(default)]
    pub rechazado_por: Option<String>,
    #[serde(default)]
    pub fecha_rechazo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactoFauna {
    pub id: i64,
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub total_operaciones: i64,
    pub impactos: i64,
    /// Calculada por el backend al persistir.
    pub tasa: f64,
    pub estatus_validacion: EstatusValidacion,
    pub capturado_por: Option<String>,
    pub editado_por: Option<String>,
    pub numero_ediciones: i64,
    pub fecha_captura: Option<String>,
    pub fecha_ultima_edicion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub id: i64,
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
    pub valor: f64,
    pub capturado_por: Option<String>,
    pub editado_por: Option<String>,
}

/// Perfil del usuario que hace la petición (resuelto por la capa de auth).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Perfil {
    pub id: Option<String>,
    pub rol: String,
    pub area_id: Option<String>,
    /// Id del objeto `area` cuando viene anidado con otra forma.
    pub area_obj_id: Option<String>,
    pub subdireccion_id: Option<String>,
}

// --- Contratos de escritura hacia el backend ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevaMedicion {
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
    pub valor: f64,
    pub subsistema: Option<String>,
    pub capturado_por: Option<String>,
    pub estatus_validacion: EstatusValidacion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CambiosMedicion {
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
    pub valor: f64,
    pub subsistema: Option<String>,
    pub editado_por: Option<String>,
    pub estatus_validacion: EstatusValidacion,
    pub validado_por: Option<String>,
    pub fecha_validacion: Option<String>,
    pub fecha_ultima_edicion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoImpactoFauna {
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub total_operaciones: i64,
    pub impactos: i64,
    pub capturado_por: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CambiosImpactoFauna {
    pub anio: i32,
    pub mes: u32,
    pub total_operaciones: i64,
    pub impactos: i64,
    pub editado_por: Option<String>,
    pub fecha_ultima_edicion: String,
    pub numero_ediciones: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaUpsert {
    /// Presente cuando la meta ya existe y se edita.
    pub id: Option<i64>,
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
    pub valor: f64,
    pub capturado_por: Option<String>,
    pub editado_por: Option<String>,
}

/// Clave de unicidad de una medición ordinaria.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeriodoClave {
    pub indicador_id: String,
    pub anio: i32,
    pub mes: u32,
    pub escenario: Escenario,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escenario_desde_etiqueta() {
        assert_eq!(Escenario::parse("Escenario medio"), Some(Escenario::Medio));
        assert_eq!(Escenario::parse("real"), Some(Escenario::Real));
        assert_eq!(Escenario::parse("optimista"), None);
        assert!(!Escenario::Real.es_de_meta());
        assert!(Escenario::Alto.es_de_meta());
    }

    #[test]
    fn valores_por_defecto() {
        assert_eq!(Escenario::default(), Escenario::Real);
        assert_eq!(EstatusValidacion::default(), EstatusValidacion::Pendiente);
    }

    #[test]
    fn candidatos_de_area_omiten_vacios() {
        let ind = Indicador {
            id: "1".into(),
            area_id: Some("7".into()),
            parent_area_id: Some("".into()),
            ..Default::default()
        };
        let ids: Vec<String> = ind.area_candidates().into_iter().collect();
        assert_eq!(ids, vec!["7".to_string()]);
    }

    #[test]
    fn estatus_serializa_en_mayusculas() {
        let s = serde_json::to_string(&EstatusValidacion::Rechazado).unwrap();
        assert_eq!(s, "\"RECHAZADO\"");
        assert_eq!(EstatusValidacion::parse(" validado "), Some(EstatusValidacion::Validado));
    }
}
