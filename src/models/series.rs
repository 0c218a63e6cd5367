//! Registros de las series mensuales que alimentan los reportes SMS.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Familias de indicadores con reporte mensual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamiliaSerie {
    /// SMS-05A / SMS-05B
    Pci,
    /// SMS-07
    DisponibilidadPistas,
    /// SMS-03, SMS-03A, SMS-03B, SMS-04
    Iluminacion,
    /// SMS-06
    Mantenimientos,
    /// SMS-01 / SMS-02
    CapturasFauna,
}

impl FamiliaSerie {
    pub const TODAS: [FamiliaSerie; 5] = [
        FamiliaSerie::Pci,
        FamiliaSerie::DisponibilidadPistas,
        FamiliaSerie::Iluminacion,
        FamiliaSerie::Mantenimientos,
        FamiliaSerie::CapturasFauna,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            FamiliaSerie::Pci => "pci",
            FamiliaSerie::DisponibilidadPistas => "disponibilidad-pistas",
            FamiliaSerie::Iluminacion => "iluminacion",
            FamiliaSerie::Mantenimientos => "mantenimientos",
            FamiliaSerie::CapturasFauna => "capturas-fauna",
        }
    }

    pub fn from_slug(slug: &str) -> Option<FamiliaSerie> {
        FamiliaSerie::TODAS.into_iter().find(|f| f.slug() == slug.trim())
    }

    pub fn titulo(&self) -> &'static str {
        match self {
            FamiliaSerie::Pci => "Comparativo PCI - Índice de Condiciones del Pavimento",
            FamiliaSerie::DisponibilidadPistas => "Disponibilidad de Pistas",
            FamiliaSerie::Iluminacion => "Sistema de Iluminación",
            FamiliaSerie::Mantenimientos => "Mantenimientos Programados",
            FamiliaSerie::CapturasFauna => "Capturas de Fauna",
        }
    }

    pub fn claves(&self) -> &'static str {
        match self {
            FamiliaSerie::Pci => "SMS-05A, SMS-05B",
            FamiliaSerie::DisponibilidadPistas => "SMS-07",
            FamiliaSerie::Iluminacion => "SMS-03, SMS-03A, SMS-03B, SMS-04",
            FamiliaSerie::Mantenimientos => "SMS-06",
            FamiliaSerie::CapturasFauna => "SMS-01, SMS-02",
        }
    }

    /// Meta por defecto que se dibuja como línea de referencia.
    pub fn meta_default(&self) -> Option<f64> {
        match self {
            FamiliaSerie::Pci => Some(70.0),
            FamiliaSerie::DisponibilidadPistas => Some(98.0),
            FamiliaSerie::Mantenimientos => Some(100.0),
            FamiliaSerie::Iluminacion | FamiliaSerie::CapturasFauna => None,
        }
    }
}

impl fmt::Display for FamiliaSerie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Registros con número de mes, para el reacomodo de 12 meses.
pub trait RegistroMensual {
    fn mes(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistroPci {
    pub anio: i32,
    pub mes: u32,
    pub pista: String,
    pub valor_pci: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistroDisponibilidad {
    pub anio: i32,
    pub mes: u32,
    pub pista: String,
    pub porcentaje_disponibilidad: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistroLuces {
    pub anio: i32,
    pub mes: u32,
    pub pista: String,
    pub luces_operativas: Option<f64>,
    pub luces_totales: Option<f64>,
    pub porcentaje_operativas: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistroMantenimiento {
    pub anio: i32,
    pub mes: u32,
    pub programados: Option<f64>,
    pub realizados: Option<f64>,
    pub porcentaje_cumplimiento: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistroCapturaFauna {
    pub anio: i32,
    pub mes: u32,
    pub tipo_fauna: String,
    pub cantidad: f64,
}

macro_rules! impl_registro_mensual {
    ($($t:ty),*) => {
        $(impl RegistroMensual for $t {
            fn mes(&self) -> u32 { self.mes }
        })*
    };
}

impl_registro_mensual!(RegistroPci, RegistroDisponibilidad, RegistroLuces, RegistroMantenimiento, RegistroCapturaFauna);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_ida_y_vuelta() {
        for f in FamiliaSerie::TODAS {
            assert_eq!(FamiliaSerie::from_slug(f.slug()), Some(f));
        }
        assert_eq!(FamiliaSerie::from_slug("otra"), None);
    }

    #[test]
    fn serde_usa_slug() {
        let s = serde_json::to_string(&FamiliaSerie::DisponibilidadPistas).unwrap();
        assert_eq!(s, "\"disponibilidad-pistas\"");
    }
}
