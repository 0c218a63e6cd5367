//! Tasa de impactos con fauna: impactos / operaciones × 100.

use serde::Serialize;

/// Tasa derivada; 0 cuando no hubo operaciones en el periodo.
pub fn tasa_impactos(total_operaciones: i64, impactos: i64) -> f64 {
    if total_operaciones > 0 {
        (impactos as f64 / total_operaciones as f64) * 100.0
    } else {
        0.0
    }
}

/// Vista previa del formulario de captura. Solo orienta al operador: la tasa
/// que vale es la que recalcula el backend al guardar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VistaPreviaFauna {
    pub total_operaciones: Option<f64>,
    pub impactos: Option<f64>,
    pub tasa: Option<f64>,
}

fn no_negativo(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x >= 0.0)
}

pub fn vista_previa(total_operaciones: Option<f64>, impactos: Option<f64>) -> VistaPreviaFauna {
    let total = no_negativo(total_operaciones);
    let imp = no_negativo(impactos);
    let tasa = match (total, imp) {
        (Some(t), Some(i)) if t > 0.0 => Some((i / t) * 100.0),
        (Some(_), Some(_)) => Some(0.0),
        _ => None,
    };
    VistaPreviaFauna { total_operaciones: total, impactos: imp, tasa }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasa_basica() {
        assert_eq!(tasa_impactos(200, 3), 1.5);
        assert_eq!(tasa_impactos(0, 7), 0.0);
        assert_eq!(tasa_impactos(0, 0), 0.0);
    }

    #[test]
    fn vista_previa_requiere_ambos() {
        assert_eq!(vista_previa(Some(100.0), None).tasa, None);
        assert_eq!(vista_previa(Some(-1.0), Some(2.0)).tasa, None);
        assert_eq!(vista_previa(Some(0.0), Some(2.0)).tasa, Some(0.0));
        assert_eq!(vista_previa(Some(400.0), Some(2.0)).tasa, Some(0.5));
    }
}
