//! Exportación CSV de tablas de reporte.

use serde::Serialize;

use crate::error::{SmsError, SmsResult};
use crate::reportes::Reporte;

pub const CONTENT_TYPE_CSV: &str = "text/csv;charset=utf-8";
const BOM: char = '\u{feff}';

fn escapar(celda: &str) -> String {
    if celda.contains(',') || celda.contains('"') || celda.contains('\n') {
        format!("\"{}\"", celda.replace('"', "\"\""))
    } else {
        celda.to_string()
    }
}

/// Filas unidas con `\n`, celdas con coma, con BOM UTF-8 al inicio. Sin
/// filas no hay nada que exportar.
pub fn to_csv<S: AsRef<str>>(filas: &[Vec<S>]) -> SmsResult<String> {
    if filas.is_empty() {
        return Err(SmsError::validacion("No hay datos para exportar."));
    }
    let cuerpo = filas
        .iter()
        .map(|fila| fila.iter().map(|c| escapar(c.as_ref())).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n");
    let mut out = String::with_capacity(cuerpo.len() + 3);
    out.push(BOM);
    out.push_str(&cuerpo);
    Ok(out)
}

/// Nombre de archivo seguro; conserva letras, dígitos, `-`, `_` y `.`.
pub fn nombre_archivo(base: &str) -> String {
    let limpio: String = base
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect();
    let limpio = limpio.trim_matches('-');
    if limpio.is_empty() { "export".to_string() } else { limpio.to_string() }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescargaCsv {
    pub filename: String,
    pub content_type: &'static str,
    pub contenido: String,
}

impl DescargaCsv {
    pub fn new<S: AsRef<str>>(base: &str, filas: &[Vec<S>]) -> SmsResult<Self> {
        Ok(DescargaCsv {
            filename: format!("{}.csv", nombre_archivo(base)),
            content_type: CONTENT_TYPE_CSV,
            contenido: to_csv(filas)?,
        })
    }

    pub fn desde_reporte(reporte: &Reporte) -> SmsResult<Self> {
        DescargaCsv::new(&reporte.archivo_csv, &reporte.filas_csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapa_y_antepone_bom() {
        let filas = vec![vec!["a,b", "c\"d", "e"], vec!["x\ny", "", "z"]];
        let csv = to_csv(&filas).unwrap();
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(&csv[3..], "\"a,b\",\"c\"\"d\",e\n\"x\ny\",,z");
    }

    #[test]
    fn vacio_no_exporta() {
        let filas: Vec<Vec<String>> = Vec::new();
        assert_eq!(to_csv(&filas).unwrap_err().tipo(), "validacion");
    }

    #[test]
    fn fila_vacia_es_linea_vacia() {
        let filas = vec![vec!["Mes".to_string()], vec![], vec!["TOTAL".to_string()]];
        assert_eq!(&to_csv(&filas).unwrap()[3..], "Mes\n\nTOTAL");
    }

    #[test]
    fn nombres_de_archivo() {
        assert_eq!(nombre_archivo("iluminacion-01L-2024"), "iluminacion-01L-2024");
        assert_eq!(nombre_archivo(" capturas fauna/2024 "), "capturas-fauna-2024");
        assert_eq!(nombre_archivo("///"), "export");
    }
}
