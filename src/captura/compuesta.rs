//! Captura compuesta: el valor del indicador se obtiene agregando varias
//! sub-capturas crudas (suma o promedio).

use serde::{Deserialize, Serialize};

use crate::error::{SmsError, SmsResult};

pub const MINIMO_CAPTURAS_VALIDAS: usize = 2;
pub const MENSAJE_CAPTURAS_INSUFICIENTES: &str =
    "Agrega al menos dos capturas válidas para calcular el indicador compuesto.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agregacion {
    #[default]
    #[serde(alias = "sum")]
    Suma,
    #[serde(alias = "average")]
    Promedio,
}

/// Fila editable de la captura compuesta. El texto se conserva tal como lo
/// escribió el operador; solo se interpreta al agregar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilaCaptura {
    pub id: u64,
    pub valor: String,
}

/// Lista ordenada de sub-capturas. Siempre tiene al menos una fila.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturaCompuesta {
    filas: Vec<FilaCaptura>,
    pub agregacion: Agregacion,
    #[serde(skip)]
    siguiente_id: u64,
}

impl Default for CapturaCompuesta {
    fn default() -> Self {
        CapturaCompuesta {
            filas: vec![FilaCaptura { id: 1, valor: String::new() }],
            agregacion: Agregacion::Suma,
            siguiente_id: 2,
        }
    }
}

impl CapturaCompuesta {
    pub fn new(agregacion: Agregacion) -> Self {
        CapturaCompuesta { agregacion, ..Default::default() }
    }

    /// Construye la captura a partir de valores crudos en orden.
    pub fn from_valores<I, S>(valores: I, agregacion: Agregacion) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut c = CapturaCompuesta::new(agregacion);
        let mut valores = valores.into_iter();
        if let Some(primero) = valores.next() {
            c.filas[0].valor = primero.into();
        }
        for v in valores {
            let id = c.agregar_fila();
            c.editar_fila(id, v);
        }
        c
    }

    pub fn filas(&self) -> &[FilaCaptura] {
        &self.filas
    }

    /// Agrega una fila vacía al final y devuelve su id.
    pub fn agregar_fila(&mut self) -> u64 {
        let id = self.siguiente_id.max(self.filas.iter().map(|f| f.id).max().unwrap_or(0) + 1);
        self.siguiente_id = id + 1;
        self.filas.push(FilaCaptura { id, valor: String::new() });
        id
    }

    pub fn editar_fila(&mut self, id: u64, valor: impl Into<String>) -> bool {
        match self.filas.iter_mut().find(|f| f.id == id) {
            Some(f) => {
                f.valor = valor.into();
                true
            }
            None => false,
        }
    }

    /// Quita la fila indicada; la última fila restante no se puede quitar.
    pub fn quitar_fila(&mut self, id: u64) -> bool {
        if self.filas.len() <= 1 {
            return false;
        }
        let antes = self.filas.len();
        self.filas.retain(|f| f.id != id);
        self.filas.len() != antes
    }

    /// Valores que se interpretan como números finitos; vacíos y texto se omiten.
    pub fn valores_numericos(&self) -> Vec<f64> {
        self.filas.iter().filter_map(|f| parse_finite(&f.valor)).collect()
    }

    /// Vista previa sobre las capturas válidas; `None` si no hay ninguna.
    pub fn vista_previa(&self) -> Option<f64> {
        agregar(&self.valores_numericos(), self.agregacion)
    }

    /// Resultado definitivo: exige al menos dos capturas válidas.
    pub fn resultado(&self) -> SmsResult<f64> {
        let valores = self.valores_numericos();
        if valores.len() < MINIMO_CAPTURAS_VALIDAS {
            return Err(SmsError::validacion(MENSAJE_CAPTURAS_INSUFICIENTES));
        }
        agregar(&valores, self.agregacion).ok_or_else(|| SmsError::validacion(MENSAJE_CAPTURAS_INSUFICIENTES))
    }
}

/// Interpreta texto como número finito. Separadores de miles y coma
/// decimal no se aceptan: "1,000" y "10,5" quedan fuera.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn agregar(valores: &[f64], agregacion: Agregacion) -> Option<f64> {
    if valores.is_empty() {
        return None;
    }
    let total: f64 = valores.iter().sum();
    Some(match agregacion {
        Agregacion::Suma => total,
        Agregacion::Promedio => total / valores.len() as f64,
    })
}
