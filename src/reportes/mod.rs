//! Series mensuales, estadísticas y formato de los reportes SMS.
//!
//! Todo reporte se reacomoda a doce meses; el mes sin registro queda como
//! `None` y así se dibuja (hueco) y se exporta (celda vacía).

pub mod familias;

use serde::Serialize;

use crate::models::{FamiliaSerie, RegistroMensual};

pub const MESES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

pub const MESES_CORTOS: [&str; 12] = ["Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic"];

/// Etiqueta corta del mes (1-12); cadena vacía fuera de rango.
pub fn mes_corto(mes: u32) -> &'static str {
    mes.checked_sub(1).and_then(|i| MESES_CORTOS.get(i as usize)).copied().unwrap_or("")
}

/// Para cada mes 1..=12, el primer registro de ese mes si existe.
pub fn por_mes<R: RegistroMensual>(registros: &[R]) -> Vec<Option<&R>> {
    (1..=12u32).map(|mes| registros.iter().find(|r| r.mes() == mes)).collect()
}

/// Doce valores mensuales extraídos con `campo`.
pub fn serie_mensual<R, F>(registros: &[R], campo: F) -> Vec<Option<f64>>
where
    R: RegistroMensual,
    F: Fn(&R) -> Option<f64>,
{
    por_mes(registros).into_iter().map(|r| r.and_then(&campo)).collect()
}

fn finitos(valores: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    valores.iter().flatten().copied().filter(|v| v.is_finite())
}

/// Promedio de los valores presentes y finitos; `None` si no hay ninguno.
pub fn calcular_promedio(valores: &[Option<f64>]) -> Option<f64> {
    let (suma, n) = finitos(valores).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { None } else { Some(suma / n as f64) }
}

/// Suma de los valores presentes y finitos; 0 si no hay ninguno.
pub fn calcular_total(valores: &[Option<f64>]) -> f64 {
    finitos(valores).sum()
}

/// Último valor presente de la serie.
pub fn ultimo_valor(valores: &[Option<f64>]) -> Option<f64> {
    valores.iter().rev().flatten().copied().find(|v| v.is_finite())
}

pub fn redondear(valor: f64, decimales: u32) -> f64 {
    let factor = 10f64.powi(decimales as i32);
    (valor * factor).round() / factor
}

/// Color de cumplimiento contra la meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semaforo {
    Verde,
    Amarillo,
    Rojo,
    Gris,
}

/// `valor / meta × 100`. En modo invertido (menos es mejor) los umbrales son
/// 50 y 80; en modo normal 100 y 70.
pub fn semaforo(valor: Option<f64>, meta: Option<f64>, invertido: bool) -> Semaforo {
    let (Some(v), Some(m)) = (valor, meta) else {
        return Semaforo::Gris;
    };
    if !v.is_finite() || !m.is_finite() || m == 0.0 {
        return Semaforo::Gris;
    }
    let pct = v / m * 100.0;
    if invertido {
        if pct <= 50.0 {
            Semaforo::Verde
        } else if pct <= 80.0 {
            Semaforo::Amarillo
        } else {
            Semaforo::Rojo
        }
    } else if pct >= 100.0 {
        Semaforo::Verde
    } else if pct >= 70.0 {
        Semaforo::Amarillo
    } else {
        Semaforo::Rojo
    }
}

/// Nivel del último valor respecto al umbral (tarjetas del comparativo PCI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tendencia {
    Alto,
    Medio,
    Bajo,
    SinDato,
}

pub fn tendencia(valor: Option<f64>, umbral: f64) -> Tendencia {
    match valor {
        Some(v) if v >= umbral => Tendencia::Alto,
        Some(v) if v >= umbral * 0.8 => Tendencia::Medio,
        Some(_) => Tendencia::Bajo,
        None => Tendencia::SinDato,
    }
}

fn agrupar_miles(entero: &str) -> String {
    let digitos: Vec<char> = entero.chars().collect();
    let mut out = String::with_capacity(digitos.len() + digitos.len() / 3);
    for (i, c) in digitos.iter().enumerate() {
        if i > 0 && (digitos.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

/// Número con separador de miles (es-MX) y hasta tres decimales; "—" si falta.
pub fn formatear_numero(valor: Option<f64>) -> String {
    let Some(v) = valor.filter(|v| v.is_finite()) else {
        return "—".to_string();
    };
    let texto = format!("{:.3}", v.abs());
    let (entero, fraccion) = texto.split_once('.').unwrap_or((texto.as_str(), ""));
    let fraccion = fraccion.trim_end_matches('0');
    let signo = if v < 0.0 && (entero != "0" || !fraccion.is_empty()) { "-" } else { "" };
    if fraccion.is_empty() {
        format!("{}{}", signo, agrupar_miles(entero))
    } else {
        format!("{}{}.{}", signo, agrupar_miles(entero), fraccion)
    }
}

/// Porcentaje con decimales fijos; "—" si falta.
pub fn formatear_porcentaje(valor: Option<f64>, decimales: usize) -> String {
    match valor.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.*}%", decimales, v),
        None => "—".to_string(),
    }
}

/// Celda CSV: vacía si falta, con decimales fijos si se piden.
pub fn celda(valor: Option<f64>, decimales: Option<usize>) -> String {
    match (valor.filter(|v| v.is_finite()), decimales) {
        (Some(v), Some(d)) => format!("{:.*}", d, v),
        (Some(v), None) => v.to_string(),
        (None, _) => String::new(),
    }
}

/// Serie con nombre para el gráfico.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serie {
    pub nombre: String,
    pub valores: Vec<Option<f64>>,
}

impl Serie {
    pub fn new(nombre: impl Into<String>, valores: Vec<Option<f64>>) -> Self {
        Serie { nombre: nombre.into(), valores }
    }
}

/// Tarjeta de resumen del reporte.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estadistica {
    pub clave: String,
    pub etiqueta: String,
    pub valor: Option<f64>,
    pub texto: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semaforo: Option<Semaforo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tendencia: Option<Tendencia>,
}

impl Estadistica {
    pub fn numero(clave: &str, etiqueta: &str, valor: Option<f64>) -> Self {
        Estadistica {
            clave: clave.to_string(),
            etiqueta: etiqueta.to_string(),
            valor,
            texto: formatear_numero(valor),
            semaforo: None,
            tendencia: None,
        }
    }

    pub fn porcentaje(clave: &str, etiqueta: &str, valor: Option<f64>) -> Self {
        Estadistica { texto: formatear_porcentaje(valor, 1), ..Estadistica::numero(clave, etiqueta, valor) }
    }

    pub fn con_semaforo(mut self, s: Semaforo) -> Self {
        self.semaforo = Some(s);
        self
    }

    pub fn con_tendencia(mut self, t: Tendencia) -> Self {
        self.tendencia = Some(t);
        self
    }
}

/// Reporte listo para graficar y exportar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reporte {
    pub familia: FamiliaSerie,
    pub titulo: String,
    pub claves: String,
    pub anio: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pista: Option<String>,
    pub meses: Vec<&'static str>,
    pub series: Vec<Serie>,
    pub meta: Option<f64>,
    pub resumen: Vec<Estadistica>,
    /// Filas del CSV: encabezado, doce meses, fila vacía y resumen.
    #[serde(skip)]
    pub filas_csv: Vec<Vec<String>>,
    #[serde(skip)]
    pub archivo_csv: String,
}

impl Reporte {
    pub fn estadistica(&self, clave: &str) -> Option<&Estadistica> {
        self.resumen.iter().find(|e| e.clave == clave)
    }

    pub fn serie(&self, nombre: &str) -> Option<&Serie> {
        self.series.iter().find(|s| s.nombre == nombre)
    }
}

/// Vista de un reporte: datos o aviso explícito de que no hay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "estado", rename_all = "snake_case")]
pub enum VistaReporte {
    Datos(Reporte),
    SinDatos { familia: FamiliaSerie, anio: i32, mensaje: String },
}

impl VistaReporte {
    pub fn sin_datos(familia: FamiliaSerie, anio: i32, que: &str) -> Self {
        VistaReporte::SinDatos { familia, anio, mensaje: format!("No hay datos de {} para {}.", que, anio) }
    }

    pub fn reporte(&self) -> Option<&Reporte> {
        match self {
            VistaReporte::Datos(r) => Some(r),
            VistaReporte::SinDatos { .. } => None,
        }
    }
}
