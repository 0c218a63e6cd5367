//! Caché de respuestas en memoria con vigencia por entrada.
//!
//! La clave es (entidad, parámetros) en texto; ver `claves`. Las mutaciones
//! invalidan las claves afectadas para que la siguiente lectura vuelva al
//! backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SmsResult;

struct Entrada {
    guardada: Instant,
    vigencia: Duration,
    valor: Arc<Value>,
}

impl Entrada {
    fn vigente(&self, ahora: Instant) -> bool {
        ahora.duration_since(self.guardada) < self.vigencia
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entradas: usize,
}

pub struct QueryCache {
    entradas: Mutex<HashMap<String, Entrada>>,
    vigencia: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(vigencia: Duration) -> Self {
        QueryCache {
            entradas: Mutex::new(HashMap::new()),
            vigencia,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entrada>> {
        // Un pánico con el candado tomado no deja el mapa a medias.
        self.entradas.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Valor vigente en caché o, si no hay, el resultado de `fetch`. Los
    /// errores no se guardan.
    pub fn get_or_fetch<F>(&self, clave: &str, vigencia: Option<Duration>, fetch: F) -> SmsResult<Arc<Value>>
    where
        F: FnOnce() -> SmsResult<Value>,
    {
        let ahora = Instant::now();
        if let Some(e) = self.lock().get(clave) {
            if e.vigente(ahora) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(clave, "cache hit");
                return Ok(Arc::clone(&e.valor));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(clave, "cache miss");

        let valor = Arc::new(fetch()?);
        self.lock().insert(
            clave.to_string(),
            Entrada { guardada: Instant::now(), vigencia: vigencia.unwrap_or(self.vigencia), valor: Arc::clone(&valor) },
        );
        Ok(valor)
    }

    pub fn invalidate(&self, clave: &str) -> bool {
        self.lock().remove(clave).is_some()
    }

    /// Quita todas las claves que empiezan con `prefijo`.
    pub fn invalidate_prefix(&self, prefijo: &str) -> usize {
        let mut guard = self.lock();
        let antes = guard.len();
        guard.retain(|k, _| !k.starts_with(prefijo));
        let quitadas = antes - guard.len();
        if quitadas > 0 {
            debug!(prefijo, quitadas, "cache invalidado");
        }
        quitadas
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let ahora = Instant::now();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entradas: self.lock().values().filter(|e| e.vigente(ahora)).count(),
        }
    }
}

/// Constructores de claves de caché.
pub mod claves {
    use crate::models::FamiliaSerie;

    pub fn historial(indicador_id: &str) -> String {
        format!("historial:{}", indicador_id)
    }

    pub fn metas(indicador_id: &str, anio: i32) -> String {
        format!("metas:{}:{}", indicador_id, anio)
    }

    pub fn metas_prefijo(indicador_id: &str) -> String {
        format!("metas:{}:", indicador_id)
    }

    pub fn reporte(familia: FamiliaSerie, anio: i32, pista: Option<&str>, meta: Option<f64>) -> String {
        format!(
            "reporte:{}:{}:{}:{}",
            familia.slug(),
            anio,
            pista.unwrap_or("-"),
            meta.map(|m| m.to_string()).unwrap_or_else(|| "-".into())
        )
    }

    pub fn anios(familia: FamiliaSerie) -> String {
        format!("anios:{}", familia.slug())
    }

    pub const PISTAS_ILUMINACION: &str = "pistas:iluminacion";
}
