use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SmsError, SmsResult};

/// Configuración del servicio, leída del entorno (y de `.env` si existe).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub db_path: PathBuf,
    pub seed_path: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub years_ttl: Duration,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind: "127.0.0.1:8080".to_string(),
            db_path: PathBuf::from("data/sms.db"),
            seed_path: None,
            cache_ttl: Duration::from_secs(300),
            years_ttl: Duration::from_secs(600),
            log_json: false,
        }
    }
}

/// Carga el primer `.env` encontrado desde el directorio actual hacia arriba;
/// las variables ya definidas en el entorno no se sobrescriben.
fn load_dotenv() {
    let _ = dotenv::dotenv();
}

impl AppConfig {
    pub fn from_env() -> SmsResult<Self> {
        load_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Versión parametrizable para pruebas: recibe la función de búsqueda de
    /// variables en lugar de leer el entorno del proceso.
    pub fn from_lookup<F>(lookup: F) -> SmsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AppConfig::default();

        if let Some(bind) = lookup("SMS_BIND").filter(|s| !s.trim().is_empty()) {
            cfg.bind = bind.trim().to_string();
        }

        cfg.db_path = resolve_db_path(lookup("SMS_DB_URL"), lookup("SMS_DB_PATH"))?;

        cfg.seed_path = lookup("SMS_SEED_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        if let Some(v) = lookup("SMS_CACHE_TTL_SECS") {
            cfg.cache_ttl = Duration::from_secs(parse_secs("SMS_CACHE_TTL_SECS", &v)?);
        }
        if let Some(v) = lookup("SMS_YEARS_TTL_SECS") {
            cfg.years_ttl = Duration::from_secs(parse_secs("SMS_YEARS_TTL_SECS", &v)?);
        }

        cfg.log_json = lookup("SMS_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(cfg)
    }
}

fn parse_secs(name: &str, raw: &str) -> SmsResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| SmsError::Configuracion(format!("{} debe ser un entero de segundos, recibido '{}'", name, raw)))
}

/// SMS_DB_URL admite `sqlite://` y `file://`; SMS_DB_PATH es una ruta plana.
/// Si ninguna está definida se usa `data/sms.db`.
fn resolve_db_path(url: Option<String>, path: Option<String>) -> SmsResult<PathBuf> {
    if let Some(p) = path.filter(|s| !s.trim().is_empty()) {
        return Ok(PathBuf::from(p));
    }
    match url.filter(|s| !s.trim().is_empty()) {
        Some(u) if u.starts_with("sqlite://") => Ok(PathBuf::from(u.trim_start_matches("sqlite://"))),
        Some(u) if u.starts_with("file://") => Ok(PathBuf::from(u.trim_start_matches("file://"))),
        Some(u) => Err(SmsError::Configuracion(format!("SMS_DB_URL usa un esquema no soportado: {}", u))),
        None => Ok(PathBuf::from("data/sms.db")),
    }
}
