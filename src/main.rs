// --- Indicadores SMS - Archivo principal ---

use std::io;

use aifa_sms::models::normalize::CatalogoSeed;
use aifa_sms::store::SqliteStore;
use aifa_sms::{init_tracing, run_server, AppConfig, AppState, SmsError, SmsResult};
use tracing::{info, warn};

fn a_io(e: SmsError) -> io::Error {
    io::Error::other(e.to_string())
}

/// Carga el catálogo inicial si `SMS_SEED_PATH` apunta a un JSON.
fn sembrar(store: &SqliteStore, config: &AppConfig) -> SmsResult<()> {
    let Some(path) = &config.seed_path else {
        return Ok(());
    };
    let texto = std::fs::read_to_string(path)?;
    let seed = CatalogoSeed::parse(&texto)?;
    let (areas, indicadores, mediciones) = store.import_catalog(&seed)?;
    info!(path = %path.display(), areas, indicadores, mediciones, "catálogo importado");
    Ok(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::from_env().map_err(a_io)?;
    init_tracing(config.log_json);

    info!(db = %config.db_path.display(), "=== Indicadores SMS (API) ===");
    let store = SqliteStore::open(&config.db_path).map_err(a_io)?;
    if let Err(e) = sembrar(&store, &config) {
        warn!(error = %e, "no se pudo importar el catálogo inicial");
    }

    run_server(AppState::new(store, config)).await
}
