//! Operaciones del backend relacional de las que depende la capa SMS.
//!
//! `SmsBackend` es la frontera: la lógica de captura y de reportes solo habla
//! con este trait. `sqlite::SqliteStore` es la implementación incluida.

pub mod sqlite;

use crate::error::SmsResult;
use crate::models::{
    Area, CambiosImpactoFauna, CambiosMedicion, FamiliaSerie, ImpactoFauna, Indicador, Medicion, Meta, MetaUpsert,
    NuevaMedicion, NuevoImpactoFauna, PeriodoClave, RegistroCapturaFauna, RegistroDisponibilidad, RegistroLuces,
    RegistroMantenimiento, RegistroPci,
};

pub use sqlite::SqliteStore;

/// Límite de historial mostrado en la pantalla de captura.
pub const HISTORIAL_LIMITE: usize = 12;

pub trait SmsBackend {
    // --- catálogo ---
    fn list_areas(&self) -> SmsResult<Vec<Area>>;
    fn list_indicators(&self) -> SmsResult<Vec<Indicador>>;
    fn get_indicator(&self, id: &str) -> SmsResult<Option<Indicador>>;

    // --- mediciones ordinarias ---
    /// Más recientes primero (año y mes descendentes).
    fn measurement_history(&self, indicador_id: &str, limit: usize) -> SmsResult<Vec<Medicion>>;
    fn find_measurement(&self, clave: &PeriodoClave) -> SmsResult<Option<Medicion>>;
    fn get_measurement(&self, id: i64) -> SmsResult<Option<Medicion>>;
    fn create_measurement(&self, nueva: &NuevaMedicion) -> SmsResult<Medicion>;
    fn update_measurement(&self, id: i64, cambios: &CambiosMedicion) -> SmsResult<Medicion>;
    /// Marca VALIDADO. Devuelve `false` si el registro ya estaba validado
    /// (no se vuelve a sellar validador ni fecha).
    fn mark_validated(&self, id: i64, validado_por: Option<&str>, fecha: &str) -> SmsResult<bool>;
    /// Marca RECHAZADO solo desde PENDIENTE; `false` si no hubo cambio.
    fn mark_rejected(&self, id: i64, rechazado_por: Option<&str>, fecha: &str) -> SmsResult<bool>;

    // --- impactos con fauna ---
    fn fauna_history(&self, indicador_id: &str, limit: usize) -> SmsResult<Vec<ImpactoFauna>>;
    fn find_fauna_impact(&self, indicador_id: &str, anio: i32, mes: u32) -> SmsResult<Option<ImpactoFauna>>;
    fn get_fauna_impact(&self, id: i64) -> SmsResult<Option<ImpactoFauna>>;
    fn create_fauna_impact(&self, nuevo: &NuevoImpactoFauna) -> SmsResult<ImpactoFauna>;
    fn update_fauna_impact(&self, id: i64, cambios: &CambiosImpactoFauna) -> SmsResult<ImpactoFauna>;

    // --- metas ---
    fn targets(&self, indicador_id: &str, anio: i32) -> SmsResult<Vec<Meta>>;
    fn upsert_target(&self, meta: &MetaUpsert) -> SmsResult<Meta>;

    // --- series de reportes ---
    fn pci_series(&self, anio: i32, pista: &str) -> SmsResult<Vec<RegistroPci>>;
    fn availability_series(&self, anio: i32) -> SmsResult<Vec<RegistroDisponibilidad>>;
    fn lighting_series(&self, anio: i32, pista: &str) -> SmsResult<Vec<RegistroLuces>>;
    fn maintenance_series(&self, anio: i32) -> SmsResult<Vec<RegistroMantenimiento>>;
    fn capture_series(&self, anio: i32) -> SmsResult<Vec<RegistroCapturaFauna>>;
    /// Años con datos, del más reciente al más antiguo.
    fn available_years(&self, familia: FamiliaSerie) -> SmsResult<Vec<i32>>;
    fn lighting_tracks(&self) -> SmsResult<Vec<String>>;
}
