use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::captura::fauna::tasa_impactos;
use crate::error::{SmsError, SmsResult};
use crate::models::normalize::CatalogoSeed;
use crate::models::{
    Area, CambiosImpactoFauna, CambiosMedicion, Escenario, EstatusValidacion, FamiliaSerie, ImpactoFauna, Indicador,
    Medicion, Meta, MetaUpsert, NuevaMedicion, NuevoImpactoFauna, PeriodoClave, RegistroCapturaFauna,
    RegistroDisponibilidad, RegistroLuces, RegistroMantenimiento, RegistroPci,
};
use crate::store::SmsBackend;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS areas (
    id TEXT PRIMARY KEY,
    nombre TEXT NOT NULL,
    activo INTEGER NOT NULL DEFAULT 1,
    orden_visualizacion INTEGER,
    parent_id TEXT
);

CREATE TABLE IF NOT EXISTS indicadores (
    id TEXT PRIMARY KEY,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    alias_json TEXT,
    area_id TEXT,
    area_nombre TEXT,
    parent_area_id TEXT,
    unidad_medida TEXT,
    orden_visualizacion INTEGER,
    activo INTEGER NOT NULL DEFAULT 1,
    requiere_subsistema INTEGER NOT NULL DEFAULT 0,
    clave TEXT
);

CREATE TABLE IF NOT EXISTS mediciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    indicador_id TEXT NOT NULL,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL CHECK (mes BETWEEN 1 AND 12),
    escenario TEXT NOT NULL,
    valor REAL NOT NULL,
    subsistema TEXT,
    estatus_validacion TEXT NOT NULL DEFAULT 'PENDIENTE',
    capturado_por TEXT,
    editado_por TEXT,
    validado_por TEXT,
    fecha_captura TEXT,
    fecha_ultima_edicion TEXT,
    fecha_validacion TEXT,
    rechazado_por TEXT,
    fecha_rechazo TEXT,
    UNIQUE (indicador_id, anio, mes, escenario)
);

CREATE TABLE IF NOT EXISTS impactos_fauna (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    indicador_id TEXT NOT NULL,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL CHECK (mes BETWEEN 1 AND 12),
    total_operaciones INTEGER NOT NULL,
    impactos INTEGER NOT NULL,
    tasa REAL NOT NULL,
    estatus_validacion TEXT NOT NULL DEFAULT 'PENDIENTE',
    capturado_por TEXT,
    editado_por TEXT,
    numero_ediciones INTEGER NOT NULL DEFAULT 0,
    fecha_captura TEXT,
    fecha_ultima_edicion TEXT,
    UNIQUE (indicador_id, anio, mes)
);

CREATE TABLE IF NOT EXISTS metas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    indicador_id TEXT NOT NULL,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL CHECK (mes BETWEEN 1 AND 12),
    escenario TEXT NOT NULL,
    valor REAL NOT NULL,
    capturado_por TEXT,
    editado_por TEXT,
    fecha_captura TEXT,
    fecha_ultima_edicion TEXT,
    UNIQUE (indicador_id, anio, mes, escenario)
);

CREATE TABLE IF NOT EXISTS pci_mediciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    pista TEXT NOT NULL,
    valor_pci REAL,
    UNIQUE (anio, mes, pista)
);

CREATE TABLE IF NOT EXISTS disponibilidad_pistas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    pista TEXT NOT NULL,
    porcentaje_disponibilidad REAL,
    UNIQUE (anio, mes, pista)
);

CREATE TABLE IF NOT EXISTS luces_mediciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    pista TEXT NOT NULL,
    luces_operativas REAL,
    luces_totales REAL,
    porcentaje_operativas REAL,
    UNIQUE (anio, mes, pista)
);

CREATE TABLE IF NOT EXISTS mantenimientos_pavimentos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    programados REAL,
    realizados REAL,
    porcentaje_cumplimiento REAL,
    UNIQUE (anio, mes)
);

CREATE TABLE IF NOT EXISTS capturas_fauna (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    tipo_fauna TEXT NOT NULL,
    cantidad REAL NOT NULL,
    UNIQUE (anio, mes, tipo_fauna)
);
";

const MEDICION_COLS: &str = "id, indicador_id, anio, mes, escenario, valor, subsistema, estatus_validacion, \
     capturado_por, editado_por, validado_por, fecha_captura, fecha_ultima_edicion, fecha_validacion, \
     rechazado_por, fecha_rechazo";

const FAUNA_COLS: &str = "id, indicador_id, anio, mes, total_operaciones, impactos, tasa, estatus_validacion, \
     capturado_por, editado_por, numero_ediciones, fecha_captura, fecha_ultima_edicion";

const META_COLS: &str = "id, indicador_id, anio, mes, escenario, valor, capturado_por, editado_por";

const INDICADOR_COLS: &str = "id, nombre, descripcion, alias_json, area_id, area_nombre, parent_area_id, \
     unidad_medida, orden_visualizacion, activo, requiere_subsistema, clave";

/// Backend SMS sobre SQLite. La conexión no es `Sync`; el servidor la
/// comparte detrás de un `Mutex`.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteStore(..)")
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn escenario_col(row: &Row, idx: usize) -> rusqlite::Result<Escenario> {
    let raw: String = row.get(idx)?;
    Escenario::parse(&raw).ok_or_else(|| conversion_err(idx, format!("escenario desconocido: {}", raw)))
}

fn estatus_col(row: &Row, idx: usize) -> rusqlite::Result<EstatusValidacion> {
    let raw: String = row.get(idx)?;
    EstatusValidacion::parse(&raw).ok_or_else(|| conversion_err(idx, format!("estatus desconocido: {}", raw)))
}

fn medicion_from_row(row: &Row) -> rusqlite::Result<Medicion> {
    Ok(Medicion {
        id: row.get(0)?,
        indicador_id: row.get(1)?,
        anio: row.get(2)?,
        mes: row.get(3)?,
        escenario: escenario_col(row, 4)?,
        valor: row.get(5)?,
        subsistema: row.get(6)?,
        estatus_validacion: estatus_col(row, 7)?,
        capturado_por: row.get(8)?,
        editado_por: row.get(9)?,
        validado_por: row.get(10)?,
        fecha_captura: row.get(11)?,
        fecha_ultima_edicion: row.get(12)?,
        fecha_validacion: row.get(13)?,
        rechazado_por: row.get(14)?,
        fecha_rechazo: row.get(15)?,
    })
}

fn fauna_from_row(row: &Row) -> rusqlite::Result<ImpactoFauna> {
    Ok(ImpactoFauna {
        id: row.get(0)?,
        indicador_id: row.get(1)?,
        anio: row.get(2)?,
        mes: row.get(3)?,
        total_operaciones: row.get(4)?,
        impactos: row.get(5)?,
        tasa: row.get(6)?,
        estatus_validacion: estatus_col(row, 7)?,
        capturado_por: row.get(8)?,
        editado_por: row.get(9)?,
        numero_ediciones: row.get(10)?,
        fecha_captura: row.get(11)?,
        fecha_ultima_edicion: row.get(12)?,
    })
}

fn meta_from_row(row: &Row) -> rusqlite::Result<Meta> {
    Ok(Meta {
        id: row.get(0)?,
        indicador_id: row.get(1)?,
        anio: row.get(2)?,
        mes: row.get(3)?,
        escenario: escenario_col(row, 4)?,
        valor: row.get(5)?,
        capturado_por: row.get(6)?,
        editado_por: row.get(7)?,
    })
}

fn indicador_from_row(row: &Row) -> rusqlite::Result<Indicador> {
    let alias_json: Option<String> = row.get(3)?;
    let alias = match alias_json {
        Some(s) => serde_json::from_str::<Vec<String>>(&s).map_err(|e| conversion_err(3, e.to_string()))?,
        None => Vec::new(),
    };
    Ok(Indicador {
        id: row.get(0)?,
        nombre: row.get(1)?,
        descripcion: row.get(2)?,
        alias,
        area_id: row.get(4)?,
        area_nombre: row.get(5)?,
        parent_area_id: row.get(6)?,
        unidad_medida: row.get(7)?,
        orden_visualizacion: row.get(8)?,
        activo: row.get(9)?,
        requiere_subsistema: row.get(10)?,
        clave: row.get(11)?,
    })
}

/// Las violaciones de UNIQUE se reportan como conflicto; lo demás como error
/// de backend.
fn map_write_err(err: rusqlite::Error, contexto: &str) -> SmsError {
    if SmsError::es_violacion_unicidad(&err) {
        SmsError::Conflicto(format!("ya existe un registro para {}", contexto))
    } else {
        SmsError::Backend(err)
    }
}

impl SqliteStore {
    /// Abre (o crea) la base en disco y asegura el esquema.
    pub fn open<P: AsRef<Path>>(path: P) -> SmsResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        info!(path = %path.display(), "base SMS abierta");
        Ok(store)
    }

    pub fn open_in_memory() -> SmsResult<Self> {
        let store = SqliteStore { conn: Connection::open_in_memory()? };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> SmsResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        // Bases creadas antes de separar los datos de rechazo.
        for columna in ["rechazado_por", "fecha_rechazo"] {
            self.add_column_if_missing("mediciones", columna)?;
        }
        Ok(())
    }

    fn add_column_if_missing(&self, tabla: &str, columna: &str) -> SmsResult<()> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", tabla))?;
        let columnas = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if !columnas.iter().any(|c| c == columna) {
            self.conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} TEXT", tabla, columna))?;
            info!(tabla, columna, "columna agregada");
        }
        Ok(())
    }

    // --- carga de catálogo y series (fuera del trait: los usa el arranque) ---

    pub fn upsert_area(&self, area: &Area) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO areas (id, nombre, activo, orden_visualizacion, parent_id) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET nombre = excluded.nombre, activo = excluded.activo,
                 orden_visualizacion = excluded.orden_visualizacion, parent_id = excluded.parent_id",
            params![area.id, area.nombre, area.activo, area.orden_visualizacion, area.parent_id],
        )?;
        Ok(())
    }

    pub fn upsert_indicator(&self, ind: &Indicador) -> SmsResult<()> {
        let alias_json = if ind.alias.is_empty() { None } else { Some(serde_json::to_string(&ind.alias)?) };
        self.conn.execute(
            "INSERT INTO indicadores (id, nombre, descripcion, alias_json, area_id, area_nombre, parent_area_id,
                 unidad_medida, orden_visualizacion, activo, requiere_subsistema, clave)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET nombre = excluded.nombre, descripcion = excluded.descripcion,
                 alias_json = excluded.alias_json, area_id = excluded.area_id, area_nombre = excluded.area_nombre,
                 parent_area_id = excluded.parent_area_id, unidad_medida = excluded.unidad_medida,
                 orden_visualizacion = excluded.orden_visualizacion, activo = excluded.activo,
                 requiere_subsistema = excluded.requiere_subsistema, clave = excluded.clave",
            params![
                ind.id,
                ind.nombre,
                ind.descripcion,
                alias_json,
                ind.area_id,
                ind.area_nombre,
                ind.parent_area_id,
                ind.unidad_medida,
                ind.orden_visualizacion,
                ind.activo,
                ind.requiere_subsistema,
                ind.clave,
            ],
        )?;
        Ok(())
    }

    /// Inserta una medición histórica conservando su estatus. Si ya existe
    /// una para el mismo periodo se deja la existente.
    pub fn import_measurement(&self, m: &Medicion) -> SmsResult<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO mediciones (indicador_id, anio, mes, escenario, valor, subsistema, estatus_validacion,
                 capturado_por, editado_por, validado_por, fecha_captura, fecha_ultima_edicion, fecha_validacion,
                 rechazado_por, fecha_rechazo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                m.indicador_id,
                m.anio,
                m.mes,
                m.escenario.as_str(),
                m.valor,
                m.subsistema,
                m.estatus_validacion.as_str(),
                m.capturado_por,
                m.editado_por,
                m.validado_por,
                m.fecha_captura,
                m.fecha_ultima_edicion,
                m.fecha_validacion,
                m.rechazado_por,
                m.fecha_rechazo,
            ],
        )?;
        Ok(n > 0)
    }

    /// Carga un catálogo normalizado en una sola transacción.
    pub fn import_catalog(&self, seed: &CatalogoSeed) -> SmsResult<(usize, usize, usize)> {
        let tx = self.conn.unchecked_transaction()?;
        for a in &seed.areas {
            self.upsert_area(a)?;
        }
        for i in &seed.indicadores {
            self.upsert_indicator(i)?;
        }
        let mut nuevas = 0usize;
        for m in &seed.mediciones {
            if self.import_measurement(m)? {
                nuevas += 1;
            }
        }
        tx.commit()?;
        info!(areas = seed.areas.len(), indicadores = seed.indicadores.len(), mediciones = nuevas, "catálogo importado");
        Ok((seed.areas.len(), seed.indicadores.len(), nuevas))
    }

    pub fn record_pci(&self, r: &RegistroPci) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO pci_mediciones (anio, mes, pista, valor_pci) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(anio, mes, pista) DO UPDATE SET valor_pci = excluded.valor_pci",
            params![r.anio, r.mes, r.pista, r.valor_pci],
        )?;
        Ok(())
    }

    pub fn record_availability(&self, r: &RegistroDisponibilidad) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO disponibilidad_pistas (anio, mes, pista, porcentaje_disponibilidad) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(anio, mes, pista) DO UPDATE SET porcentaje_disponibilidad = excluded.porcentaje_disponibilidad",
            params![r.anio, r.mes, r.pista, r.porcentaje_disponibilidad],
        )?;
        Ok(())
    }

    pub fn record_lighting(&self, r: &RegistroLuces) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO luces_mediciones (anio, mes, pista, luces_operativas, luces_totales, porcentaje_operativas)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(anio, mes, pista) DO UPDATE SET luces_operativas = excluded.luces_operativas,
                 luces_totales = excluded.luces_totales, porcentaje_operativas = excluded.porcentaje_operativas",
            params![r.anio, r.mes, r.pista, r.luces_operativas, r.luces_totales, r.porcentaje_operativas],
        )?;
        Ok(())
    }

    pub fn record_maintenance(&self, r: &RegistroMantenimiento) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO mantenimientos_pavimentos (anio, mes, programados, realizados, porcentaje_cumplimiento)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(anio, mes) DO UPDATE SET programados = excluded.programados,
                 realizados = excluded.realizados, porcentaje_cumplimiento = excluded.porcentaje_cumplimiento",
            params![r.anio, r.mes, r.programados, r.realizados, r.porcentaje_cumplimiento],
        )?;
        Ok(())
    }

    pub fn record_capture(&self, r: &RegistroCapturaFauna) -> SmsResult<()> {
        self.conn.execute(
            "INSERT INTO capturas_fauna (anio, mes, tipo_fauna, cantidad) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(anio, mes, tipo_fauna) DO UPDATE SET cantidad = excluded.cantidad",
            params![r.anio, r.mes, r.tipo_fauna, r.cantidad],
        )?;
        Ok(())
    }

    fn exists(&self, table: &str, id: i64) -> SmsResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table);
        Ok(self.conn.query_row(&sql, params![id], |_| Ok(())).optional()?.is_some())
    }
}

impl SmsBackend for SqliteStore {
    fn list_areas(&self) -> SmsResult<Vec<Area>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, nombre, activo, orden_visualizacion, parent_id FROM areas ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Area {
                id: row.get(0)?,
                nombre: row.get(1)?,
                activo: row.get(2)?,
                orden_visualizacion: row.get(3)?,
                parent_id: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn list_indicators(&self) -> SmsResult<Vec<Indicador>> {
        let sql = format!("SELECT {} FROM indicadores ORDER BY id", INDICADOR_COLS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], indicador_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_indicator(&self, id: &str) -> SmsResult<Option<Indicador>> {
        let sql = format!("SELECT {} FROM indicadores WHERE id = ?1", INDICADOR_COLS);
        Ok(self.conn.query_row(&sql, params![id], indicador_from_row).optional()?)
    }

    fn measurement_history(&self, indicador_id: &str, limit: usize) -> SmsResult<Vec<Medicion>> {
        let sql = format!(
            "SELECT {} FROM mediciones WHERE indicador_id = ?1 ORDER BY anio DESC, mes DESC, escenario LIMIT ?2",
            MEDICION_COLS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![indicador_id, limit as i64], medicion_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_measurement(&self, clave: &PeriodoClave) -> SmsResult<Option<Medicion>> {
        let sql = format!(
            "SELECT {} FROM mediciones WHERE indicador_id = ?1 AND anio = ?2 AND mes = ?3 AND escenario = ?4",
            MEDICION_COLS
        );
        Ok(self
            .conn
            .query_row(
                &sql,
                params![clave.indicador_id, clave.anio, clave.mes, clave.escenario.as_str()],
                medicion_from_row,
            )
            .optional()?)
    }

    fn get_measurement(&self, id: i64) -> SmsResult<Option<Medicion>> {
        let sql = format!("SELECT {} FROM mediciones WHERE id = ?1", MEDICION_COLS);
        Ok(self.conn.query_row(&sql, params![id], medicion_from_row).optional()?)
    }

    fn create_measurement(&self, nueva: &NuevaMedicion) -> SmsResult<Medicion> {
        let ts = now_rfc3339();
        self.conn
            .execute(
                "INSERT INTO mediciones (indicador_id, anio, mes, escenario, valor, subsistema, estatus_validacion,
                     capturado_por, fecha_captura)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    nueva.indicador_id,
                    nueva.anio,
                    nueva.mes,
                    nueva.escenario.as_str(),
                    nueva.valor,
                    nueva.subsistema,
                    nueva.estatus_validacion.as_str(),
                    nueva.capturado_por,
                    ts,
                ],
            )
            .map_err(|e| map_write_err(e, &format!("{}/{:02} {}", nueva.anio, nueva.mes, nueva.escenario)))?;
        let id = self.conn.last_insert_rowid();
        debug!(id, indicador = %nueva.indicador_id, "medición insertada");
        self.get_measurement(id)?
            .ok_or_else(|| SmsError::NoEncontrado(format!("medición {}", id)))
    }

    fn update_measurement(&self, id: i64, c: &CambiosMedicion) -> SmsResult<Medicion> {
        let n = self
            .conn
            .execute(
                "UPDATE mediciones SET anio = ?1, mes = ?2, escenario = ?3, valor = ?4, subsistema = ?5,
                     editado_por = ?6, estatus_validacion = ?7, validado_por = ?8, fecha_validacion = ?9,
                     fecha_ultima_edicion = ?10, rechazado_por = NULL, fecha_rechazo = NULL
                 WHERE id = ?11",
                params![
                    c.anio,
                    c.mes,
                    c.escenario.as_str(),
                    c.valor,
                    c.subsistema,
                    c.editado_por,
                    c.estatus_validacion.as_str(),
                    c.validado_por,
                    c.fecha_validacion,
                    c.fecha_ultima_edicion,
                    id,
                ],
            )
            .map_err(|e| map_write_err(e, &format!("{}/{:02} {}", c.anio, c.mes, c.escenario)))?;
        if n == 0 {
            return Err(SmsError::NoEncontrado(format!("medición {}", id)));
        }
        self.get_measurement(id)?
            .ok_or_else(|| SmsError::NoEncontrado(format!("medición {}", id)))
    }

    fn mark_validated(&self, id: i64, validado_por: Option<&str>, fecha: &str) -> SmsResult<bool> {
        // El filtro por estatus evita sellar dos veces la misma validación.
        let n = self.conn.execute(
            "UPDATE mediciones SET estatus_validacion = 'VALIDADO', validado_por = ?1, fecha_validacion = ?2,
                 rechazado_por = NULL, fecha_rechazo = NULL
             WHERE id = ?3 AND estatus_validacion <> 'VALIDADO'",
            params![validado_por, fecha, id],
        )?;
        if n == 0 && !self.exists("mediciones", id)? {
            return Err(SmsError::NoEncontrado(format!("medición {}", id)));
        }
        Ok(n > 0)
    }

    fn mark_rejected(&self, id: i64, rechazado_por: Option<&str>, fecha: &str) -> SmsResult<bool> {
        let n = self.conn.execute(
            "UPDATE mediciones SET estatus_validacion = 'RECHAZADO', rechazado_por = ?1, fecha_rechazo = ?2,
                 validado_por = NULL, fecha_validacion = NULL
             WHERE id = ?3 AND estatus_validacion = 'PENDIENTE'",
            params![rechazado_por, fecha, id],
        )?;
        if n == 0 && !self.exists("mediciones", id)? {
            return Err(SmsError::NoEncontrado(format!("medición {}", id)));
        }
        Ok(n > 0)
    }

    fn fauna_history(&self, indicador_id: &str, limit: usize) -> SmsResult<Vec<ImpactoFauna>> {
        let sql = format!(
            "SELECT {} FROM impactos_fauna WHERE indicador_id = ?1 ORDER BY anio DESC, mes DESC LIMIT ?2",
            FAUNA_COLS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![indicador_id, limit as i64], fauna_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_fauna_impact(&self, indicador_id: &str, anio: i32, mes: u32) -> SmsResult<Option<ImpactoFauna>> {
        let sql = format!("SELECT {} FROM impactos_fauna WHERE indicador_id = ?1 AND anio = ?2 AND mes = ?3", FAUNA_COLS);
        Ok(self.conn.query_row(&sql, params![indicador_id, anio, mes], fauna_from_row).optional()?)
    }

    fn get_fauna_impact(&self, id: i64) -> SmsResult<Option<ImpactoFauna>> {
        let sql = format!("SELECT {} FROM impactos_fauna WHERE id = ?1", FAUNA_COLS);
        Ok(self.conn.query_row(&sql, params![id], fauna_from_row).optional()?)
    }

    fn create_fauna_impact(&self, nuevo: &NuevoImpactoFauna) -> SmsResult<ImpactoFauna> {
        let tasa = tasa_impactos(nuevo.total_operaciones, nuevo.impactos);
        self.conn
            .execute(
                "INSERT INTO impactos_fauna (indicador_id, anio, mes, total_operaciones, impactos, tasa,
                     estatus_validacion, capturado_por, fecha_captura)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDIENTE', ?7, ?8)",
                params![
                    nuevo.indicador_id,
                    nuevo.anio,
                    nuevo.mes,
                    nuevo.total_operaciones,
                    nuevo.impactos,
                    tasa,
                    nuevo.capturado_por,
                    now_rfc3339(),
                ],
            )
            .map_err(|e| map_write_err(e, &format!("{}/{:02}", nuevo.anio, nuevo.mes)))?;
        let id = self.conn.last_insert_rowid();
        self.get_fauna_impact(id)?
            .ok_or_else(|| SmsError::NoEncontrado(format!("impacto de fauna {}", id)))
    }

    fn update_fauna_impact(&self, id: i64, c: &CambiosImpactoFauna) -> SmsResult<ImpactoFauna> {
        let tasa = tasa_impactos(c.total_operaciones, c.impactos);
        let n = self
            .conn
            .execute(
                "UPDATE impactos_fauna SET anio = ?1, mes = ?2, total_operaciones = ?3, impactos = ?4, tasa = ?5,
                     editado_por = ?6, fecha_ultima_edicion = ?7, numero_ediciones = ?8
                 WHERE id = ?9",
                params![
                    c.anio,
                    c.mes,
                    c.total_operaciones,
                    c.impactos,
                    tasa,
                    c.editado_por,
                    c.fecha_ultima_edicion,
                    c.numero_ediciones,
                    id,
                ],
            )
            .map_err(|e| map_write_err(e, &format!("{}/{:02}", c.anio, c.mes)))?;
        if n == 0 {
            return Err(SmsError::NoEncontrado(format!("impacto de fauna {}", id)));
        }
        self.get_fauna_impact(id)?
            .ok_or_else(|| SmsError::NoEncontrado(format!("impacto de fauna {}", id)))
    }

    fn targets(&self, indicador_id: &str, anio: i32) -> SmsResult<Vec<Meta>> {
        let sql = format!(
            "SELECT {} FROM metas WHERE indicador_id = ?1 AND anio = ?2 ORDER BY mes, escenario",
            META_COLS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![indicador_id, anio], meta_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn upsert_target(&self, meta: &MetaUpsert) -> SmsResult<Meta> {
        let ts = now_rfc3339();
        let contexto = format!("meta {}/{:02} {}", meta.anio, meta.mes, meta.escenario);
        match meta.id {
            Some(id) => {
                let n = self
                    .conn
                    .execute(
                        "UPDATE metas SET anio = ?1, mes = ?2, escenario = ?3, valor = ?4, editado_por = ?5,
                             fecha_ultima_edicion = ?6
                         WHERE id = ?7",
                        params![meta.anio, meta.mes, meta.escenario.as_str(), meta.valor, meta.editado_por, ts, id],
                    )
                    .map_err(|e| map_write_err(e, &contexto))?;
                if n == 0 {
                    return Err(SmsError::NoEncontrado(format!("meta {}", id)));
                }
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO metas (indicador_id, anio, mes, escenario, valor, capturado_por, fecha_captura)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(indicador_id, anio, mes, escenario) DO UPDATE SET valor = excluded.valor,
                             editado_por = excluded.capturado_por, fecha_ultima_edicion = excluded.fecha_captura",
                        params![
                            meta.indicador_id,
                            meta.anio,
                            meta.mes,
                            meta.escenario.as_str(),
                            meta.valor,
                            meta.capturado_por,
                            ts,
                        ],
                    )
                    .map_err(|e| map_write_err(e, &contexto))?;
            }
        }
        let sql = format!(
            "SELECT {} FROM metas WHERE indicador_id = ?1 AND anio = ?2 AND mes = ?3 AND escenario = ?4",
            META_COLS
        );
        Ok(self.conn.query_row(
            &sql,
            params![meta.indicador_id, meta.anio, meta.mes, meta.escenario.as_str()],
            meta_from_row,
        )?)
    }

    fn pci_series(&self, anio: i32, pista: &str) -> SmsResult<Vec<RegistroPci>> {
        let mut stmt = self
            .conn
            .prepare("SELECT anio, mes, pista, valor_pci FROM pci_mediciones WHERE anio = ?1 AND pista = ?2 ORDER BY mes")?;
        let rows = stmt.query_map(params![anio, pista], |row| {
            Ok(RegistroPci { anio: row.get(0)?, mes: row.get(1)?, pista: row.get(2)?, valor_pci: row.get(3)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn availability_series(&self, anio: i32) -> SmsResult<Vec<RegistroDisponibilidad>> {
        let mut stmt = self.conn.prepare(
            "SELECT anio, mes, pista, porcentaje_disponibilidad FROM disponibilidad_pistas WHERE anio = ?1
             ORDER BY mes, pista",
        )?;
        let rows = stmt.query_map(params![anio], |row| {
            Ok(RegistroDisponibilidad {
                anio: row.get(0)?,
                mes: row.get(1)?,
                pista: row.get(2)?,
                porcentaje_disponibilidad: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn lighting_series(&self, anio: i32, pista: &str) -> SmsResult<Vec<RegistroLuces>> {
        let mut stmt = self.conn.prepare(
            "SELECT anio, mes, pista, luces_operativas, luces_totales, porcentaje_operativas FROM luces_mediciones
             WHERE anio = ?1 AND pista = ?2 ORDER BY mes",
        )?;
        let rows = stmt.query_map(params![anio, pista], |row| {
            Ok(RegistroLuces {
                anio: row.get(0)?,
                mes: row.get(1)?,
                pista: row.get(2)?,
                luces_operativas: row.get(3)?,
                luces_totales: row.get(4)?,
                porcentaje_operativas: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn maintenance_series(&self, anio: i32) -> SmsResult<Vec<RegistroMantenimiento>> {
        let mut stmt = self.conn.prepare(
            "SELECT anio, mes, programados, realizados, porcentaje_cumplimiento FROM mantenimientos_pavimentos
             WHERE anio = ?1 ORDER BY mes",
        )?;
        let rows = stmt.query_map(params![anio], |row| {
            Ok(RegistroMantenimiento {
                anio: row.get(0)?,
                mes: row.get(1)?,
                programados: row.get(2)?,
                realizados: row.get(3)?,
                porcentaje_cumplimiento: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn capture_series(&self, anio: i32) -> SmsResult<Vec<RegistroCapturaFauna>> {
        let mut stmt = self
            .conn
            .prepare("SELECT anio, mes, tipo_fauna, cantidad FROM capturas_fauna WHERE anio = ?1 ORDER BY mes, tipo_fauna")?;
        let rows = stmt.query_map(params![anio], |row| {
            Ok(RegistroCapturaFauna { anio: row.get(0)?, mes: row.get(1)?, tipo_fauna: row.get(2)?, cantidad: row.get(3)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn available_years(&self, familia: FamiliaSerie) -> SmsResult<Vec<i32>> {
        let table = match familia {
            FamiliaSerie::Pci => "pci_mediciones",
            FamiliaSerie::DisponibilidadPistas => "disponibilidad_pistas",
            FamiliaSerie::Iluminacion => "luces_mediciones",
            FamiliaSerie::Mantenimientos => "mantenimientos_pavimentos",
            FamiliaSerie::CapturasFauna => "capturas_fauna",
        };
        let sql = format!("SELECT DISTINCT anio FROM {} ORDER BY anio DESC", table);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, i32>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn lighting_tracks(&self) -> SmsResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT pista FROM luces_mediciones ORDER BY pista")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
