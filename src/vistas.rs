//! Montaje de vistas: vistas embebidas por contenedor y un único modal de
//! reporte a pantalla completa.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{SmsError, SmsResult};
use crate::models::normalize::id_from;
use crate::models::FamiliaSerie;

pub const META_PCI_DEFAULT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TipoVista {
    PciComparativo,
}

impl TipoVista {
    pub fn parse(raw: &str) -> Option<TipoVista> {
        match raw.trim() {
            "pci-comparativo" => Some(TipoVista::PciComparativo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcionesPci {
    pub indicador_a: Option<String>,
    pub indicador_b: Option<String>,
    pub meta: f64,
}

impl OpcionesPci {
    pub fn from_json(opciones: &Value) -> Self {
        let meta = opciones
            .get("meta")
            .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .filter(|m: &f64| m.is_finite())
            .unwrap_or(META_PCI_DEFAULT);
        OpcionesPci {
            indicador_a: opciones.get("indicadorA").and_then(id_from),
            indicador_b: opciones.get("indicadorB").and_then(id_from),
            meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VistaMontada {
    pub contenedor: String,
    pub tipo: TipoVista,
    pub opciones: OpcionesPci,
    pub montada_en: String,
}

/// Vistas embebidas por id de contenedor.
#[derive(Debug, Default)]
pub struct EmbedRegistry {
    montadas: BTreeMap<String, VistaMontada>,
}

impl EmbedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valida contenedor, tipo y opciones sin tocar el registro.
    pub fn preparar(contenedor: &str, tipo: &str, opciones: &Value) -> SmsResult<VistaMontada> {
        let contenedor = contenedor.trim();
        if contenedor.is_empty() {
            return Err(SmsError::Vista("el contenedor es obligatorio".to_string()));
        }
        let tipo = TipoVista::parse(tipo).ok_or_else(|| SmsError::Vista(format!("tipo de vista desconocido: {}", tipo)))?;
        Ok(VistaMontada {
            contenedor: contenedor.to_string(),
            tipo,
            opciones: OpcionesPci::from_json(opciones),
            montada_en: Utc::now().to_rfc3339(),
        })
    }

    /// Registra una vista ya preparada. Volver a montar en el mismo
    /// contenedor reemplaza la vista anterior.
    pub fn registrar(&mut self, vista: VistaMontada) -> VistaMontada {
        if self.montadas.insert(vista.contenedor.clone(), vista.clone()).is_some() {
            info!(contenedor = %vista.contenedor, "vista reemplazada");
        }
        vista
    }

    /// Monta `tipo` en `contenedor`.
    pub fn montar(&mut self, contenedor: &str, tipo: &str, opciones: &Value) -> SmsResult<VistaMontada> {
        let vista = Self::preparar(contenedor, tipo, opciones)?;
        Ok(self.registrar(vista))
    }

    pub fn desmontar(&mut self, contenedor: &str) -> Option<VistaMontada> {
        self.montadas.remove(contenedor.trim())
    }

    pub fn montada(&self, contenedor: &str) -> Option<&VistaMontada> {
        self.montadas.get(contenedor.trim())
    }

    pub fn len(&self) -> usize {
        self.montadas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.montadas.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalActivo {
    pub id: u64,
    pub familia: FamiliaSerie,
    pub titulo: String,
    pub meta: Option<f64>,
    pub abierto_en: String,
}

/// Dueño del modal activo. Se crea al arrancar y se comparte por referencia;
/// a lo más hay un modal abierto.
#[derive(Debug, Default)]
pub struct OverlayManager {
    activo: Option<ModalActivo>,
    siguiente_id: u64,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abre el modal del reporte. Con un modal ya abierto la petición se
    /// rechaza; hay que cerrarlo primero.
    pub fn abrir(&mut self, familia: FamiliaSerie, titulo: Option<&str>, meta: Option<f64>) -> SmsResult<ModalActivo> {
        if let Some(actual) = &self.activo {
            return Err(SmsError::Vista(format!(
                "ya hay un modal abierto ({}); ciérralo antes de abrir otro",
                actual.familia
            )));
        }
        self.siguiente_id += 1;
        let modal = ModalActivo {
            id: self.siguiente_id,
            familia,
            titulo: titulo
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(familia.titulo())
                .to_string(),
            meta: meta.filter(|m| m.is_finite()).or(familia.meta_default()),
            abierto_en: Utc::now().to_rfc3339(),
        };
        self.activo = Some(modal.clone());
        Ok(modal)
    }

    pub fn cerrar(&mut self) -> Option<ModalActivo> {
        self.activo.take()
    }

    pub fn esta_abierto(&self) -> bool {
        self.activo.is_some()
    }

    pub fn activo(&self) -> Option<&ModalActivo> {
        self.activo.as_ref()
    }
}
