//! Alcance de acceso: qué áreas e indicadores ve cada usuario y qué acciones
//! privilegiadas (validar, gestionar metas) puede ejecutar.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{Area, Indicador, Perfil};
use crate::text::normalize_text;

/// Capacidades derivadas de la etiqueta de rol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rol {
    pub admin: bool,
    pub subdirector: bool,
}

impl Rol {
    /// Coincidencia por subcadena, sin mayúsculas ni acentos:
    /// "Administrador" -> admin, "Subdirectora de Operación" / "Director" -> subdirector.
    pub fn from_label(label: &str) -> Rol {
        let norm = normalize_text(label);
        Rol {
            admin: norm.contains("admin"),
            subdirector: norm.contains("subdirector") || norm.contains("director"),
        }
    }

    pub fn es_elevado(&self) -> bool {
        self.admin || self.subdirector
    }

    pub fn puede_validar(&self) -> bool {
        self.es_elevado()
    }

    pub fn puede_gestionar_metas(&self) -> bool {
        self.es_elevado()
    }
}

/// Usuario que realiza la operación, con su rol ya resuelto.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solicitante {
    pub perfil: Perfil,
    pub rol: Rol,
}

impl Solicitante {
    pub fn new(perfil: Perfil) -> Self {
        let rol = Rol::from_label(&perfil.rol);
        Solicitante { perfil, rol }
    }

    pub fn id(&self) -> Option<String> {
        self.perfil.id.clone()
    }

    /// Unión de área propia, id del objeto área y subdirección.
    pub fn areas_permitidas(&self) -> BTreeSet<String> {
        [&self.perfil.area_id, &self.perfil.area_obj_id, &self.perfil.subdireccion_id]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn puede_ver_indicador(&self, indicador: &Indicador) -> bool {
        puede_ver(indicador, &self.areas_permitidas(), self.rol.admin)
    }
}

/// Regla de visibilidad de un indicador.
///
/// Un no administrador sin áreas asignadas ve todo el catálogo; con áreas
/// asignadas, el indicador debe compartir al menos un id candidato.
pub fn puede_ver(indicador: &Indicador, permitidas: &BTreeSet<String>, es_admin: bool) -> bool {
    if es_admin || permitidas.is_empty() {
        return true;
    }
    let candidatos = indicador.area_candidates();
    !candidatos.is_empty() && candidatos.iter().any(|id| permitidas.contains(id))
}

fn orden_visual(orden_a: Option<i64>, nombre_a: &str, orden_b: Option<i64>, nombre_b: &str) -> Ordering {
    let a = orden_a.unwrap_or(i64::MAX);
    let b = orden_b.unwrap_or(i64::MAX);
    a.cmp(&b).then_with(|| nombre_a.to_lowercase().cmp(&nombre_b.to_lowercase()))
}

/// Áreas activas visibles para el solicitante, ordenadas para mostrarse.
pub fn areas_visibles(areas: &[Area], solicitante: &Solicitante) -> Vec<Area> {
    let permitidas = solicitante.areas_permitidas();
    let mut out: Vec<Area> = areas
        .iter()
        .filter(|a| a.activo)
        .filter(|a| solicitante.rol.admin || permitidas.is_empty() || permitidas.contains(&a.id))
        .cloned()
        .collect();
    out.sort_by(|a, b| orden_visual(a.orden_visualizacion, &a.nombre, b.orden_visualizacion, &b.nombre));
    out
}

/// Indicadores activos visibles, opcionalmente restringidos al área elegida.
pub fn indicadores_visibles(indicadores: &[Indicador], solicitante: &Solicitante, area: Option<&str>) -> Vec<Indicador> {
    let permitidas = solicitante.areas_permitidas();
    let mut out: Vec<Indicador> = indicadores
        .iter()
        .filter(|i| puede_ver(i, &permitidas, solicitante.rol.admin))
        .filter(|i| match area {
            Some(a) if !a.trim().is_empty() => i.area_candidates().contains(a.trim()),
            _ => true,
        })
        .filter(|i| i.activo)
        .cloned()
        .collect();
    out.sort_by(|a, b| orden_visual(a.orden_visualizacion, &a.nombre, b.orden_visualizacion, &b.nombre));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicador(id: &str, area: &str, orden: Option<i64>, nombre: &str) -> Indicador {
        Indicador {
            id: id.into(),
            nombre: nombre.into(),
            area_id: Some(area.into()),
            orden_visualizacion: orden,
            activo: true,
            ..Default::default()
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roles_por_subcadena() {
        assert!(Rol::from_label("ADMINISTRADOR").admin);
        assert!(Rol::from_label("Subdirección Técnica - subdirector").subdirector);
        assert!(Rol::from_label("Director de área").es_elevado());
        assert!(!Rol::from_label("Capturista").es_elevado());
    }

    #[test]
    fn visibilidad_por_interseccion() {
        let ind = indicador("1", "7", None, "PCI");
        assert!(puede_ver(&ind, &set(&["7", "9"]), false));
        assert!(!puede_ver(&ind, &set(&["3"]), false));
        assert!(puede_ver(&ind, &set(&["3"]), true));
    }

    #[test]
    fn orden_por_campo_y_nombre() {
        let solicitante = Solicitante::new(Perfil { rol: "admin".into(), ..Default::default() });
        let lista = vec![
            indicador("1", "7", Some(2), "b"),
            indicador("2", "7", None, "a"),
            indicador("3", "7", Some(1), "z"),
            indicador("4", "7", Some(2), "A"),
        ];
        let ids: Vec<String> = indicadores_visibles(&lista, &solicitante, None).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["3", "4", "1", "2"]);
    }
}
