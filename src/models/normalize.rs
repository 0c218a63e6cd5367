//! Adaptador de payloads crudos.
//!
//! El backend y la capa de autenticación entregan filas con nombres de campo
//! inconsistentes (`area_id`, `areaId`, `area.id`, ...). Este módulo es el
//! único lugar que conoce esas variantes: convierte cada registro una sola vez
//! al entrar al sistema y el resto del crate trabaja con tipos fijos.

use serde_json::Value;

use crate::error::{SmsError, SmsResult};
use crate::models::{Area, Escenario, EstatusValidacion, Indicador, Medicion, Perfil};
use crate::validacion::computar_estatus;

/// Convierte un valor de id (texto, número u objeto con `id`/`value`) a String.
pub fn id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("id")
            .and_then(id_from)
            .or_else(|| map.get("value").and_then(id_from)),
        _ => None,
    }
}

/// Sigue una ruta `a.b` dentro del objeto.
fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = raw;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Primer id presente entre las rutas candidatas.
fn first_id(raw: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| lookup(raw, p).and_then(id_from))
}

/// Primer texto no vacío entre las rutas candidatas (los números se aceptan).
fn first_text(raw: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| match lookup(raw, p)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_i64(raw: &Value, paths: &[&str]) -> Option<i64> {
    paths.iter().find_map(|p| match lookup(raw, p)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn first_f64(raw: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|p| match lookup(raw, p)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|v| v.is_finite())
}

/// Estado activo/inactivo: ausente = activo; texto "ACTIVO" = activo;
/// booleano `activo` respetado tal cual.
fn is_active(raw: &Value) -> bool {
    if let Some(Value::Bool(b)) = lookup(raw, "activo") {
        return *b;
    }
    match first_text(raw, &["estado", "estatus", "status"]) {
        Some(s) => s.to_uppercase() == "ACTIVO",
        None => true,
    }
}

pub fn normalize_area(raw: &Value) -> SmsResult<Area> {
    let id = first_id(raw, &["id", "area_id"]).ok_or_else(|| SmsError::validacion("Área sin identificador."))?;
    Ok(Area {
        nombre: first_text(raw, &["nombre", "name", "descripcion"]).unwrap_or_default(),
        activo: is_active(raw),
        orden_visualizacion: first_i64(raw, &["orden_visualizacion", "orden", "display_order"]),
        parent_id: first_id(raw, &["parent_area_id", "subdireccion_id", "parent_id"]),
        id,
    })
}

pub fn normalize_indicator(raw: &Value) -> SmsResult<Indicador> {
    let id = first_id(raw, &["id", "indicador_id"]).ok_or_else(|| SmsError::validacion("Indicador sin identificador."))?;

    let alias: Vec<String> = ["indicador_nombre", "nombre_indicador", "titulo", "display_name", "meta_titulo"]
        .iter()
        .filter_map(|p| first_text(raw, &[*p]))
        .collect();

    let nombre = first_text(raw, &["nombre"])
        .or_else(|| alias.first().cloned())
        .unwrap_or_default();

    // `area` puede llegar como texto (nombre) o como objeto anidado.
    let area_nombre = first_text(raw, &["area_nombre", "areaName", "area.nombre", "area_descripcion"])
        .or_else(|| match lookup(raw, "area") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        });

    Ok(Indicador {
        id,
        nombre,
        descripcion: first_text(raw, &["descripcion"]),
        alias,
        area_id: first_id(raw, &["area_id", "areaId", "areaID", "areaid", "area.id", "area.area_id"]),
        area_nombre,
        parent_area_id: first_id(
            raw,
            &["parent_area_id", "parentAreaId", "area_parent_id", "area.parent_area_id", "subdireccion_id"],
        ),
        unidad_medida: first_text(raw, &["unidad_medida", "unidad", "unidadMedida", "unidad_de_medida"]),
        orden_visualizacion: first_i64(raw, &["orden_visualizacion", "orden"]),
        activo: is_active(raw),
        requiere_subsistema: matches!(lookup(raw, "requiere_subsistema"), Some(Value::Bool(true))),
        clave: first_text(raw, &["clave", "codigo", "indicador_clave", "indicador", "key"]),
    })
}

/// Perfil del usuario tal como lo entrega la capa de autenticación.
pub fn normalize_profile(raw: &Value) -> Perfil {
    Perfil {
        id: first_id(raw, &["id", "user_id", "usuario_id"]),
        rol: first_text(raw, &["rol_principal", "rol", "puesto"]).unwrap_or_default(),
        area_id: first_id(raw, &["area_id"]),
        area_obj_id: lookup(raw, "area").and_then(|a| match a {
            Value::Object(_) => id_from(a),
            _ => None,
        }),
        subdireccion_id: first_id(raw, &["subdireccion_id"]),
    }
}

/// Medición histórica importada desde un volcado del backend.
pub fn normalize_measurement(raw: &Value) -> SmsResult<Medicion> {
    let indicador_id = first_id(raw, &["indicador_id", "indicadorId", "indicador.id"])
        .ok_or_else(|| SmsError::validacion("Medición sin indicador."))?;
    let anio = first_i64(raw, &["anio", "year"]).ok_or_else(|| SmsError::validacion("Medición sin año."))? as i32;
    let mes = first_i64(raw, &["mes", "month"]).ok_or_else(|| SmsError::validacion("Medición sin mes."))?;
    if !(1..=12).contains(&mes) {
        return Err(SmsError::validacion(format!("Mes fuera de rango: {}", mes)));
    }
    let valor = first_f64(raw, &["valor", "value"]).ok_or_else(|| SmsError::validacion("Medición sin valor numérico."))?;
    let escenario = match first_text(raw, &["escenario"]) {
        Some(s) => Escenario::parse(&s).ok_or_else(|| SmsError::validacion(format!("Escenario desconocido: {}", s)))?,
        None => Escenario::Real,
    };
    let estatus: EstatusValidacion = computar_estatus(raw);

    Ok(Medicion {
        id: first_i64(raw, &["id"]).unwrap_or(0),
        indicador_id,
        anio,
        mes: mes as u32,
        escenario,
        valor,
        subsistema: first_text(raw, &["subsistema"]),
        estatus_validacion: estatus,
        capturado_por: first_id(raw, &["capturado_por"]),
        editado_por: first_id(raw, &["editado_por"]),
        validado_por: first_id(raw, &["validado_por"]),
        fecha_captura: first_text(raw, &["fecha_captura", "created_at"]),
        fecha_ultima_edicion: first_text(raw, &["fecha_ultima_edicion", "updated_at"]),
        fecha_validacion: first_text(raw, &["fecha_validacion"]),
        rechazado_por: first_id(raw, &["rechazado_por"]),
        fecha_rechazo: first_text(raw, &["fecha_rechazo"]),
    })
}

/// Catálogo inicial leído de un archivo JSON (`SMS_SEED_PATH`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogoSeed {
    pub areas: Vec<Area>,
    pub indicadores: Vec<Indicador>,
    pub mediciones: Vec<Medicion>,
}

impl CatalogoSeed {
    pub fn from_json(raw: &Value) -> SmsResult<Self> {
        let list = |key: &str| -> Vec<Value> {
            raw.get(key).and_then(|v| v.as_array()).cloned().unwrap_or_default()
        };
        Ok(CatalogoSeed {
            areas: list("areas").iter().map(normalize_area).collect::<SmsResult<_>>()?,
            indicadores: list("indicadores").iter().map(normalize_indicator).collect::<SmsResult<_>>()?,
            mediciones: list("mediciones").iter().map(normalize_measurement).collect::<SmsResult<_>>()?,
        })
    }

    pub fn parse(text: &str) -> SmsResult<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn indicador_con_area_anidada() {
        let raw = json!({
            "id": 12,
            "indicador_nombre": "Tasa de impactos con fauna",
            "area": {"id": "7", "nombre": "SMS", "parent_area_id": 3},
            "unidadMedida": "%",
            "codigo": "SMS-01",
            "estatus": "activo"
        });
        let ind = normalize_indicator(&raw).unwrap();
        assert_eq!(ind.id, "12");
        assert_eq!(ind.nombre, "Tasa de impactos con fauna");
        assert_eq!(ind.area_id.as_deref(), Some("7"));
        assert_eq!(ind.parent_area_id.as_deref(), Some("3"));
        assert_eq!(ind.area_nombre.as_deref(), Some("SMS"));
        assert_eq!(ind.unidad(), "%");
        assert_eq!(ind.clave.as_deref(), Some("SMS-01"));
        assert!(ind.activo);
    }

    #[test]
    fn indicador_inactivo_y_sin_unidad() {
        let raw = json!({"id": "a1", "nombre": "X", "areaId": "9", "estado": "INACTIVO"});
        let ind = normalize_indicator(&raw).unwrap();
        assert!(!ind.activo);
        assert_eq!(ind.unidad(), "No definida");
        assert_eq!(ind.area_id.as_deref(), Some("9"));
    }

    #[test]
    fn indicador_sin_id_es_error() {
        assert!(normalize_indicator(&json!({"nombre": "X"})).is_err());
    }

    #[test]
    fn perfil_con_variantes() {
        let raw = json!({"id": "u1", "puesto": "Subdirectora", "area": {"id": 4}, "subdireccion_id": 2});
        let p = normalize_profile(&raw);
        assert_eq!(p.id.as_deref(), Some("u1"));
        assert_eq!(p.rol, "Subdirectora");
        assert_eq!(p.area_id, None);
        assert_eq!(p.area_obj_id.as_deref(), Some("4"));
        assert_eq!(p.subdireccion_id.as_deref(), Some("2"));
    }

    #[test]
    fn medicion_con_validado_booleano() {
        let raw = json!({"indicador_id": 5, "anio": 2024, "mes": "3", "valor": "12.5", "validado": true});
        let m = normalize_measurement(&raw).unwrap();
        assert_eq!(m.mes, 3);
        assert_eq!(m.valor, 12.5);
        assert_eq!(m.escenario, Escenario::Real);
        assert_eq!(m.estatus_validacion, EstatusValidacion::Validado);
    }

    #[test]
    fn medicion_mes_invalido() {
        let raw = json!({"indicador_id": 5, "anio": 2024, "mes": 13, "valor": 1});
        assert!(normalize_measurement(&raw).is_err());
    }
}
