use aifa_sms::acceso::{indicadores_visibles, Solicitante};
use aifa_sms::models::normalize::CatalogoSeed;
use aifa_sms::models::{EstatusValidacion, Perfil};
use aifa_sms::store::{SmsBackend, SqliteStore};

const SEED: &str = r#"{
    "areas": [
        {"id": 7, "nombre": "SMS", "orden": 1},
        {"id": "9", "nombre": "Mantenimiento", "estatus": "INACTIVO"}
    ],
    "indicadores": [
        {"id": 10, "nombre": "Disponibilidad de pistas", "areaId": 7, "codigo": "SMS-07", "unidad": "%"},
        {"id": "11", "indicador_nombre": "Tasa de impactos con fauna", "area": {"id": "7", "nombre": "SMS"}},
        {"id": 12, "nombre": "Pavimentos", "area_id": 9, "estado": "INACTIVO"}
    ],
    "mediciones": [
        {"indicador_id": 10, "anio": 2024, "mes": 11, "valor": "98.5", "validado": true},
        {"indicador_id": 10, "anio": 2024, "mes": 12, "valor": 97, "escenario": "REAL"}
    ]
}"#;

#[test]
fn importa_catalogo_normalizado() {
    let store = SqliteStore::open_in_memory().unwrap();
    let seed = CatalogoSeed::parse(SEED).unwrap();
    assert_eq!(store.import_catalog(&seed).unwrap(), (2, 3, 2));

    let ind = store.get_indicator("11").unwrap().unwrap();
    assert_eq!(ind.area_id.as_deref(), Some("7"));
    assert_eq!(ind.nombre, "Tasa de impactos con fauna");

    let historial = store.measurement_history("10", 12).unwrap();
    assert_eq!(historial.len(), 2);
    assert_eq!(historial[0].mes, 12);
    assert_eq!(historial[0].estatus_validacion, EstatusValidacion::Pendiente);
    assert_eq!(historial[1].estatus_validacion, EstatusValidacion::Validado);
}

#[test]
fn reimportar_no_duplica_mediciones() {
    let store = SqliteStore::open_in_memory().unwrap();
    let seed = CatalogoSeed::parse(SEED).unwrap();
    store.import_catalog(&seed).unwrap();
    let (_, _, mediciones) = store.import_catalog(&seed).unwrap();
    assert_eq!(mediciones, 0);
    assert_eq!(store.measurement_history("10", 12).unwrap().len(), 2);
}

#[test]
fn solo_indicadores_activos_y_visibles() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.import_catalog(&CatalogoSeed::parse(SEED).unwrap()).unwrap();
    let todos = store.list_indicators().unwrap();

    let sin_areas = Solicitante::new(Perfil { rol: "Operador".into(), ..Default::default() });
    let ids: Vec<String> = indicadores_visibles(&todos, &sin_areas, None).into_iter().map(|i| i.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&"12".to_string()));

    let otra_area = Solicitante::new(Perfil { rol: "Operador".into(), area_id: Some("3".into()), ..Default::default() });
    assert!(indicadores_visibles(&todos, &otra_area, None).is_empty());

    let admin = Solicitante::new(Perfil { rol: "Administrador".into(), area_id: Some("3".into()), ..Default::default() });
    assert_eq!(indicadores_visibles(&todos, &admin, Some("7")).len(), 2);
}
