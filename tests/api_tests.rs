use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use aifa_sms::models::{Area, Indicador, RegistroPci};
use aifa_sms::server::configure;
use aifa_sms::store::SqliteStore;
use aifa_sms::{AppConfig, AppState};

const OPERADOR: &str = r#"{"id": "op-1", "rol_principal": "Operador", "area": {"id": 7}}"#;
const SUBDIRECTOR: &str = r#"{"id": "sub-1", "puesto": "Subdirectora", "area_id": "7"}"#;
const AJENO: &str = r#"{"id": "op-9", "rol": "Operador", "area_id": "3"}"#;

fn estado() -> AppState {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_area(&Area { id: "7".into(), nombre: "SMS".into(), activo: true, orden_visualizacion: Some(1), parent_id: None })
        .unwrap();
    store
        .upsert_area(&Area { id: "3".into(), nombre: "Operaciones".into(), activo: true, orden_visualizacion: Some(2), parent_id: None })
        .unwrap();
    store
        .upsert_indicator(&Indicador {
            id: "10".into(),
            nombre: "Disponibilidad de pistas".into(),
            area_id: Some("7".into()),
            area_nombre: Some("SMS".into()),
            clave: Some("SMS-07".into()),
            activo: true,
            ..Default::default()
        })
        .unwrap();
    store
        .upsert_indicator(&Indicador {
            id: "11".into(),
            nombre: "Tasa de impactos con fauna".into(),
            area_id: Some("7".into()),
            clave: Some("SMS-01".into()),
            activo: true,
            ..Default::default()
        })
        .unwrap();
    for mes in 1..=3 {
        store
            .record_pci(&RegistroPci { anio: 2024, mes, pista: "01L".into(), valor_pci: Some(70.0 + mes as f64) })
            .unwrap();
    }
    AppState::new(store, AppConfig::default())
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data(web::Data::new($state)).configure(configure)).await
    };
}

#[actix_web::test]
async fn sin_perfil_es_403() {
    let app = app!(estado());
    let req = test::TestRequest::get().uri("/areas").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tipo"], "permiso_denegado");
    assert_eq!(body["reintentar"], false);
}

#[actix_web::test]
async fn catalogo_filtrado_por_area() {
    let app = app!(estado());
    let req = test::TestRequest::get().uri("/indicadores").insert_header(("x-perfil", OPERADOR)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["indicadores"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/indicadores").insert_header(("x-perfil", AJENO)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["indicadores"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get().uri("/areas").insert_header(("x-perfil", AJENO)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["areas"][0]["id"], "3");
}

#[actix_web::test]
async fn captura_duplicada_y_validacion() {
    let app = app!(estado());
    let medicion = json!({"anio": 2025, "mes": 2, "valor": 97.5});

    let req = test::TestRequest::post()
        .uri("/indicadores/10/mediciones")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(&medicion)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let creado: Value = test::read_body_json(resp).await;
    assert_eq!(creado["resultado"], "creado");
    assert_eq!(creado["registro"]["estatus_validacion"], "PENDIENTE");
    let id = creado["registro"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/indicadores/10/mediciones")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(&medicion)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let existente: Value = test::read_body_json(resp).await;
    assert_eq!(existente["resultado"], "existente_cargado");
    assert_eq!(existente["registro"]["id"], id);

    let req = test::TestRequest::post()
        .uri(&format!("/mediciones/{}/validar", id))
        .insert_header(("x-perfil", OPERADOR))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/mediciones/{}/validar", id))
        .insert_header(("x-perfil", SUBDIRECTOR))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["cambio"], true);
    assert_eq!(body["registro"]["validado_por"], "sub-1");

    let req = test::TestRequest::post()
        .uri(&format!("/mediciones/{}/validar", id))
        .insert_header(("x-perfil", SUBDIRECTOR))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["cambio"], false);
}

#[actix_web::test]
async fn historial_se_refresca_tras_capturar() {
    let app = app!(estado());
    let req = test::TestRequest::get()
        .uri("/indicadores/10/historial")
        .insert_header(("x-perfil", OPERADOR))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tipo"], "mediciones");
    assert!(body["registros"].as_array().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri("/indicadores/10/mediciones")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(json!({"anio": 2025, "mes": 1, "valor": 99.0}))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::get()
        .uri("/indicadores/10/historial")
        .insert_header(("x-perfil", OPERADOR))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["registros"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn fauna_se_captura_con_conteos() {
    let app = app!(estado());
    let req = test::TestRequest::post()
        .uri("/indicadores/11/mediciones")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(json!({"anio": 2025, "mes": 4, "total_operaciones": 200, "impactos": 3}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["registro"]["tasa"], 1.5);

    let req = test::TestRequest::post()
        .uri("/indicadores/11/mediciones")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(json!({"anio": 2025, "mes": 5, "total_operaciones": 200}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tipo"], "validacion");
}

#[actix_web::test]
async fn vista_previa_compuesta_sin_persistir() {
    let app = app!(estado());
    let req = test::TestRequest::post()
        .uri("/captura/compuesta")
        .set_json(json!({"valores": ["10", "", "5.5"], "agregacion": "suma"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["capturas_validas"], 2);
    assert_eq!(body["resultado"], 15.5);

    let req = test::TestRequest::post()
        .uri("/captura/compuesta")
        .set_json(json!({"valores": ["10"]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["vista_previa"], 10.0);
    assert!(body["resultado"].is_null());
    assert!(body["aviso"].is_string());
}

#[actix_web::test]
async fn metas_requieren_rol_elevado() {
    let app = app!(estado());
    let meta = json!({"anio": 2025, "mes": 1, "escenario": "ALTO", "valor": 99.0});
    let req = test::TestRequest::post()
        .uri("/indicadores/10/metas")
        .insert_header(("x-perfil", OPERADOR))
        .set_json(&meta)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/indicadores/10/metas")
        .insert_header(("x-perfil", SUBDIRECTOR))
        .set_json(&meta)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/indicadores/10/metas?anio=2025")
        .insert_header(("x-perfil", OPERADOR))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["metas"][0]["escenario"], "ALTO");
}

#[actix_web::test]
async fn reporte_pci_y_csv() {
    let app = app!(estado());
    let req = test::TestRequest::get().uri("/reportes/pci?anio=2024").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["estado"], "datos");
    assert_eq!(body["meta"], 70.0);
    assert_eq!(body["series"][0]["valores"][2], 73.0);

    let req = test::TestRequest::get().uri("/reportes/pci?anio=2010").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["estado"], "sin_datos");

    let req = test::TestRequest::get().uri("/reportes/pci/csv?anio=2024").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposicion = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposicion.contains("pci-comparativo-2024.csv"));
    let bytes = test::read_body(resp).await;
    let texto = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(texto.starts_with('\u{feff}'));

    let req = test::TestRequest::get().uri("/reportes/pci/csv?anio=2010").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/reportes/desconocido").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn anios_incluyen_el_actual() {
    let app = app!(estado());
    let req = test::TestRequest::get().uri("/reportes/pci/anios").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let anios: Vec<i64> = body["anios"].as_array().unwrap().iter().filter_map(|v| v.as_i64()).collect();
    assert!(anios.contains(&2024));
    assert!(anios.contains(&body["predeterminado"].as_i64().unwrap()));
    assert!(anios.windows(2).all(|w| w[0] > w[1]));
}

#[actix_web::test]
async fn modal_unico_y_vista_embebida() {
    let app = app!(estado());
    let abrir = json!({"familia": "pci", "meta": 75.0});
    let req = test::TestRequest::post().uri("/modal").set_json(&abrir).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::post().uri("/modal").set_json(&abrir).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    let req = test::TestRequest::delete().uri("/modal").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::get().uri("/modal").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["abierto"], false);

    let req = test::TestRequest::post()
        .uri("/vistas")
        .set_json(json!({"contenedor": "pci-chart", "tipo": "pci-comparativo", "opciones": {"meta": 72}, "anio": 2024}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["contenido"]["estado"], "datos");
    assert_eq!(body["contenido"]["meta"], 72.0);

    let req = test::TestRequest::delete().uri("/vistas/pci-chart").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::delete().uri("/vistas/pci-chart").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn vista_sin_contenido_no_queda_montada() {
    let path = std::env::temp_dir().join(format!("aifa-sms-vistas-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let store = SqliteStore::open(&path).unwrap();
    rusqlite::Connection::open(&path).unwrap().execute_batch("DROP TABLE pci_mediciones").unwrap();
    let data = web::Data::new(AppState::new(store, AppConfig::default()));
    let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/vistas")
        .set_json(json!({"contenedor": "pci-chart", "tipo": "pci-comparativo", "anio": 2024}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(data.embebidas().is_empty());

    let req = test::TestRequest::post()
        .uri("/vistas")
        .set_json(json!({"contenedor": "pci-chart", "tipo": "barras"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    let req = test::TestRequest::delete().uri("/vistas/pci-chart").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    drop(app);
    drop(data);
    let _ = std::fs::remove_file(&path);
}
