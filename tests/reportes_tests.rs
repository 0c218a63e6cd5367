use aifa_sms::export::{to_csv, DescargaCsv};
use aifa_sms::models::{
    FamiliaSerie, RegistroCapturaFauna, RegistroDisponibilidad, RegistroLuces, RegistroMantenimiento, RegistroPci,
};
use aifa_sms::reportes::familias::{self, ParametrosReporte};
use aifa_sms::reportes::{Semaforo, Tendencia, VistaReporte};
use aifa_sms::store::{SmsBackend, SqliteStore};

fn params(anio: i32) -> ParametrosReporte {
    ParametrosReporte { anio, pista: None, meta: None }
}

fn store_con_pci() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    for (mes, l, r) in [(1, 80.0, 60.0), (2, 74.0, 58.0), (3, 60.0, 50.0)] {
        store.record_pci(&RegistroPci { anio: 2024, mes, pista: "01L".into(), valor_pci: Some(l) }).unwrap();
        store.record_pci(&RegistroPci { anio: 2024, mes, pista: "01R".into(), valor_pci: Some(r) }).unwrap();
    }
    store
}

#[test]
fn pci_resume_ultimo_valor_contra_meta() {
    let store = store_con_pci();
    let vista = familias::construir(&store, FamiliaSerie::Pci, &params(2024)).unwrap();
    let rep = vista.reporte().expect("reporte con datos");

    assert_eq!(rep.meta, Some(70.0));
    assert_eq!(rep.meses.len(), 12);
    let l = rep.serie("Pista 01L").unwrap();
    assert_eq!(&l.valores[..4], &[Some(80.0), Some(74.0), Some(60.0), None]);

    // 60 < 70 pero >= 56: nivel medio y semáforo amarillo.
    let ultimo = rep.estadistica("ultimo_01l").unwrap();
    assert_eq!(ultimo.valor, Some(60.0));
    assert_eq!(ultimo.tendencia, Some(Tendencia::Medio));
    assert_eq!(ultimo.semaforo, Some(Semaforo::Amarillo));

    let ultimo_r = rep.estadistica("ultimo_01r").unwrap();
    assert_eq!(ultimo_r.tendencia, Some(Tendencia::Bajo));
    assert_eq!(rep.estadistica("promedio_01r").unwrap().valor, Some(56.0));
}

#[test]
fn meta_personalizada_reemplaza_la_predeterminada() {
    let store = store_con_pci();
    let p = ParametrosReporte { meta: Some(55.0), ..params(2024) };
    let vista = familias::construir(&store, FamiliaSerie::Pci, &p).unwrap();
    let rep = vista.reporte().unwrap();
    assert_eq!(rep.meta, Some(55.0));
    assert_eq!(rep.estadistica("ultimo_01l").unwrap().tendencia, Some(Tendencia::Alto));
}

#[test]
fn anio_sin_datos_no_es_error() {
    let store = store_con_pci();
    for familia in FamiliaSerie::TODAS {
        let vista = familias::construir(&store, familia, &params(2019)).unwrap();
        assert!(matches!(vista, VistaReporte::SinDatos { .. }), "{} debería venir sin datos", familia);
    }
}

#[test]
fn csv_de_pci_tiene_quince_filas() {
    let store = store_con_pci();
    let vista = familias::construir(&store, FamiliaSerie::Pci, &params(2024)).unwrap();
    let csv = DescargaCsv::desde_reporte(vista.reporte().unwrap()).unwrap();
    assert_eq!(csv.filename, "pci-comparativo-2024.csv");

    let lineas: Vec<&str> = csv.contenido.trim_start_matches('\u{feff}').split('\n').collect();
    assert_eq!(lineas.len(), 15);
    assert_eq!(lineas[0], "Mes,PCI 01L,PCI 01R,Meta");
    assert_eq!(lineas[1], "Enero,80.00,60.00,70");
    assert_eq!(lineas[4], "Abril,,,70");
    assert_eq!(lineas[13], "");
    assert_eq!(lineas[14], "PROMEDIO,71.33,56.00,70");
}

#[test]
fn disponibilidad_promedia_por_pista_y_general() {
    let store = SqliteStore::open_in_memory().unwrap();
    for (mes, pista, pct) in [(1, "01L", 99.0), (2, "01L", 97.0), (1, "01R", 96.0)] {
        store
            .record_availability(&RegistroDisponibilidad {
                anio: 2024,
                mes,
                pista: pista.into(),
                porcentaje_disponibilidad: Some(pct),
            })
            .unwrap();
    }
    let vista = familias::construir(&store, FamiliaSerie::DisponibilidadPistas, &params(2024)).unwrap();
    let rep = vista.reporte().unwrap();
    assert_eq!(rep.estadistica("promedio_01l").unwrap().valor, Some(98.0));
    assert_eq!(rep.estadistica("promedio_01l").unwrap().semaforo, Some(Semaforo::Verde));
    assert_eq!(rep.estadistica("promedio_01r").unwrap().valor, Some(96.0));
    assert_eq!(rep.estadistica("promedio_general").unwrap().valor, Some(97.33333333333333));
}

#[test]
fn iluminacion_usa_la_pista_pedida() {
    let store = SqliteStore::open_in_memory().unwrap();
    for (mes, pista, op) in [(1, "01L", 480.0), (1, "01R", 500.0), (2, "01R", 490.0)] {
        store
            .record_lighting(&RegistroLuces {
                anio: 2024,
                mes,
                pista: pista.into(),
                luces_operativas: Some(op),
                luces_totales: Some(500.0),
                porcentaje_operativas: Some(op / 500.0 * 100.0),
            })
            .unwrap();
    }
    assert_eq!(store.lighting_tracks().unwrap(), vec!["01L".to_string(), "01R".to_string()]);

    let p = ParametrosReporte { pista: Some("01R".into()), ..params(2024) };
    let vista = familias::construir(&store, FamiliaSerie::Iluminacion, &p).unwrap();
    let rep = vista.reporte().unwrap();
    assert_eq!(rep.pista.as_deref(), Some("01R"));
    assert_eq!(rep.estadistica("promedio_operativas").unwrap().valor, Some(495.0));
    assert_eq!(rep.archivo_csv, "iluminacion-01R-2024");

    let por_defecto = familias::construir(&store, FamiliaSerie::Iluminacion, &params(2024)).unwrap();
    assert_eq!(por_defecto.reporte().unwrap().pista.as_deref(), Some("01L"));
}

#[test]
fn mantenimientos_calcula_cumplimiento_total() {
    let store = SqliteStore::open_in_memory().unwrap();
    for (mes, prog, real) in [(1, 10.0, 10.0), (2, 10.0, 6.0)] {
        store
            .record_maintenance(&RegistroMantenimiento {
                anio: 2024,
                mes,
                programados: Some(prog),
                realizados: Some(real),
                porcentaje_cumplimiento: Some(real / prog * 100.0),
            })
            .unwrap();
    }
    let vista = familias::construir(&store, FamiliaSerie::Mantenimientos, &params(2024)).unwrap();
    let rep = vista.reporte().unwrap();
    assert_eq!(rep.estadistica("total_programados").unwrap().valor, Some(20.0));
    assert_eq!(rep.estadistica("total_realizados").unwrap().valor, Some(16.0));
    assert_eq!(rep.estadistica("cumplimiento").unwrap().valor, Some(80.0));
    assert_eq!(rep.estadistica("cumplimiento").unwrap().semaforo, Some(Semaforo::Amarillo));
    assert_eq!(rep.filas_csv.last().unwrap()[0], "TOTAL/PROMEDIO");
}

#[test]
fn capturas_de_fauna_por_tipo() {
    let store = SqliteStore::open_in_memory().unwrap();
    for (mes, tipo, cantidad) in [(1, "Aves", 5.0), (1, "Mamíferos", 2.0), (3, "Reptiles", 1.0)] {
        store
            .record_capture(&RegistroCapturaFauna { anio: 2024, mes, tipo_fauna: tipo.into(), cantidad })
            .unwrap();
    }
    let vista = familias::construir(&store, FamiliaSerie::CapturasFauna, &params(2024)).unwrap();
    let rep = vista.reporte().unwrap();
    let total = rep.serie("Total").unwrap();
    assert_eq!(total.valores[0], Some(7.0));
    assert_eq!(total.valores[1], None);
    assert_eq!(total.valores[2], Some(1.0));
    assert_eq!(rep.estadistica("total").unwrap().valor, Some(8.0));
    assert_eq!(rep.estadistica("total_aves").unwrap().texto, "5");
}

#[test]
fn csv_vacio_no_se_exporta() {
    let filas: Vec<Vec<String>> = Vec::new();
    assert_eq!(to_csv(&filas).unwrap_err().tipo(), "validacion");
}
