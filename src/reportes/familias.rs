//! Constructores de los cinco reportes SMS.
//!
//! Cada uno pide su serie al backend, la reacomoda a doce meses, calcula el
//! resumen y deja preparadas las filas del CSV.

use tracing::debug;

use crate::error::SmsResult;
use crate::models::{FamiliaSerie, RegistroCapturaFauna};
use crate::reportes::{
    calcular_promedio, calcular_total, celda, redondear, semaforo, serie_mensual, tendencia, ultimo_valor,
    Estadistica, Reporte, Serie, VistaReporte, MESES, MESES_CORTOS,
};
use crate::store::SmsBackend;
use crate::text::normalize_text;

pub const PISTAS: [&str; 2] = ["01L", "01R"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParametrosReporte {
    pub anio: i32,
    pub pista: Option<String>,
    pub meta: Option<f64>,
}

/// Arma el reporte de la familia pedida.
pub fn construir<B: SmsBackend + ?Sized>(
    backend: &B,
    familia: FamiliaSerie,
    params: &ParametrosReporte,
) -> SmsResult<VistaReporte> {
    let meta = params.meta.filter(|m| m.is_finite()).or(familia.meta_default());
    debug!(familia = %familia, anio = params.anio, "construyendo reporte");
    match familia {
        FamiliaSerie::Pci => reporte_pci(backend, params.anio, meta.unwrap_or(70.0)),
        FamiliaSerie::DisponibilidadPistas => reporte_disponibilidad(backend, params.anio, meta.unwrap_or(98.0)),
        FamiliaSerie::Iluminacion => reporte_iluminacion(backend, params.anio, params.pista.as_deref()),
        FamiliaSerie::Mantenimientos => reporte_mantenimientos(backend, params.anio, meta.unwrap_or(100.0)),
        FamiliaSerie::CapturasFauna => reporte_capturas_fauna(backend, params.anio),
    }
}

fn misma_pista(a: &str, b: &str) -> bool {
    let limpia = |s: &str| normalize_text(s).replace(' ', "");
    limpia(a) == limpia(b)
}

fn base(familia: FamiliaSerie, anio: i32, meta: Option<f64>) -> Reporte {
    Reporte {
        familia,
        titulo: familia.titulo().to_string(),
        claves: familia.claves().to_string(),
        anio,
        pista: None,
        meses: MESES_CORTOS.to_vec(),
        series: Vec::new(),
        meta,
        resumen: Vec::new(),
        filas_csv: Vec::new(),
        archivo_csv: format!("{}-{}", familia.slug(), anio),
    }
}

fn encabezado(columnas: &[&str]) -> Vec<String> {
    columnas.iter().map(|c| c.to_string()).collect()
}

/// Encabezado, doce meses, fila vacía y fila de resumen.
fn filas_csv(encabezados: &[&str], mes: impl Fn(usize) -> Vec<String>, resumen: Vec<String>) -> Vec<Vec<String>> {
    let mut filas = Vec::with_capacity(15);
    filas.push(encabezado(encabezados));
    for i in 0..12 {
        let mut fila = vec![MESES[i].to_string()];
        fila.extend(mes(i));
        filas.push(fila);
    }
    filas.push(Vec::new());
    filas.push(resumen);
    filas
}

/// Comparativo PCI de las pistas 01L y 01R contra la meta.
pub fn reporte_pci<B: SmsBackend + ?Sized>(backend: &B, anio: i32, meta: f64) -> SmsResult<VistaReporte> {
    let l = backend.pci_series(anio, PISTAS[0])?;
    let r = backend.pci_series(anio, PISTAS[1])?;
    if l.is_empty() && r.is_empty() {
        return Ok(VistaReporte::sin_datos(FamiliaSerie::Pci, anio, "PCI"));
    }
    let serie_l = serie_mensual(&l, |x| x.valor_pci);
    let serie_r = serie_mensual(&r, |x| x.valor_pci);

    let mut rep = base(FamiliaSerie::Pci, anio, Some(meta));
    rep.archivo_csv = format!("pci-comparativo-{}", anio);
    for (pista, serie) in [(PISTAS[0], &serie_l), (PISTAS[1], &serie_r)] {
        let ultimo = ultimo_valor(serie);
        let sufijo = pista.to_lowercase();
        rep.resumen.push(
            Estadistica::numero(&format!("ultimo_{}", sufijo), &format!("Pista {}", pista), ultimo)
                .con_tendencia(tendencia(ultimo, meta))
                .con_semaforo(semaforo(ultimo, Some(meta), false)),
        );
        rep.resumen.push(Estadistica::numero(
            &format!("promedio_{}", sufijo),
            &format!("Promedio {}", pista),
            calcular_promedio(serie),
        ));
    }
    let meta_txt = celda(Some(meta), None);
    rep.filas_csv = filas_csv(
        &["Mes", "PCI 01L", "PCI 01R", "Meta"],
        |i| vec![celda(serie_l[i], Some(2)), celda(serie_r[i], Some(2)), meta_txt.clone()],
        vec![
            "PROMEDIO".to_string(),
            celda(calcular_promedio(&serie_l), Some(2)),
            celda(calcular_promedio(&serie_r), Some(2)),
            meta_txt.clone(),
        ],
    );
    rep.series = vec![Serie::new("Pista 01L", serie_l), Serie::new("Pista 01R", serie_r)];
    Ok(VistaReporte::Datos(rep))
}

/// Disponibilidad mensual de pistas (%), por pista y general.
pub fn reporte_disponibilidad<B: SmsBackend + ?Sized>(backend: &B, anio: i32, meta: f64) -> SmsResult<VistaReporte> {
    let registros = backend.availability_series(anio)?;
    if registros.is_empty() {
        return Ok(VistaReporte::sin_datos(FamiliaSerie::DisponibilidadPistas, anio, "disponibilidad"));
    }
    let de_pista = |pista: &str| {
        registros.iter().filter(|r| misma_pista(&r.pista, pista)).cloned().collect::<Vec<_>>()
    };
    let l = de_pista(PISTAS[0]);
    let r = de_pista(PISTAS[1]);
    let serie_l = serie_mensual(&l, |x| x.porcentaje_disponibilidad);
    let serie_r = serie_mensual(&r, |x| x.porcentaje_disponibilidad);

    let promedio_l = calcular_promedio(&l.iter().map(|x| x.porcentaje_disponibilidad).collect::<Vec<_>>());
    let promedio_r = calcular_promedio(&r.iter().map(|x| x.porcentaje_disponibilidad).collect::<Vec<_>>());
    let general = calcular_promedio(&registros.iter().map(|x| x.porcentaje_disponibilidad).collect::<Vec<_>>());

    let mut rep = base(FamiliaSerie::DisponibilidadPistas, anio, Some(meta));
    rep.resumen = vec![
        Estadistica::porcentaje("promedio_01l", "Pista 01L", promedio_l).con_semaforo(semaforo(promedio_l, Some(meta), false)),
        Estadistica::porcentaje("promedio_01r", "Pista 01R", promedio_r).con_semaforo(semaforo(promedio_r, Some(meta), false)),
        Estadistica::porcentaje("promedio_general", "Promedio general", general)
            .con_semaforo(semaforo(general, Some(meta), false)),
    ];
    let meta_txt = celda(Some(meta), None);
    rep.filas_csv = filas_csv(
        &["Mes", "Pista 01L (%)", "Pista 01R (%)", "Meta (%)"],
        |i| vec![celda(serie_l[i], Some(2)), celda(serie_r[i], Some(2)), meta_txt.clone()],
        vec!["PROMEDIO".to_string(), celda(promedio_l, Some(2)), celda(promedio_r, Some(2)), meta_txt.clone()],
    );
    rep.series = vec![Serie::new("Pista 01L", serie_l), Serie::new("Pista 01R", serie_r)];
    Ok(VistaReporte::Datos(rep))
}

/// Luces operativas y totales de una pista. Sin pista se toma la primera con
/// datos.
pub fn reporte_iluminacion<B: SmsBackend + ?Sized>(
    backend: &B,
    anio: i32,
    pista: Option<&str>,
) -> SmsResult<VistaReporte> {
    let pista = match pista.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => backend.lighting_tracks()?.into_iter().next().unwrap_or_else(|| PISTAS[0].to_string()),
    };
    let registros = backend.lighting_series(anio, &pista)?;
    if registros.is_empty() {
        return Ok(VistaReporte::SinDatos {
            familia: FamiliaSerie::Iluminacion,
            anio,
            mensaje: format!("No hay mediciones de iluminación para la pista {} en {}.", pista, anio),
        });
    }
    let operativas = serie_mensual(&registros, |x| x.luces_operativas);
    let totales = serie_mensual(&registros, |x| x.luces_totales);
    let porcentaje = serie_mensual(&registros, |x| x.porcentaje_operativas);

    let promedio_operativas =
        calcular_promedio(&registros.iter().map(|x| x.luces_operativas).collect::<Vec<_>>()).map(|v| v.round());
    let promedio_totales =
        calcular_promedio(&registros.iter().map(|x| x.luces_totales).collect::<Vec<_>>()).map(|v| v.round());
    let promedio_porcentaje = calcular_promedio(&registros.iter().map(|x| x.porcentaje_operativas).collect::<Vec<_>>());

    let mut rep = base(FamiliaSerie::Iluminacion, anio, None);
    rep.archivo_csv = format!("iluminacion-{}-{}", pista, anio);
    rep.pista = Some(pista);
    rep.resumen = vec![
        Estadistica::numero("promedio_operativas", "Luces operativas", promedio_operativas),
        Estadistica::numero("promedio_totales", "Luces totales", promedio_totales),
        Estadistica::porcentaje("promedio_porcentaje", "Porcentaje operativo", promedio_porcentaje),
    ];
    rep.filas_csv = filas_csv(
        &["Mes", "Luces Operativas", "Luces Totales", "Porcentaje (%)"],
        |i| vec![celda(operativas[i], None), celda(totales[i], None), celda(porcentaje[i], Some(2))],
        vec![
            "PROMEDIO".to_string(),
            celda(promedio_operativas, None),
            celda(promedio_totales, None),
            celda(promedio_porcentaje, Some(2)),
        ],
    );
    rep.series = vec![
        Serie::new("Operativas", operativas),
        Serie::new("Totales", totales),
        Serie::new("Porcentaje", porcentaje),
    ];
    Ok(VistaReporte::Datos(rep))
}

/// Cumplimiento de mantenimientos: realizados / programados × 100.
pub fn cumplimiento(programados: f64, realizados: f64) -> Option<f64> {
    if programados > 0.0 { Some(realizados / programados * 100.0) } else { None }
}

pub fn reporte_mantenimientos<B: SmsBackend + ?Sized>(backend: &B, anio: i32, meta: f64) -> SmsResult<VistaReporte> {
    let registros = backend.maintenance_series(anio)?;
    if registros.is_empty() {
        return Ok(VistaReporte::sin_datos(FamiliaSerie::Mantenimientos, anio, "mantenimientos"));
    }
    let programados = serie_mensual(&registros, |x| x.programados);
    let realizados = serie_mensual(&registros, |x| x.realizados);
    let porcentaje = serie_mensual(&registros, |x| x.porcentaje_cumplimiento);

    let total_programados = calcular_total(&programados);
    let total_realizados = calcular_total(&realizados);
    let cumpl = cumplimiento(total_programados, total_realizados);

    let mut rep = base(FamiliaSerie::Mantenimientos, anio, Some(meta));
    rep.resumen = vec![
        Estadistica::numero("total_programados", "Programados", Some(total_programados)),
        Estadistica::numero("total_realizados", "Realizados", Some(total_realizados)),
        Estadistica::porcentaje("cumplimiento", "Cumplimiento", cumpl).con_semaforo(semaforo(cumpl, Some(meta), false)),
        Estadistica::porcentaje("promedio_porcentaje", "Promedio mensual", calcular_promedio(&porcentaje)),
    ];
    let meta_txt = celda(Some(meta), None);
    rep.filas_csv = filas_csv(
        &["Mes", "Programados", "Realizados", "Porcentaje (%)", "Meta (%)"],
        |i| {
            vec![
                celda(programados[i], None),
                celda(realizados[i], None),
                celda(porcentaje[i], Some(2)),
                meta_txt.clone(),
            ]
        },
        vec![
            "TOTAL/PROMEDIO".to_string(),
            celda(Some(total_programados), None),
            celda(Some(total_realizados), None),
            celda(cumpl, Some(2)),
            meta_txt.clone(),
        ],
    );
    rep.series = vec![
        Serie::new("Programados", programados),
        Serie::new("Realizados", realizados),
        Serie::new("Porcentaje", porcentaje),
    ];
    Ok(VistaReporte::Datos(rep))
}

/// Conteos de un mes por tipo de fauna.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConteoFauna {
    pub aves: f64,
    pub mamiferos: f64,
    pub reptiles: f64,
}

impl ConteoFauna {
    pub fn total(&self) -> f64 {
        self.aves + self.mamiferos + self.reptiles
    }
}

fn cantidad_de(registros: &[&RegistroCapturaFauna], tipo: &str) -> f64 {
    registros
        .iter()
        .find(|r| normalize_text(&r.tipo_fauna).contains(tipo))
        .map(|r| r.cantidad)
        .unwrap_or(0.0)
}

/// Un mes sin registros queda en `None`; en un mes con registros, el tipo que
/// falte cuenta 0.
pub fn conteos_mensuales(registros: &[RegistroCapturaFauna]) -> Vec<Option<ConteoFauna>> {
    (1..=12u32)
        .map(|mes| {
            let del_mes: Vec<&RegistroCapturaFauna> = registros.iter().filter(|r| r.mes == mes).collect();
            if del_mes.is_empty() {
                None
            } else {
                Some(ConteoFauna {
                    aves: cantidad_de(&del_mes, "ave"),
                    mamiferos: cantidad_de(&del_mes, "mamifero"),
                    reptiles: cantidad_de(&del_mes, "reptil"),
                })
            }
        })
        .collect()
}

pub fn reporte_capturas_fauna<B: SmsBackend + ?Sized>(backend: &B, anio: i32) -> SmsResult<VistaReporte> {
    let registros = backend.capture_series(anio)?;
    if registros.is_empty() {
        return Ok(VistaReporte::sin_datos(FamiliaSerie::CapturasFauna, anio, "capturas de fauna"));
    }
    let conteos = conteos_mensuales(&registros);
    let columna = |f: fn(&ConteoFauna) -> f64| conteos.iter().map(|c| c.as_ref().map(f)).collect::<Vec<_>>();
    let aves = columna(|c| c.aves);
    let mamiferos = columna(|c| c.mamiferos);
    let reptiles = columna(|c| c.reptiles);
    let total = columna(ConteoFauna::total);

    let t_aves = calcular_total(&aves);
    let t_mamiferos = calcular_total(&mamiferos);
    let t_reptiles = calcular_total(&reptiles);
    let t_total = calcular_total(&total);

    let mut rep = base(FamiliaSerie::CapturasFauna, anio, None);
    rep.resumen = vec![
        Estadistica::numero("total_aves", "Aves", Some(t_aves)),
        Estadistica::numero("total_mamiferos", "Mamíferos", Some(t_mamiferos)),
        Estadistica::numero("total_reptiles", "Reptiles", Some(t_reptiles)),
        Estadistica::numero("total", "Total", Some(redondear(t_total, 3))),
    ];
    rep.filas_csv = filas_csv(
        &["Mes", "Aves", "Mamíferos", "Reptiles", "Total"],
        |i| vec![celda(aves[i], None), celda(mamiferos[i], None), celda(reptiles[i], None), celda(total[i], None)],
        vec![
            "TOTAL".to_string(),
            celda(Some(t_aves), None),
            celda(Some(t_mamiferos), None),
            celda(Some(t_reptiles), None),
            celda(Some(t_total), None),
        ],
    );
    rep.series = vec![
        Serie::new("Aves", aves),
        Serie::new("Mamíferos", mamiferos),
        Serie::new("Reptiles", reptiles),
        Serie::new("Total", total),
    ];
    Ok(VistaReporte::Datos(rep))
}
