//! End-to-end runs of the pipeline stages on synthetic station files

use chrono::{Datelike, Duration, NaiveDate};
use hidroanalise::{
    clean::{run_clean, CleanMode, CleanOptions},
    config::Config,
    errors::HidroError,
    export::{monthly_series_path, read_monthly_series},
    inventory::inspect,
    parallel::ParallelConfig,
    report::{comparison, glm, station, stationarity, COMPARISON_DIR, GLM_DIR, STATIONARITY_DIR},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const STATION_CHARTS: [&str; 9] = [
    "01_serie_temporal_mensal.svg",
    "02_analise_pentadal.svg",
    "02b_serie_pentadal_temporal.svg",
    "03_precipitacao_anual_complementar.svg",
    "04_climatologia_mensal.svg",
    "05_histograma_precipitacao_diaria.svg",
    "06_histograma_anual.svg",
    "07_boxplot_mensal.svg",
    "08_boxplot_anual.svg",
];

/// Four years of daily rain with a wet summer and a dry winter, written in
/// the HIDROWEB layout with comma decimals
fn write_station(dir: &Path, file: &str, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut text = String::from("Estação: SINTETICA\nCódigo: 33000000\n\nData Precipitacao\n");
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    for offset in 0..(4 * 365 + 1) {
        let date = start + Duration::days(offset);
        let wet_chance = if (4..=9).contains(&date.month()) { 0.15 } else { 0.6 };
        let precip = if rng.gen::<f64>() < wet_chance {
            rng.gen_range(0.5..45.0)
        } else {
            0.0
        };
        let value = format!("{precip:.1}").replace('.', ",");
        text.push_str(&format!("{} {value}\n", date.format("%d/%m/%Y")));
    }
    fs::write(dir.join(file), text).unwrap();
}

fn setup(files: &[(&str, u64)]) -> (TempDir, Config) {
    let root = tempdir().unwrap();
    let data_dir = root.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    for &(file, seed) in files {
        write_station(&data_dir, file, seed);
    }
    let config = Config {
        data_dir,
        output_dir: root.path().join("output").join("graficos"),
        ..Config::default()
    };
    (root, config)
}

fn two_stations() -> (TempDir, Config) {
    setup(&[
        ("goianesia33000001.txt", 1),
        ("campoalegre33000002.txt", 2),
    ])
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    found.sort();
    found
}

#[test]
fn test_process_writes_charts_and_tables() {
    let (_root, config) = two_stations();
    fs::write(config.data_dir.join("quebrado33000009.txt"), "sem cabecalho\n").unwrap();

    let summary = station::process(&config, &ParallelConfig::default()).unwrap();
    assert_eq!(summary.stations.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].0.ends_with("quebrado33000009.txt"));

    for slug in ["goianesia", "campoalegre"] {
        let dir = config.output_dir.join(slug);
        for chart in STATION_CHARTS {
            assert!(dir.join(chart).is_file(), "{slug}: missing {chart}");
        }
        assert!(dir.join(format!("resumo_mensal_{slug}.csv")).is_file());
        assert!(dir.join(format!("resumo_pentadal_{slug}.csv")).is_file());
        assert!(dir.join(format!("resumo_{slug}.json")).is_file());

        let points = read_monthly_series(&monthly_series_path(&config.output_dir, slug)).unwrap();
        assert_eq!(points.len(), 48);
        assert_eq!(points[0].period.to_string(), "2000-01");
        assert_eq!(points[47].period.to_string(), "2003-12");
    }

    let goianesia = summary.stations.iter().find(|s| s.slug == "goianesia").unwrap();
    assert_eq!(goianesia.station, "Goianésia");
    assert_eq!(goianesia.records, 4 * 365 + 1);
    assert_eq!(goianesia.first_year, 2000);
    assert_eq!(goianesia.last_year, 2003);
    assert!(goianesia.missing_months.is_empty());
    assert_eq!(goianesia.outputs.len(), 13);

    let json = fs::read_to_string(config.output_dir.join("goianesia/resumo_goianesia.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["records"], 4 * 365 + 1);
}

#[test]
fn test_parallel_process_matches_sequential() {
    let (_root, config) = two_stations();
    let sequential = station::process(&config, &ParallelConfig::default()).unwrap();
    // map() falls back to Rayon's default pool when none was configured
    let parallel = station::process(&config, &ParallelConfig::with_threads(2)).unwrap();

    let names = |s: &station::ProcessSummary| s.stations.iter().map(|x| x.slug.clone()).collect::<Vec<_>>();
    assert_eq!(names(&sequential), names(&parallel));
    for (a, b) in sequential.stations.iter().zip(&parallel.stations) {
        assert_eq!(a.total_precip_mm, b.total_precip_mm);
    }
}

#[test]
fn test_downstream_stages() {
    let (_root, config) = two_stations();
    station::process(&config, &ParallelConfig::default()).unwrap();

    let comparison = comparison::compare(&config).unwrap();
    assert_eq!(comparison.stations.len(), 2);
    assert_eq!(comparison.variation.len(), 2);
    assert_eq!(comparison.outputs.len(), 8);
    for path in &comparison.outputs {
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(config
        .output_dir
        .join(COMPARISON_DIR)
        .join("estatisticas_descritivas.csv")
        .is_file());

    let models = glm::glm(&config).unwrap();
    let metrics_path = config.output_dir.join(GLM_DIR).join("metricas_glm.csv");
    assert_eq!(models.metrics_path.as_deref(), Some(metrics_path.as_path()));
    for station in ["Goianésia", "Campo Alegre de Goiás"] {
        for family in ["Gamma", "Gaussian"] {
            assert!(
                models
                    .metrics
                    .iter()
                    .any(|row| row.station == station && row.family == family),
                "no {family} model for {station}"
            );
        }
    }
    let csv = fs::read_to_string(&metrics_path).unwrap();
    assert!(csv.starts_with("Estação,Distribuição,MAE Treino"));
    assert_eq!(csv.lines().filter(|line| line.contains(",Gamma,")).count(), 2);
    assert!(config
        .output_dir
        .join(GLM_DIR)
        .join("goianesia")
        .join("modelo_gamma.json")
        .is_file());
    let gaussian_dir = config.output_dir.join(GLM_DIR).join("goianesia");
    assert!(gaussian_dir.join("modelo_gaussian.json").is_file());
    assert!(gaussian_dir.join("03_diagnostico_residuos_gaussian.svg").is_file());

    let adf = stationarity::stationarity(&config).unwrap();
    assert_eq!(adf.rows.len(), 2);
    for row in &adf.rows {
        assert_eq!(row.months, 48);
        assert_eq!(row.stationary, row.differencing == 0);
        assert_eq!(row.suggestion, format!("ARIMA(1,{},1)", row.differencing));
    }
    assert!(config
        .output_dir
        .join(STATIONARITY_DIR)
        .join("adf_resultados.csv")
        .is_file());
    assert!(config.output_dir.join("goianesia/acf_pacf.svg").is_file());
}

#[test]
fn test_compare_needs_two_stations() {
    let (_root, config) = setup(&[("goianesia33000001.txt", 5)]);
    station::process(&config, &ParallelConfig::default()).unwrap();

    let err = comparison::compare(&config).unwrap_err();
    assert!(matches!(
        err,
        HidroError::InsufficientData { needed: 2, got: 1, .. }
    ));
}

#[test]
fn test_stages_without_series_do_nothing() {
    let (_root, config) = setup(&[]);
    let summary = station::process(&config, &ParallelConfig::default()).unwrap();
    assert!(summary.stations.is_empty());

    assert!(glm::glm(&config).unwrap().metrics.is_empty());
    assert!(stationarity::stationarity(&config).unwrap().rows.is_empty());
}

#[test]
fn test_inspect_lists_stations() {
    let (_root, config) = two_stations();
    fs::write(config.data_dir.join("quebrado33000009.txt"), "sem cabecalho\n").unwrap();

    let inventory = inspect(&config).unwrap();
    assert_eq!(inventory.stations.len(), 2);
    assert_eq!(inventory.unreadable.len(), 1);
    let first = &inventory.stations[0];
    assert_eq!(first.records, 4 * 365 + 1);
    assert_eq!(first.months, 48);
    assert_eq!(first.missing_months, 0);
    // Nothing is written by inspect
    assert!(!config.output_dir.exists());
}

#[test]
fn test_clean_charts_keeps_tables_and_directories() {
    let (_root, config) = two_stations();
    station::process(&config, &ParallelConfig::default()).unwrap();
    let station_dir = config.output_dir.join("goianesia");
    assert_eq!(files_with_extension(&station_dir, "svg").len(), 9);

    let mut output = Vec::new();
    let report = run_clean(
        &config.output_dir,
        &config,
        CleanMode::Charts,
        CleanOptions {
            assume_yes: true,
            dry_run: false,
        },
        &mut Cursor::new(Vec::new()),
        &mut output,
    )
    .unwrap();

    assert_eq!(report.matched.len(), 18);
    assert_eq!(report.removed, 18);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);
    assert!(station_dir.is_dir());
    assert!(files_with_extension(&station_dir, "svg").is_empty());
    assert_eq!(files_with_extension(&station_dir, "csv").len(), 3);
    assert_eq!(files_with_extension(&station_dir, "json").len(), 1);
}

#[test]
fn test_clean_dry_run_and_declined_prompt_keep_files() {
    let (_root, config) = two_stations();
    station::process(&config, &ParallelConfig::default()).unwrap();
    let station_dir = config.output_dir.join("campoalegre");

    let mut output = Vec::new();
    let report = run_clean(
        &config.output_dir,
        &config,
        CleanMode::Tables,
        CleanOptions {
            assume_yes: false,
            dry_run: true,
        },
        &mut Cursor::new(Vec::new()),
        &mut output,
    )
    .unwrap();
    assert_eq!(report.matched.len(), 8);
    assert_eq!(report.removed, 0);
    assert_eq!(files_with_extension(&station_dir, "csv").len(), 3);
    let listing = String::from_utf8(output).unwrap();
    assert!(listing.contains("resumo_campoalegre.json"));

    let mut output = Vec::new();
    let report = run_clean(
        &config.output_dir,
        &config,
        CleanMode::All,
        CleanOptions::default(),
        &mut Cursor::new(b"n\n".to_vec()),
        &mut output,
    )
    .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.removed, 0);
    assert_eq!(files_with_extension(&station_dir, "svg").len(), 9);
    assert!(String::from_utf8(output).unwrap().contains("Cancelled."));

    let report = run_clean(
        &config.output_dir,
        &config,
        CleanMode::All,
        CleanOptions::default(),
        &mut Cursor::new(b"sim\n".to_vec()),
        &mut Vec::new(),
    )
    .unwrap();
    assert_eq!(report.removed, 26);
    assert!(files_with_extension(&station_dir, "svg").is_empty());
}

#[test]
fn test_clean_missing_output_dir() {
    let (_root, config) = two_stations();
    let err = run_clean(
        &config.output_dir,
        &config,
        CleanMode::All,
        CleanOptions::default(),
        &mut Cursor::new(Vec::new()),
        &mut Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, HidroError::OutputDirMissing { .. }));
}

#[test]
fn test_clean_leaves_unrelated_files() {
    let (_root, config) = two_stations();
    let notes = config.output_dir.join("goianesia");
    fs::create_dir_all(&notes).unwrap();
    fs::write(notes.join("notas.txt"), "manter").unwrap();
    fs::write(notes.join("figura.PNG"), "x").unwrap();
    let nested = notes.join("antigo");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("velho.svg"), "x").unwrap();

    let report = run_clean(
        &config.output_dir,
        &config,
        CleanMode::Charts,
        CleanOptions {
            assume_yes: true,
            dry_run: false,
        },
        &mut Cursor::new(Vec::new()),
        &mut Vec::new(),
    )
    .unwrap();
    assert_eq!(report.removed, 1);
    assert!(notes.join("notas.txt").is_file());
    assert!(nested.join("velho.svg").is_file());
}
