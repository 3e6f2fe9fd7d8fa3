//! Tests for station file discovery and parsing

use chrono::NaiveDate;
use hidroanalise::{
    config::Config,
    errors::HidroError,
    ingest::{
        decode_latin1, discover_station_files, load_station_file, parse_decimal,
        parse_station_text, station_from_path, Station,
    },
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn station(slug: &str) -> Station {
    Station {
        slug: slug.to_string(),
        name: slug.to_string(),
        source: PathBuf::from(format!("{slug}.txt")),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const SAMPLE: &str = "\
Estação: GOIANESIA
Código: 33000001
Responsável: ANA

Data Precipitacao
01/01/2000 12,5
02/01/2000 0.0
lixo sem data
03/01/2000 ---

04/01/2000 3,2 1
";

#[test]
fn test_parse_station_text_basic() {
    let series = parse_station_text(SAMPLE, station("goianesia")).unwrap();

    assert_eq!(series.records.len(), 3);
    assert_eq!(series.records[0].date, date(2000, 1, 1));
    assert!((series.records[0].precip_mm - 12.5).abs() < 1e-12);
    assert_eq!(series.records[1].precip_mm, 0.0);
    assert_eq!(series.records[2].date, date(2000, 1, 4));
    assert!((series.records[2].precip_mm - 3.2).abs() < 1e-12);
    // "lixo sem data" and the "---" value
    assert_eq!(series.skipped_lines, 2);
    assert_eq!(series.duplicate_days, 0);
    assert!((series.total_precip() - 15.7).abs() < 1e-9);
}

#[test]
fn test_parse_sorts_and_keeps_first_duplicate() {
    let text = "Data Precip\n05/03/2001 1,0\n01/03/2001 2,0\n05/03/2001 9,0\n";
    let series = parse_station_text(text, station("x")).unwrap();

    assert_eq!(series.records.len(), 2);
    assert_eq!(series.records[0].date, date(2001, 3, 1));
    assert_eq!(series.records[1].date, date(2001, 3, 5));
    assert_eq!(series.records[1].precip_mm, 1.0);
    assert_eq!(series.duplicate_days, 1);
    assert_eq!(series.first_date(), Some(date(2001, 3, 1)));
    assert_eq!(series.last_date(), Some(date(2001, 3, 5)));
    assert_eq!(series.year_span(), Some((2001, 2001)));
}

#[test]
fn test_missing_header_and_no_records() {
    let err = parse_station_text("01/01/2000 1,0\n", station("x")).unwrap_err();
    assert!(matches!(err, HidroError::MissingHeader { .. }));

    let err = parse_station_text("cabecalho\nData Precip\nnada aqui\n", station("x")).unwrap_err();
    assert!(matches!(err, HidroError::NoRecords { .. }));
}

#[test]
fn test_parse_decimal() {
    assert_eq!(parse_decimal("12,5"), Some(12.5));
    assert_eq!(parse_decimal("0.25"), Some(0.25));
    assert_eq!(parse_decimal("7"), Some(7.0));
    assert_eq!(parse_decimal(""), None);
    assert_eq!(parse_decimal("abc"), None);
    assert_eq!(parse_decimal("NaN"), None);
    assert_eq!(parse_decimal("inf"), None);
}

#[test]
fn test_decode_latin1() {
    // "Três" in ISO-8859-1
    let bytes = [b'T', b'r', 0xEA, b's'];
    assert_eq!(decode_latin1(&bytes), "Três");
}

#[test]
fn test_load_latin1_file_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("marzagao33000003.txt");
    let mut bytes = b"Esta\xe7\xe3o: MARZAG\xc3O\nData Chuva\n".to_vec();
    bytes.extend_from_slice(b"01/02/2010 4,5\n02/02/2010 0,0\n");
    fs::write(&path, bytes).unwrap();

    let config = Config::default();
    let station = station_from_path(&path, &config);
    let series = load_station_file(&path, station).unwrap();

    assert_eq!(series.station.slug, "marzagao");
    assert_eq!(series.station.name, "Marzagão");
    assert_eq!(series.station.source, path);
    assert_eq!(series.records.len(), 2);
}

#[test]
fn test_load_reports_file_path_on_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vazio33.txt");
    fs::write(&path, "sem cabecalho\n").unwrap();

    match load_station_file(&path, station("vazio")) {
        Err(HidroError::MissingHeader { path: reported }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_station_from_path() {
    let config = Config::default();

    let s = station_from_path(Path::new("data/campoalegre33567890.txt"), &config);
    assert_eq!(s.slug, "campoalegre");
    assert_eq!(s.name, "Campo Alegre de Goiás");

    // Unknown stations keep the name derived from the file
    let s = station_from_path(Path::new("data/rio_verde33111111.txt"), &config);
    assert_eq!(s.slug, "rio_verde");
    assert_eq!(s.name, "Rio Verde");
}

#[test]
fn test_discover_station_files() {
    let dir = tempdir().unwrap();
    for name in ["b33.txt", "a33.TXT", "notes.md", "c33.csv"] {
        fs::write(dir.path().join(name), "x").unwrap();
    }
    fs::create_dir(dir.path().join("sub.txt")).unwrap();

    let files = discover_station_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a33.TXT", "b33.txt"]);
}

#[test]
fn test_discover_missing_dir_is_error() {
    let dir = tempdir().unwrap();
    let err = discover_station_files(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, HidroError::Io(_)));
}
