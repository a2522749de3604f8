//! Integration tests for the data pipeline: CSV directory → universe → screen.

use serde_json::json;
use std::path::Path;

use screenlab_core::Criteria;
use screenlab_runner::{load_universe, LoadError, Screener, ScreenerConfig};

const HEADER: &str = "date,open,high,low,close,adj_close,volume";

fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut body = String::from(HEADER);
    body.push('\n');
    for (i, close) in closes.iter().enumerate() {
        let date = base + chrono::Duration::days(i as i64);
        body.push_str(&format!(
            "{date},{close},{},{},{close},{close},250000\n",
            close + 1.0,
            close - 1.0
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
}

#[test]
fn loads_directory_sorted_and_rejects_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "MSFT", &[10.0, 11.0, 12.0]);
    write_csv(dir.path(), "AAPL", &[20.0, 21.0]);
    std::fs::write(
        dir.path().join("BAD.csv"),
        format!("{HEADER}\n2024-01-03,1,1,1,1,1,1\n2024-01-02,1,1,1,1,1,1\n"),
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let loaded = load_universe(dir.path(), None).unwrap();
    assert_eq!(loaded.universe.symbols(), vec!["AAPL", "MSFT"]);
    assert_eq!(loaded.rejected.len(), 1);
    assert_eq!(loaded.rejected[0].0, "BAD");
}

#[test]
fn explicit_symbols_keep_requested_order() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "MSFT", &[10.0]);
    write_csv(dir.path(), "AAPL", &[20.0]);

    let wanted = vec!["msft".to_string(), "AAPL".to_string()];
    let loaded = load_universe(dir.path(), Some(&wanted)).unwrap();
    assert_eq!(loaded.universe.symbols(), vec!["MSFT", "AAPL"]);

    let missing = vec!["TSLA".to_string()];
    assert!(matches!(
        load_universe(dir.path(), Some(&missing)),
        Err(LoadError::MissingSymbol { .. })
    ));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("nope");
    assert!(matches!(load_universe(&gone, None), Err(LoadError::NotADirectory(_))));
}

#[test]
fn screen_loaded_universe() {
    let dir = tempfile::tempdir().unwrap();
    let rising: Vec<f64> = (0..80).map(|i| 30.0 + i as f64 * 0.25).collect();
    let falling: Vec<f64> = (0..80).map(|i| 90.0 - i as f64 * 0.25).collect();
    write_csv(dir.path(), "UP", &rising);
    write_csv(dir.path(), "DOWN", &falling);

    let loaded = load_universe(dir.path(), None).unwrap();
    let screener = Screener::new(&ScreenerConfig::default(), None).unwrap();
    let criteria =
        Criteria::from_value(json!({"indicators": {"ma": {"criteria": "ma20_above_ma50"}}}))
            .unwrap();
    let result = screener.screen(&criteria, &loaded.universe).unwrap();
    assert_eq!(result.symbols(), vec!["UP"]);
}
