use std::time::Duration;

use assert_matches::assert_matches;

use covid_series::config::{ConfigLoader, default_countries};
use covid_series::error::CovidError;

#[test]
fn explicit_config_file_is_loaded() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("covid-series.json");
    std::fs::write(
        &path,
        r#"{"data_dir": "snapshots", "timeout_secs": 5, "countries": ["Chad"]}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.data_dir.as_str(), "snapshots");
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(resolved.max_retries, 3);
    assert_eq!(resolved.countries, vec!["Chad".to_string()]);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CovidError::ConfigRead(_))
    );
}

#[test]
fn invalid_json_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "{ countries: }").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CovidError::ConfigParse(_))
    );
}

#[test]
fn default_countries_match_cli_default() {
    assert_eq!(
        default_countries(),
        vec!["Portugal", "Italy", "Spain", "US"]
    );
}
