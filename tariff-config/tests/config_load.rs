use serial_test::serial;
use std::{fs, path::PathBuf};
use tariff_config::{OutputFormat, TariffConfigLoader};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r##"
version: 0.1
output:
  dir: data/raw_data
  format: ndjson
browser:
  headless: true
  ready_timeout_ms: 8000
competitors:
  - name: mobileviking
    enabled: true
    consent_selector: "#btn-accept-cookies"
    unlimited_keywords: ["unlimited", "onbeperkt"]
    pages:
      mobile_prepaid: https://${TARIFF_IT_HOST}/en/offer/prepaid/
      mobile_subscription: https://${TARIFF_IT_HOST}/en/offer/subscriptions/
      internet_subscription: https://${TARIFF_IT_HOST}/en/offer/internet/
      combo: https://${TARIFF_IT_HOST}/en/offer/combo/
"##;

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "tariff.yaml", FILE_YAML);

    temp_env::with_var("TARIFF_IT_HOST", Some("mobilevikings.be"), || {
        let config = TariffConfigLoader::new()
            .with_env_prefix("TARIFF_IT_LOAD")
            .with_file(&p)
            .load()
            .expect("load tariff config");

        assert_eq!(config.version.as_deref(), Some("0.1"));
        assert_eq!(config.output.format, OutputFormat::Ndjson);
        assert_eq!(config.browser.ready_timeout_ms, 8000);

        let mv = &config.competitors[0];
        assert_eq!(mv.name, "mobileviking");
        assert!(mv.preflight());
        assert_eq!(mv.unlimited_keywords, vec!["unlimited", "onbeperkt"]);
        assert_eq!(
            mv.pages.combo.as_ref().map(|u| u.as_str()),
            Some("https://mobilevikings.be/en/offer/combo/")
        );
    });
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "tariff.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("TARIFF_IT_HOST", Some("mobilevikings.be")),
            ("TARIFF_IT_ENV__BROWSER__HEADLESS", Some("false")),
            ("TARIFF_IT_ENV__BROWSER__WEBDRIVER_URL", Some("http://chrome:4444")),
        ],
        || {
            let config = TariffConfigLoader::new()
                .with_env_prefix("TARIFF_IT_ENV")
                .with_file(&p)
                .load()
                .expect("load tariff config");

            assert!(!config.browser.headless);
            assert_eq!(config.browser.webdriver_url, "http://chrome:4444");
            assert_eq!(config.browser.ready_timeout_ms, 8000);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_is_fine() {
    let tmp = TempDir::new().unwrap();
    let config = TariffConfigLoader::new()
        .with_env_prefix("TARIFF_IT_OPTIONAL")
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults only");
    assert!(config.competitors.is_empty());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = TariffConfigLoader::new()
        .with_env_prefix("TARIFF_IT_REQUIRED")
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
