//! Loader for `tariff.yaml` with environment overlays.
//!
//! Sources are merged in order: YAML file(s) or inline YAML, then
//! `TARIFF__`-prefixed environment variables (`__` separates nesting, e.g.
//! `TARIFF__BROWSER__HEADLESS=false`). `${VAR}` placeholders in any string are
//! expanded afterwards, so secrets and hostnames can stay out of the file.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct TariffConfig {
    #[serde(default, deserialize_with = "de_version")]
    pub version: Option<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub competitors: Vec<CompetitorSpec>,
}

impl TariffConfig {
    /// Enabled competitors, optionally narrowed to one name.
    pub fn selected<'a>(&'a self, only: Option<&'a str>) -> impl Iterator<Item = &'a CompetitorSpec> {
        self.competitors
            .iter()
            .filter(|c| c.is_enabled())
            .filter(move |c| only.is_none_or(|name| c.name == name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Ndjson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: default_log_format(),
            stderr: true,
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl BrowserConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            ready_timeout_ms: default_ready_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

/// One competitor to scrape.
#[derive(Debug, Clone, Deserialize)]
pub struct CompetitorSpec {
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Probe every URL with a plain GET before rendering it.
    #[serde(default)]
    pub preflight: Option<bool>,
    /// Cookie/consent control clicked after navigation.
    #[serde(default)]
    pub consent_selector: Option<String>,
    /// Extra words meaning "no limit" on this competitor's pages.
    #[serde(default)]
    pub unlimited_keywords: Vec<String>,
    #[serde(default)]
    pub pages: PageUrls,
}

impl CompetitorSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn preflight(&self) -> bool {
        self.preflight.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageUrls {
    #[serde(default)]
    pub mobile_prepaid: Option<Url>,
    #[serde(default)]
    pub mobile_subscription: Option<Url>,
    #[serde(default)]
    pub internet_subscription: Option<Url>,
    #[serde(default)]
    pub combo: Option<Url>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/raw_data")
}
fn default_log_format() -> String {
    "text".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_ready_timeout_ms() -> u64 {
    15_000
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_http_timeout_ms() -> u64 {
    15_000
}

/// Accept `version: 1`, `version: 0.1` and `version: "1"` alike.
fn de_version<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TariffConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for TariffConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TariffConfigLoader {
    /// Start with defaults: no files, `TARIFF__` environment overrides applied last.
    ///
    /// ```
    /// use tariff_config::TariffConfigLoader;
    ///
    /// let config = TariffConfigLoader::new()
    ///     .with_yaml_str("version: '1'\ncompetitors: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.competitors.is_empty());
    /// assert!(config.browser.headless);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "TARIFF".into(),
        }
    }

    /// Use a different environment prefix (tests isolate themselves this way).
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can run on environment
    /// variables alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use tariff_config::TariffConfigLoader;
    ///
    /// let cfg = TariffConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// competitors:
    ///   - name: mobileviking
    ///     pages:
    ///       combo: https://example.test/combo
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.competitors.len(), 1);
    /// assert!(cfg.competitors[0].is_enabled());
    /// assert!(cfg.competitors[0].pages.combo.is_some());
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<TariffConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("TARIFF_TEST_HOST", Some("mobilevikings.be"), || {
            let mut v = json!("https://${TARIFF_TEST_HOST}/en/offer/combo/");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("https://mobilevikings.be/en/offer/combo/"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("TT_KW", Some("unlimited")), ("TT_DIR", Some("/tmp/out"))],
            || {
                let mut v = json!([
                    "$TT_KW",
                    { "dir": "${TT_DIR}/raw" },
                    42,
                    true,
                    null
                ]);
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!(["unlimited", { "dir": "/tmp/out/raw" }, 42, true, null])
                );
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("TT_A", Some("${TT_B}")), ("TT_B", Some("${TT_A}"))], || {
            let mut v = json!("x=${TT_A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${TARIFF_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${TARIFF_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = TariffConfigLoader::new()
            .with_env_prefix("TARIFF_UNIT_DEFAULTS")
            .with_yaml_str("competitors: []")
            .load()
            .unwrap();
        assert_eq!(cfg.output.dir, PathBuf::from("data/raw_data"));
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(cfg.browser.webdriver_url, "http://localhost:9515");
        assert_eq!(cfg.browser.ready_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.http.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn selected_skips_disabled_and_filters_by_name() {
        let cfg = TariffConfigLoader::new()
            .with_env_prefix("TARIFF_UNIT_SELECTED")
            .with_yaml_str(
                r#"
competitors:
  - name: mobileviking
  - name: scarlet
    enabled: false
  - name: other
"#,
            )
            .load()
            .unwrap();
        let all: Vec<_> = cfg.selected(None).map(|c| c.name.as_str()).collect();
        assert_eq!(all, vec!["mobileviking", "other"]);
        let one: Vec<_> = cfg.selected(Some("other")).map(|c| c.name.as_str()).collect();
        assert_eq!(one, vec!["other"]);
    }
}
