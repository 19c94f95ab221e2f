use anyhow::{Result, bail};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tariff_common::observability::{LogConfig, LogFormat, init_logging};
use tariff_config::{OutputFormat, TariffConfig, TariffConfigLoader};
use tariff_drivers::{DriverSettings, TariffDriver};
use tariff_engine::{JsonFileSink, RunCoordinator, RunStep, SinkFormat, record_failed_run};
use tariff_http::HttpClient;
use tracing::{error, info, warn};

mod plan;

/// Scrape competitor tariffs and write products, packs and run logs.
#[derive(Debug, Parser)]
#[command(name = "tariff", version)]
struct Args {
    /// YAML configuration file.
    #[arg(short, long, env = "TARIFF_CONFIG", default_value = "tariff.yaml")]
    config: PathBuf,

    /// Run only this competitor.
    #[arg(long)]
    competitor: Option<String>,

    /// Override `output.dir`.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn log_config(cfg: &TariffConfig) -> LogConfig {
    LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::from_name(&cfg.logging.format),
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Config (env wins over file)
    let cfg = TariffConfigLoader::new().with_file(&args.config).load()?;
    let log_path = init_logging(log_config(&cfg))?;
    info!(config = %args.config.display(), log = %log_path.display(), "app.start");

    // 2) Plans; configuration problems surface before a browser is started
    let selected: Vec<_> = cfg.selected(args.competitor.as_deref()).collect();
    if selected.is_empty() {
        bail!("no enabled competitor matches the selection");
    }
    let plans = selected
        .iter()
        .map(|spec| plan::plan_for(spec))
        .collect::<Result<Vec<_>, _>>()?;

    // 3) Collaborators
    let documents = Arc::new(HttpClient::new()?.with_timeout(cfg.http.timeout()));
    let format = match cfg.output.format {
        OutputFormat::Json => SinkFormat::Json,
        OutputFormat::Ndjson => SinkFormat::Ndjson,
    };
    let output_dir = args.output_dir.unwrap_or_else(|| cfg.output.dir.clone());
    let sink = Arc::new(JsonFileSink::new(&output_dir, format));

    let connected = TariffDriver::connect(DriverSettings {
        webdriver_url: cfg.browser.webdriver_url.clone(),
        headless: cfg.browser.headless,
        ready_timeout: cfg.browser.ready_timeout(),
        poll_interval: cfg.browser.poll_interval(),
    })
    .await;
    let driver = match connected {
        Ok(driver) => driver,
        Err(e) => {
            // every selected run failed before it started; each still gets its log record
            let today = Local::now().date_naive();
            for plan in &plans {
                if let Err(log_err) =
                    record_failed_run(sink.as_ref(), &plan.name, today, RunStep::AcquireSession, &e)
                {
                    error!(competitor = %plan.name, error = %log_err, "app.run.log_lost");
                }
            }
            bail!("browser session unavailable: {e}");
        }
    };

    // 4) Runs, one competitor at a time
    let mut failed = 0usize;
    for (spec, plan) in selected.iter().zip(&plans) {
        let pages = Arc::new(driver.with_consent(spec.consent_selector.clone()));
        let coordinator = RunCoordinator::new(pages, documents.clone(), sink.clone());
        match coordinator.run(plan).await {
            Ok(outcome) if outcome.is_success() => info!(
                competitor = %plan.name,
                products = outcome.products,
                packs = outcome.packs,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "app.run.done"
            ),
            Ok(outcome) => {
                failed += 1;
                warn!(competitor = %plan.name, details = %outcome.log.error_details, "app.run.failed");
            }
            Err(e) => {
                failed += 1;
                error!(competitor = %plan.name, error = %e, "app.run.log_lost");
            }
        }
    }

    if let Err(e) = driver.close().await {
        warn!(error = %e, "app.driver.close_failed");
    }

    if failed > 0 {
        bail!("{failed} of {} competitor runs failed", plans.len());
    }
    info!(output = %output_dir.display(), "app.done");
    Ok(())
}
