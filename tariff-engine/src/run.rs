//! One competitor run: pages in, validated products and packs out, one log
//! record always.
//!
//! The run is all-or-nothing. Products and packs reach the sink only after
//! every category extracted, the batch validated and packs were synthesized;
//! any failure leaves a single `failed` log record naming the step.

use chrono::{Local, NaiveDate};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tariff_common::{
    FileKind, LogRecord, PackRecord, PageProvider, ProductCategory, ProductRecord, Result,
    RunStatus, ScrapeError,
};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::competitor::{CategoryPage, CompetitorPlan};
use crate::extract::ExtractContext;
use crate::fetch::DocumentSource;
use crate::packs::synthesize;
use crate::sink::RunSink;
use crate::validate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    /// Opening the browser session shared by every page of the run.
    AcquireSession,
    AcquirePage(ProductCategory),
    Extract(ProductCategory),
    Validate,
    ComputeCombo,
    SynthesizePacks,
    Persist,
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcquireSession => f.write_str("acquire browser session"),
            Self::AcquirePage(c) => write!(f, "acquire {c} page"),
            Self::Extract(c) => write!(f, "extract {c}"),
            Self::Validate => f.write_str("validate products"),
            Self::ComputeCombo => f.write_str("compute combo advantage"),
            Self::SynthesizePacks => f.write_str("synthesize packs"),
            Self::Persist => f.write_str("persist outputs"),
        }
    }
}

#[derive(Debug)]
struct StepFailure {
    step: RunStep,
    error: ScrapeError,
}

fn at(step: RunStep) -> impl Fn(ScrapeError) -> StepFailure {
    move |error| StepFailure { step, error }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub log: LogRecord,
    pub products: usize,
    pub packs: usize,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.log.status == RunStatus::Success
    }
}

pub struct RunCoordinator {
    pages: Arc<dyn PageProvider>,
    documents: Arc<dyn DocumentSource>,
    sink: Arc<dyn RunSink>,
    date: Option<NaiveDate>,
}

impl RunCoordinator {
    pub fn new(
        pages: Arc<dyn PageProvider>,
        documents: Arc<dyn DocumentSource>,
        sink: Arc<dyn RunSink>,
    ) -> Self {
        Self {
            pages,
            documents,
            sink,
            date: None,
        }
    }

    /// Stamp records with `date` instead of today's local date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Run `plan` to completion. The returned error only means the log record
    /// itself could not be persisted; run failures are reported in the outcome.
    pub async fn run(&self, plan: &CompetitorPlan) -> Result<RunOutcome> {
        let span = tracing::info_span!("run", competitor = %plan.name, run_id = %Uuid::new_v4());
        self.run_inner(plan).instrument(span).await
    }

    async fn run_inner(&self, plan: &CompetitorPlan) -> Result<RunOutcome> {
        let scraped_at = self.date.unwrap_or_else(|| Local::now().date_naive());
        let started = Instant::now();
        info!(%scraped_at, pages = plan.pages.len(), "run.start");

        let result = self.execute(plan, scraped_at).await;
        let elapsed = started.elapsed();

        let (log, products, packs) = match result {
            Ok((products, packs)) => {
                info!(products, packs, elapsed_ms = elapsed.as_millis() as u64, "run.success");
                (LogRecord::success(&plan.name, scraped_at), products, packs)
            }
            Err(StepFailure { step, error }) => {
                error!(
                    step = %step,
                    kind = error.kind(),
                    error = %error,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run.failed"
                );
                (
                    LogRecord::failed(&plan.name, scraped_at, format!("{step}: {error}")),
                    0,
                    0,
                )
            }
        };

        write_log(self.sink.as_ref(), &log)?;

        Ok(RunOutcome {
            log,
            products,
            packs,
            elapsed,
        })
    }

    async fn execute(
        &self,
        plan: &CompetitorPlan,
        scraped_at: NaiveDate,
    ) -> std::result::Result<(usize, usize), StepFailure> {
        let mut products = Vec::new();
        for page in &plan.pages {
            let records = self.extract_page(plan, page, scraped_at).await?;
            products.extend(records);
        }

        let products = validate(products).map_err(|e| at(RunStep::Validate)(e.into()))?;
        info!(count = products.len(), "run.validated");

        let combo = self.combo_advantage(plan).await?;
        let packs = synthesize(&products, combo, plan.combo_url.as_str())
            .map_err(at(RunStep::SynthesizePacks))?;
        info!(count = packs.len(), combo, "run.packs");

        self.persist(plan, &products, &packs)
            .map_err(at(RunStep::Persist))?;
        Ok((products.len(), packs.len()))
    }

    async fn extract_page(
        &self,
        plan: &CompetitorPlan,
        page: &CategoryPage,
        scraped_at: NaiveDate,
    ) -> std::result::Result<Vec<ProductRecord>, StepFailure> {
        let category = page.category;
        let extractor = plan.extractors.get(category).ok_or_else(|| {
            at(RunStep::Extract(category))(ScrapeError::Config(format!(
                "no {category} extractor for {}",
                plan.name
            )))
        })?;

        info!(%category, url = %page.url, "run.page");
        if plan.preflight {
            self.documents
                .probe(&page.url)
                .await
                .map_err(at(RunStep::AcquirePage(category)))?;
        }
        let mut handle = self
            .pages
            .acquire(&page.url)
            .await
            .map_err(at(RunStep::AcquirePage(category)))?;

        let ctx = ExtractContext {
            competitor: plan.name.clone(),
            url: page.url.clone(),
            scraped_at,
        };
        let result = extractor.extract(&mut *handle, &ctx).await;
        if let Err(e) = handle.close().await {
            warn!(%category, url = %page.url, error = %e, "run.page.close_failed");
        }

        let records = result.map_err(at(RunStep::Extract(category)))?;
        info!(%category, count = records.len(), "run.extracted");
        Ok(records)
    }

    async fn combo_advantage(&self, plan: &CompetitorPlan) -> std::result::Result<f64, StepFailure> {
        let html = self
            .documents
            .fetch(&plan.combo_url)
            .await
            .map_err(at(RunStep::ComputeCombo))?;
        plan.extractors
            .combo
            .parse(&html, &plan.combo_url)
            .map_err(at(RunStep::ComputeCombo))
    }

    fn persist(
        &self,
        plan: &CompetitorPlan,
        products: &[ProductRecord],
        packs: &[PackRecord],
    ) -> Result<()> {
        let products = FileKind::Products
            .payload(products)
            .map_err(|e| persistence(FileKind::Products, e))?;
        let packs = FileKind::Packs
            .payload(packs)
            .map_err(|e| persistence(FileKind::Packs, e))?;

        self.sink.write(&plan.name, FileKind::Products, &products)?;
        if let Err(e) = self.sink.write(&plan.name, FileKind::Packs, &packs) {
            if let Err(undo) = self.sink.discard(&plan.name, FileKind::Products) {
                warn!(error = %undo, "run.discard_failed");
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Log a run of `competitor` that failed at `step` before the coordinator
/// could start it, so every failed run still leaves one log record.
pub fn record_failed_run(
    sink: &dyn RunSink,
    competitor: &str,
    scraped_at: NaiveDate,
    step: RunStep,
    error: &ScrapeError,
) -> Result<LogRecord> {
    error!(%competitor, step = %step, kind = error.kind(), error = %error, "run.failed");
    let log = LogRecord::failed(competitor, scraped_at, format!("{step}: {error}"));
    write_log(sink, &log)?;
    Ok(log)
}

fn write_log(sink: &dyn RunSink, log: &LogRecord) -> Result<()> {
    let payload = FileKind::Logs
        .payload(std::slice::from_ref(log))
        .map_err(|e| persistence(FileKind::Logs, e))?;
    sink.write(&log.competitor_name, FileKind::Logs, &payload)
}

fn persistence(kind: FileKind, err: serde_json::Error) -> ScrapeError {
    ScrapeError::Persistence {
        target: kind.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_read_as_error_prefixes() {
        assert_eq!(
            RunStep::AcquirePage(ProductCategory::MobilePrepaid).to_string(),
            "acquire mobile_prepaid page"
        );
        assert_eq!(RunStep::Validate.to_string(), "validate products");
        assert_eq!(RunStep::AcquireSession.to_string(), "acquire browser session");
    }
}
