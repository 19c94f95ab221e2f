//! Persistence collaborator for run outputs.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tariff_common::{FileKind, Result, ScrapeError};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Receives `{"<kind>": [...]}` payloads for one competitor.
pub trait RunSink: Send + Sync {
    fn write(&self, competitor: &str, kind: FileKind, payload: &Value) -> Result<()>;

    /// Withdraw a payload written earlier in a run that later failed.
    fn discard(&self, competitor: &str, kind: FileKind) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkFormat {
    /// One pretty-printed document.
    #[default]
    Json,
    /// One record per line.
    Ndjson,
}

impl SinkFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }
}

/// Writes `<dir>/<competitor>_<kind>.<ext>`, replacing any previous file
/// atomically.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    format: SinkFormat,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>, format: SinkFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn path_for(&self, competitor: &str, kind: FileKind) -> PathBuf {
        self.dir
            .join(format!("{competitor}_{kind}.{}", self.format.extension()))
    }

    fn render(&self, kind: FileKind, payload: &Value) -> std::result::Result<Vec<u8>, String> {
        match self.format {
            SinkFormat::Json => serde_json::to_vec_pretty(payload).map_err(|e| e.to_string()),
            SinkFormat::Ndjson => {
                let records = payload
                    .get(kind.as_str())
                    .and_then(Value::as_array)
                    .ok_or_else(|| format!("payload has no `{kind}` list"))?;
                let mut out = Vec::new();
                for record in records {
                    serde_json::to_writer(&mut out, record).map_err(|e| e.to_string())?;
                    out.push(b'\n');
                }
                Ok(out)
            }
        }
    }
}

fn persist(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

impl RunSink for JsonFileSink {
    fn write(&self, competitor: &str, kind: FileKind, payload: &Value) -> Result<()> {
        let target = self.path_for(competitor, kind);
        let failed = |message: String| ScrapeError::Persistence {
            target: target.display().to_string(),
            message,
        };
        let bytes = self.render(kind, payload).map_err(failed)?;
        persist(&self.dir, &target, &bytes).map_err(|e| failed(e.to_string()))?;
        info!(path = %target.display(), kind = %kind, bytes = bytes.len(), "sink.write");
        Ok(())
    }

    fn discard(&self, competitor: &str, kind: FileKind) -> Result<()> {
        let target = self.path_for(competitor, kind);
        match fs::remove_file(&target) {
            Ok(()) => {
                warn!(path = %target.display(), "sink.discard");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScrapeError::Persistence {
                target: target.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
