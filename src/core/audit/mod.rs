mod types;

pub use types::{AuditCategory, AuditDetail, AuditRecord, format_elapsed, format_rfc1123};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Append-only JSON log of deployment runs, one file per category.
///
/// Appends are serialized inside the process and land through a temp file
/// renamed over the log, so readers never see a half-written array.
#[derive(Clone)]
pub struct AuditStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl AuditStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: AuditCategory) -> PathBuf {
        self.dir.join(category.file_name())
    }

    /// All records of `category`, oldest first. Missing or unreadable logs
    /// read as empty.
    pub async fn read_all(&self, category: AuditCategory) -> Vec<AuditRecord> {
        let path = self.path_for(category);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} audit log yet at {}", category.as_str(), path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read audit log {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse audit log {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Add `record` at the end of the category log. A log that cannot be read
    /// or parsed is moved aside to `<file>.corrupt-<uuid>` and a new one started.
    pub async fn append(&self, category: AuditCategory, record: AuditRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create log directory {}", self.dir.display()))?;

        let mut records = self.load_for_append(category).await?;
        records.push(record);

        let content = serde_json::to_string_pretty(&records)?;
        let path = self.path_for(category);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            category.file_name(),
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("failed to replace {}", path.display()));
        }
        Ok(())
    }

    async fn load_for_append(&self, category: AuditCategory) -> Result<Vec<AuditRecord>> {
        let path = self.path_for(category);
        let parsed = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<Vec<AuditRecord>>(&content)
                .map_err(|e| e.to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(records) => Ok(records),
            Err(reason) => {
                let aside = self.dir.join(format!(
                    "{}.corrupt-{}",
                    category.file_name(),
                    uuid::Uuid::new_v4().simple()
                ));
                tokio::fs::rename(&path, &aside).await.with_context(|| {
                    format!("failed to move unreadable audit log {} aside", path.display())
                })?;
                warn!(
                    "Audit log {} was unreadable ({}), kept as {}",
                    path.display(),
                    reason,
                    aside.display()
                );
                Ok(Vec::new())
            }
        }
    }
}
