use anyhow::Result;

use super::CommandFlags;
use crate::core::audit::{AuditCategory, AuditStore};
use crate::core::config::AppConfig;
use crate::core::terminal::print_info;

pub async fn run(flags: &CommandFlags) -> Result<()> {
    let config = AppConfig::load(AppConfig::resolve_path(flags.config.as_deref())).await?;
    let store = AuditStore::new(&config.prolific.logs_dir);
    let records = store.read_all(AuditCategory::GitHub).await;

    if records.is_empty() {
        print_info(&format!(
            "No deployments recorded in {}",
            store.path_for(AuditCategory::GitHub).display()
        ));
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
