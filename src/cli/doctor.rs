use anyhow::Result;

use super::CommandFlags;
use crate::core::audit::AuditStore;
use crate::core::config::AppConfig;
use crate::core::deploy::Deployer;
use crate::core::process::Executable;
use crate::core::terminal::{print_error, print_info, print_status, print_step, print_success, print_warn};
use crate::core::watch::{WatchKind, WatchList};

/// Check that this host can actually run deployments.
/// Returns `true` if nothing critical is missing.
pub async fn run(flags: &CommandFlags) -> Result<bool> {
    let config_path = AppConfig::resolve_path(flags.config.as_deref());
    print_step(&format!("Checking {}", config_path.display()));
    let config = match AppConfig::load(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("{:#}", e));
            return Ok(false);
        }
    };
    print_success("Config parsed.");

    let mut healthy = true;

    for warning in config.validate() {
        print_warn(&warning);
    }

    // 1. Checkout root
    let deployer = Deployer::from_config(&config.prolific);
    if deployer.root_path().is_dir() {
        print_success(&format!("Root path {} exists.", deployer.root_path().display()));
    } else {
        print_error(&format!(
            "Root path {} does not exist.",
            deployer.root_path().display()
        ));
        healthy = false;
    }

    // 2. Step programs
    print_status("template", &format!("{:?}", config.prolific.template).to_lowercase());
    for program in deployer.required_programs() {
        match Executable::resolve(program, None) {
            Ok(exe) if exe.exists() => {
                print_success(&format!("{} found at {}", program, exe.path.display()))
            }
            _ => {
                print_error(&format!("{} not found on PATH.", program));
                healthy = false;
            }
        }
    }

    // 3. Watch-lists
    let watch = WatchList::from_config(&config.watch);
    for kind in WatchKind::ALL {
        let entries = watch.entries(kind);
        if entries.is_empty() {
            print_warn(&format!("watch.{} is empty.", kind.key()));
        } else {
            print_status(kind.key(), &entries.join(", "));
        }
    }

    // 4. Audit directory
    let audit = AuditStore::new(&config.prolific.logs_dir);
    if audit.dir().is_dir() {
        print_success(&format!("Logs directory {} exists.", audit.dir().display()));
    } else {
        print_info(&format!(
            "Logs directory {} will be created on first start.",
            audit.dir().display()
        ));
    }

    println!();
    if healthy {
        print_success("Ready to deploy.");
    } else {
        print_error("Some checks failed.");
    }
    Ok(healthy)
}
