mod doctor;
mod logs;
mod serve;

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use crate::core::terminal::{self, print_error};

fn print_help() {
    terminal::print_banner();

    terminal::print_commands(
        "Service",
        &[
            ("serve", "Receive GitHub webhooks and deploy merged pull requests"),
            ("logs", "Print the deployment audit log"),
        ],
    );
    terminal::print_commands(
        "Diagnostics",
        &[
            ("doctor", "Check checkout root, tools and watch-lists"),
            ("help", "Show this help"),
        ],
    );
    terminal::print_commands(
        "Options",
        &[
            ("--config <path>", "Config file (default: $PROLIFIC_CONFIG or ./prolific.toml)"),
            ("--host <addr>", "Override server.host"),
            ("--port <port>", "Override server.port"),
            ("--verbose", "Debug logging"),
        ],
    );

    println!(
        " {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("prolific").green()
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandFlags {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: bool,
}

pub(crate) fn parse_command_flags(args: &[String], start: usize) -> CommandFlags {
    let mut flags = CommandFlags::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    flags.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--host" => {
                if i + 1 < args.len() {
                    flags.host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--port" => {
                if i + 1 < args.len() {
                    flags.port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                flags.verbose = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    flags
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");
    let flags = parse_command_flags(&args, 2);

    match cmd {
        "serve" => serve::run(&flags).await,
        "logs" => logs::run(&flags).await,
        "doctor" => {
            if !doctor::run(&flags).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}
