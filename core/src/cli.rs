use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::driver::{self, DriverOptions};
use crate::host::{collect_script_files, compile_source, DrainPolicy, Outcome, ScriptHost};
use crate::script::{json_to_val, parse_script, Val};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - frame-driven script host with suspendable continuations", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load scripts, start the entry function and drive frames until done
    Run {
        /// Script files or directories (default: scripts.paths from config)
        scripts: Vec<PathBuf>,

        /// Entry function to start as a continuation
        #[arg(short = 'e', long = "entry")]
        entry: Option<String>,

        /// Argument passed to the entry function (JSON, repeatable)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// all_due or one_per_tick
        #[arg(long)]
        drain_policy: Option<DrainPolicy>,

        /// Simulation time speed relative to real time
        #[arg(long)]
        time_scale: Option<f64>,

        /// Keep ticking after every continuation has finished
        #[arg(long)]
        keep_alive: bool,
    },

    /// Parse and compile scripts without running them
    Check {
        /// Script files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print each script's syntax tree as JSON
        #[arg(long)]
        ast: bool,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

/// Install the log subscriber; `RUST_LOG` wins over the configured filter
pub fn init_tracing(fallback_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Convert `--arg` JSON strings into script values
pub fn parse_script_args(args: &[String]) -> Result<Vec<Val>> {
    args.iter()
        .map(|raw| {
            let json: serde_json::Value = serde_json::from_str(raw)
                .with_context(|| format!("Invalid JSON argument: {}", raw))?;
            Ok(json_to_val(&json))
        })
        .collect()
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let mut config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .build()?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Run {
            scripts,
            entry,
            args,
            frames,
            fps,
            drain_policy,
            time_scale,
            keep_alive,
        } => {
            if !scripts.is_empty() {
                config.scripts.paths = scripts;
            }
            if let Some(entry) = entry {
                config.scripts.entry = entry;
            }
            if let Some(fps) = fps {
                config.driver.frame_rate = fps;
            }
            if frames.is_some() {
                config.driver.max_frames = frames;
            }
            if let Some(policy) = drain_policy {
                config.scheduler.drain_policy = policy;
            }
            if let Some(scale) = time_scale {
                config.driver.time_scale = scale;
            }
            if keep_alive {
                config.driver.exit_when_idle = false;
            }
            config.validate()?;

            let args = parse_script_args(&args)?;
            run_scripts(&config, args).await?;
        }

        Commands::Check { files, ast } => {
            check_scripts(&files, ast)?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn run_scripts(config: &Config, args: Vec<Val>) -> Result<()> {
    if config.scripts.paths.is_empty() {
        bail!("No scripts to run (pass script paths or set scripts.paths)");
    }
    let files = collect_script_files(&config.scripts.paths)?;

    let mut host = ScriptHost::from_config(config);
    host.init();
    let loaded = host.load_scripts(&config.scripts.paths);
    if loaded < files.len() {
        bail!("{} of {} script(s) failed to load", files.len() - loaded, files.len());
    }
    info!(target: "cadence::host", scripts = loaded, "scripts loaded");

    let entry = &config.scripts.entry;
    match host.do_call(entry, args) {
        Outcome::Finished(value) => {
            println!("{} returned {}", entry, value);
            return Ok(());
        }
        Outcome::Errored(e) => bail!("{} failed: {}: {}", entry, e.code, e.message),
        Outcome::Yielded => {}
    }

    let summary = driver::run_frames(&mut host, DriverOptions::from_config(&config.driver)).await;
    println!(
        "Stopped after {} frame(s): {} ({} resumed, {} finished, {} failed)",
        summary.frames, summary.stop, summary.resumed, summary.finished, summary.errored
    );
    if summary.errored > 0 {
        bail!("{} continuation(s) failed", summary.errored);
    }
    Ok(())
}

fn check_scripts(paths: &[PathBuf], print_ast: bool) -> Result<()> {
    let files = collect_script_files(paths)?;
    let mut failed = 0;

    for file in &files {
        let name = file.display().to_string();
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", name))?;

        if print_ast {
            match parse_script(&text) {
                Ok(script) => println!("{}", serde_json::to_string_pretty(&script)?),
                Err(e) => {
                    eprintln!("✗ {}: {}", name, e);
                    failed += 1;
                    continue;
                }
            }
        }

        match compile_source(&name, &text) {
            Ok(compiled) => println!("✓ {} ({} function(s))", name, compiled.functions.len()),
            Err(e) => {
                eprintln!("✗ {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} script(s) failed to compile", failed, files.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "cadence",
            "--config",
            "game.toml",
            "run",
            "scripts/",
            "--entry",
            "start",
            "--arg",
            "1",
            "--arg",
            "{\"level\": 2}",
            "--drain-policy",
            "one-per-tick",
            "--frames",
            "100",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("game.toml"));
        match cli.command {
            Commands::Run {
                scripts,
                entry,
                args,
                frames,
                drain_policy,
                keep_alive,
                ..
            } => {
                assert_eq!(scripts, vec![PathBuf::from("scripts/")]);
                assert_eq!(entry.as_deref(), Some("start"));
                assert_eq!(args.len(), 2);
                assert_eq!(frames, Some(100));
                assert_eq!(drain_policy, Some(DrainPolicy::OnePerTick));
                assert!(!keep_alive);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_parse_check_requires_files() {
        assert!(Cli::try_parse_from(["cadence", "check"]).is_err());

        let cli = Cli::try_parse_from(["cadence", "check", "a.cds", "--ast"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { ast: true, ref files } if files.len() == 1));
    }

    #[test]
    fn test_bad_drain_policy_rejected() {
        assert!(Cli::try_parse_from(["cadence", "run", "--drain-policy", "never"]).is_err());
    }

    #[test]
    fn test_parse_script_args() {
        let args = vec!["3".to_string(), "\"hi\"".to_string(), "[1, true]".to_string()];

        let vals = parse_script_args(&args).unwrap();

        assert_eq!(
            vals,
            vec![
                Val::Num(3.0),
                Val::str("hi"),
                Val::list(vec![Val::Num(1.0), Val::Bool(true)]),
            ]
        );
        assert!(parse_script_args(&["{oops".to_string()]).is_err());
    }
}
