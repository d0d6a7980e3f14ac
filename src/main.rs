//! Sigil - a fast, cross-shell prompt
//!
//! The shell calls `sigil prompt` on every redraw, passing what it knows
//! about the previous command as flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use std::io::Write;

use sigil::{ContextBuilder, ExitStatus, Prompt, PromptConfig, ProbeOutcome, Shell, SigilError};
use tracing::warn;

/// Environment variable holding a tracing filter, e.g. `sigil=trace`.
const LOG_ENV: &str = "SIGIL_LOG";

#[derive(Parser)]
#[command(name = "sigil")]
#[command(version)]
#[command(about = "A fast, cross-shell prompt", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to $SIGIL_CONFIG, then <config dir>/sigil.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the prompt
    Prompt {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Evaluate a single module and explain the outcome
    Module {
        /// Module name, e.g. git_branch or custom.deploy
        name: String,

        /// Print the module's variables as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// List all modules and whether they are active here
    Modules {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Check the configuration for errors
    Validate,
    /// Print where the configuration is read from
    Path,
}

/// What the shell knows about the previous command.
#[derive(Args, Debug, Clone)]
struct ContextArgs {
    /// Exit code of the previous command
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    status: i32,

    /// Signal that terminated the previous command
    #[arg(long, value_name = "SIGNAL")]
    signal: Option<i32>,

    /// Duration of the previous command in milliseconds
    #[arg(short = 'd', long, value_name = "MS")]
    cmd_duration: Option<u64>,

    /// Number of background jobs
    #[arg(short, long, default_value = "0")]
    jobs: u32,

    /// Shell the prompt is rendered for
    #[arg(long, value_enum, env = "SIGIL_SHELL", default_value = "unknown")]
    shell: Shell,

    /// Working directory (defaults to the current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Working directory as the shell reports it ($PWD)
    #[arg(short = 'P', long)]
    logical_path: Option<PathBuf>,
}

impl ContextArgs {
    /// The directory to render for.
    ///
    /// The shell may sit in a directory that no longer exists; the prompt
    /// is then rendered for the best replacement instead of failing.
    fn working_dir(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                let fallback = self
                    .logical_path
                    .clone()
                    .or_else(|| {
                        std::env::var_os("PWD")
                            .filter(|pwd| !pwd.is_empty())
                            .map(PathBuf::from)
                    })
                    .or_else(dirs::home_dir)
                    .unwrap_or_else(|| PathBuf::from("/"));
                warn!(
                    "Cannot read the current directory ({}), using {}",
                    e,
                    fallback.display()
                );
                fallback
            }
        }
    }

    fn build(&self) -> sigil::Context {
        let dir = self.working_dir();
        let exit_status = match self.signal {
            Some(signal) => ExitStatus::Signal(signal),
            None => ExitStatus::Code(self.status),
        };

        let mut builder = ContextBuilder::new(&dir)
            .with_exit_status(exit_status)
            .with_jobs(self.jobs)
            .with_shell(self.shell)
            .capture_env();
        if let Some(ms) = self.cmd_duration {
            builder = builder.with_cmd_duration(Duration::from_millis(ms));
        }
        if let Some(logical) = &self.logical_path {
            builder = builder.with_logical_dir(logical.clone());
        }
        builder.build()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries the prompt, so logs go to stderr
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("sigil=debug")
        } else {
            EnvFilter::new("sigil=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(run(cli));
    // Probes abandoned at their timeout may still hold a worker thread
    runtime.shutdown_background();

    if let Err(e) = outcome {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> sigil::Result<PromptConfig> {
    match path {
        Some(path) => PromptConfig::load_from(path),
        None => PromptConfig::load(),
    }
}

async fn run(cli: Cli) -> sigil::Result<()> {
    match cli.command {
        Commands::Prompt { context } => {
            // A broken config must never break the shell
            let config = load_config(cli.config.as_ref()).unwrap_or_else(|e| {
                tracing::error!("{}; using default configuration", e);
                PromptConfig::default()
            });
            let prompt = Prompt::new(config).render(context.build()).await;
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;
        }

        Commands::Module {
            name,
            json,
            context,
        } => {
            let prompt = Prompt::new(load_config(cli.config.as_ref())?);
            let report = prompt.explain_module(&name, context.build()).await?;

            if json {
                let value = serde_json::json!({
                    "name": report.name,
                    "active": report.active,
                    "disabled": report.disabled,
                    "outcome": report.outcome.as_ref().map(ToString::to_string),
                    "elapsed_ms": report.elapsed.as_millis() as u64,
                    "variables": report.result,
                    "output": report.text,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value).map_err(|e| SigilError::Other(e.into()))?
                );
                return Ok(());
            }

            println!("{} {}", report.name.bold(), report.description.dimmed());
            println!("{}", "─".repeat(40));
            if report.disabled {
                println!("  {} disabled", "✗".yellow());
                return Ok(());
            }
            if !report.active {
                println!("  {} not active in this directory", "✗".yellow());
                return Ok(());
            }

            let outcome = match &report.outcome {
                Some(ProbeOutcome::Completed) => "completed".green(),
                Some(ProbeOutcome::TimedOut(_)) => "timed out".yellow(),
                Some(outcome) => outcome.to_string().as_str().red(),
                None => "not evaluated".dimmed(),
            };
            println!("  Outcome:  {} in {:?}", outcome, report.elapsed);
            println!("  Output:   {:?}", report.text);
            println!("  Rendered: {}", report.rendered);
            for (var, value) in report.result.vars() {
                match value {
                    Some(value) => println!("    ${} = {:?}", var.cyan(), value),
                    None => println!("    ${} {}", var.cyan(), "(absent)".dimmed()),
                }
            }
        }

        Commands::Modules { json, context } => {
            let prompt = Prompt::new(load_config(cli.config.as_ref())?);
            let statuses = prompt.list_modules(&context.build()).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&statuses).map_err(|e| SigilError::Other(e.into()))?
                );
                return Ok(());
            }

            for status in statuses {
                let marker = if status.disabled {
                    "-".dimmed()
                } else if status.active {
                    "✓".green()
                } else {
                    "·".normal()
                };
                println!("  {} {:<20} {}", marker, status.name, status.description.dimmed());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_ref())?;
                print!("{}", config.to_toml()?);
            }
            ConfigAction::Validate => {
                let config = load_config(cli.config.as_ref())?;
                let prompt = Prompt::new(config);
                let report = prompt.config().validate(&prompt.registry().names());

                if report.is_valid() && report.warnings.is_empty() {
                    println!("{} configuration is valid", "✓".green());
                    return Ok(());
                }
                for error in &report.errors {
                    println!("  {} {}", "error:".red().bold(), error);
                }
                for warning in &report.warnings {
                    println!("  {} {}", "warning:".yellow(), warning);
                }
                if !report.is_valid() {
                    std::process::exit(report.exit_code());
                }
            }
            ConfigAction::Path => match cli.config.or_else(PromptConfig::config_path) {
                Some(path) => println!("{}", path.display()),
                None => {
                    return Err(SigilError::config("no configuration directory on this platform"))
                }
            },
        },
    }

    Ok(())
}
