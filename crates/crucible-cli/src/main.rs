//! Crucible - verification pipeline for generated source text.
//!
//! The `crucible` command materializes a block of raw generated code as a
//! project on disk, compiles and/or executes it under a time budget, and
//! reports a structured outcome.
//!
//! ## Commands
//!
//! - `run`: drive the full pipeline on a submission
//! - `split`: parse a submission into file blocks without touching disk

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crucible_core::{split_source, Language, PipelineReport};
use crucible_harness::{
    init_tracing, CommandRegenerator, CrucibleConfig, NullRegenerator, Pipeline, Regenerator,
};

#[derive(Parser)]
#[command(name = "crucible")]
#[command(author = "Crucible Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify generated source text by building and running it", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a submission
    Run {
        /// Path to the raw generated text ("-" reads stdin)
        #[arg(short, long)]
        code: PathBuf,

        /// Target language: python, cpp, c++, java
        #[arg(short, long)]
        language: String,

        /// Project name, used as the workspace directory name
        #[arg(short, long, default_value = "generated")]
        project: String,

        /// TOML configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the execution timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Regeneration collaborator command, e.g. "my-fixer --model fast".
        /// It receives the request as JSON on stdin and prints corrected
        /// code. Without it, a build failure ends the run.
        #[arg(long)]
        regen_cmd: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a submission into file blocks without writing anything
    Split {
        /// Path to the raw generated text ("-" reads stdin)
        #[arg(short, long)]
        code: PathBuf,

        /// Target language: python, cpp, c++, java
        #[arg(short, long)]
        language: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json_logs, cli.verbose);

    match cli.command {
        Commands::Run {
            code,
            language,
            project,
            config,
            timeout_ms,
            regen_cmd,
            json,
        } => {
            cmd_run(
                &code,
                &language,
                &project,
                config.as_deref(),
                timeout_ms,
                regen_cmd.as_deref(),
                json,
            )
            .await
        }
        Commands::Split { code, language } => cmd_split(&code, &language),
    }
}

async fn cmd_run(
    code_path: &std::path::Path,
    language: &str,
    project: &str,
    config_path: Option<&std::path::Path>,
    timeout_ms: Option<u64>,
    regen_cmd: Option<&str>,
    json: bool,
) -> Result<()> {
    let raw_code = read_input(code_path)?;
    let language: Language = language.parse()?;

    let mut config = match config_path {
        Some(path) => CrucibleConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CrucibleConfig::default(),
    };
    if let Some(timeout_ms) = timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }

    let regenerator: Arc<dyn Regenerator> = match regen_cmd {
        Some(command) => Arc::new(CommandRegenerator::new(
            command.split_whitespace().map(String::from).collect(),
        )),
        None => Arc::new(NullRegenerator),
    };

    let pipeline = Pipeline::new(config, regenerator);
    let report = pipeline.run(&raw_code, language, project).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_split(code_path: &std::path::Path, language: &str) -> Result<()> {
    let raw_code = read_input(code_path)?;
    let language: Language = language.parse()?;
    let blocks = split_source(&raw_code, language);
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

fn read_input(path: &std::path::Path) -> Result<String> {
    if path == std::path::Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

fn print_report(report: &PipelineReport) {
    println!("run:      {}", report.run_id);
    println!("project:  {}", report.project);
    println!("language: {}", report.language);
    println!("status:   {:?}", report.status);
    println!("message:  {}", report.message);
    println!("attempts: {}", report.attempts);
    println!("files:    {}", report.files.join(", "));
    if !report.stdout.is_empty() {
        println!("--- stdout ---");
        println!("{}", report.stdout.trim_end());
    }
    if !report.stderr.is_empty() {
        println!("--- stderr ---");
        println!("{}", report.stderr.trim_end());
    }
}
