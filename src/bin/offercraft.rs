//! Offercraft CLI: generate sales offers from JSON input.
//!
//! Usage:
//!   offercraft generate --input brief.json [--mode create|redesign] [--dry-run]
//!   offercraft generate --input brief.json --callback https://example.com/hook
//!   offercraft batch --input briefs.json [--concurrency 3] [--stats]
//!   offercraft stage <gather|copy|design|audit> --input context.json
//!   offercraft roles check | show <stage>

use clap::{Parser, Subcommand, ValueEnum};
use offercraft::config::{default_config_path, default_log_filter, Settings};
use offercraft::{
    BatchRunner, GenerationClient, HttpClient, JobRunner, Mode, OfferCache, OfferOrchestrator,
    PerformanceMonitor, RawInput, RoleSet, Stage,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "offercraft",
    version,
    about = "Staged LLM pipeline for structured sales offers"
)]
struct Cli {
    /// Path to config.yaml (defaults to the user data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of role overrides; takes precedence over the config file
    #[arg(long, global = true)]
    roles_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one offer and print it as JSON
    Generate {
        /// JSON input file, or "-" for stdin
        #[arg(long)]
        input: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Create)]
        mode: ModeArg,
        /// Per-attempt timeout in seconds
        #[arg(long)]
        stage_timeout: Option<u64>,
        /// Print the stage plan without generating anything
        #[arg(long)]
        dry_run: bool,
        /// Run as a job and POST the result to this URL (create mode only)
        #[arg(long)]
        callback: Option<String>,
    },
    /// Generate offers for a JSON array of inputs
    Batch {
        /// JSON array file, or "-" for stdin
        #[arg(long)]
        input: String,
        /// Maximum simultaneous generations
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print cache and performance figures to stderr afterwards
        #[arg(long)]
        stats: bool,
    },
    /// Run one stage once and print its raw output and extracted record
    Stage {
        /// gather, copy, design or audit
        stage: String,
        /// Stage context as JSON (or plain text), or "-" for stdin
        #[arg(long)]
        input: String,
    },
    /// Inspect stage roles
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Create,
    Redesign,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Create => Mode::Create,
            ModeArg::Redesign => Mode::Redesign,
        }
    }
}

struct GenerateOpts {
    mode: ModeArg,
    stage_timeout: Option<u64>,
    dry_run: bool,
    callback: Option<String>,
}

#[derive(Subcommand)]
enum RolesAction {
    /// Validate the active role set
    Check,
    /// Print one stage's role as YAML
    Show {
        /// gather, copy, design or audit
        stage: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<PathBuf>, roles_dir: Option<PathBuf>) -> Result<Settings, String> {
    let path = config.unwrap_or_else(default_config_path);
    let mut settings = Settings::load(&path).map_err(|e| e.to_string())?;
    if roles_dir.is_some() {
        settings.roles_dir = roles_dir;
    }
    Ok(settings)
}

fn read_input(source: &str) -> Result<String, String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(text);
    }
    std::fs::read_to_string(Path::new(source))
        .map_err(|e| format!("Failed to read {}: {}", source, e))
}

fn build_orchestrator(settings: &Settings) -> Result<OfferOrchestrator, String> {
    let roles = settings
        .roles()
        .map_err(|e| format!("Failed to load roles: {}", e))?;
    let generation = &settings.generation;
    if generation.api_key().is_none() {
        tracing::warn!(env = %generation.api_key_env, "no API key set; stages will fall back");
    }
    let client: Arc<dyn GenerationClient> = Arc::new(
        HttpClient::new(&generation.endpoint, &generation.model, generation.api_key())
            .map_err(|e| format!("Failed to build client: {}", e))?,
    );
    Ok(OfferOrchestrator::new(client, roles)
        .with_stage_timeout(settings.stage_timeout())
        .with_cache(Arc::new(OfferCache::new(settings.cache_capacity)))
        .with_monitor(Arc::new(PerformanceMonitor::new())))
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {}", e))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Redesign input is either `{"document": ..., "metadata": {...}}` or raw text.
fn redesign_parts(text: String) -> (String, Option<serde_json::Map<String, Value>>) {
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(mut map)) => match map.remove("document") {
            Some(Value::String(document)) => {
                let metadata = match map.remove("metadata") {
                    Some(Value::Object(m)) => Some(m),
                    _ => None,
                };
                (document, metadata)
            }
            _ => (text, None),
        },
        _ => (text, None),
    }
}

fn parse_json(text: &str) -> Result<Value, String> {
    serde_json::from_str::<Value>(text).map_err(|e| format!("input is not valid JSON: {}", e))
}

fn cmd_dry_run(settings: &Settings, text: String, mode: ModeArg) -> i32 {
    let roles = match load_roles(settings) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let input = match mode {
        ModeArg::Create => match parse_json(&text) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        ModeArg::Redesign => {
            let (document, metadata) = redesign_parts(text);
            serde_json::json!({ "document": document, "metadata": metadata })
        }
    };
    print_json(&offercraft::pipeline::dry_run(
        &roles,
        mode.into(),
        input,
        settings.stage_timeout(),
    ))
}

fn cmd_generate(settings: Settings, input: &str, opts: GenerateOpts) -> i32 {
    let mut settings = settings;
    if let Some(secs) = opts.stage_timeout {
        settings.stage_timeout_secs = secs;
    }
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if opts.dry_run {
        return cmd_dry_run(&settings, text, opts.mode);
    }
    if opts.callback.is_some() && matches!(opts.mode, ModeArg::Redesign) {
        eprintln!("Error: --callback is only supported in create mode");
        return 1;
    }
    let orchestrator = match build_orchestrator(&settings) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match opts.mode {
        ModeArg::Create => {
            let value = match parse_json(&text) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };
            match opts.callback {
                Some(target) => {
                    cmd_generate_job(&settings, &rt, orchestrator, RawInput::from_value(value), target)
                }
                None => print_json(&rt.block_on(orchestrator.create(RawInput::from_value(value)))),
            }
        }
        ModeArg::Redesign => {
            let (document, metadata) = redesign_parts(text);
            print_json(&rt.block_on(orchestrator.redesign(document, metadata)))
        }
    }
}

/// Run a create request through the job runner so the callback fires.
fn cmd_generate_job(
    settings: &Settings,
    rt: &tokio::runtime::Runtime,
    orchestrator: OfferOrchestrator,
    input: RawInput,
    callback: String,
) -> i32 {
    let notifier = match settings.webhook_notifier() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let jobs = JobRunner::new(Arc::new(orchestrator)).with_notifier(Arc::new(notifier));
    let id = jobs.create_job(input, Some(callback));
    if let Err(e) = rt.block_on(jobs.process_job(id)) {
        eprintln!("Error: {}", e);
        return 1;
    }
    match jobs.get_status(id) {
        Some(snapshot) => print_json(&snapshot),
        None => {
            eprintln!("Error: job {} disappeared", id);
            1
        }
    }
}

fn cmd_stage(settings: &Settings, stage: &str, input: &str) -> i32 {
    let Some(stage) = Stage::parse(stage) else {
        eprintln!("Error: unknown stage '{}' (expected gather, copy, design or audit)", stage);
        return 1;
    };
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    // JSON is re-indented the way the pipeline renders stage contexts
    let context = match serde_json::from_str::<Value>(&text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(text),
        Err(_) => text,
    };
    let orchestrator = match build_orchestrator(settings) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let trial = rt.block_on(orchestrator.try_stage(stage, &context));
    let code = print_json(&trial);
    if code == 0 && trial.record.is_none() {
        return 2;
    }
    code
}

fn cmd_batch(settings: Settings, input: &str, concurrency: Option<usize>, stats: bool) -> i32 {
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let inputs: Vec<RawInput> = match serde_json::from_str::<Vec<Value>>(&text) {
        Ok(values) => values.into_iter().map(RawInput::from_value).collect(),
        Err(e) => {
            eprintln!("Error: batch input must be a JSON array: {}", e);
            return 1;
        }
    };
    let orchestrator = match build_orchestrator(&settings) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let orchestrator = Arc::new(orchestrator);
    let runner = BatchRunner::new(orchestrator.clone())
        .with_concurrency(concurrency.unwrap_or(settings.batch_concurrency));
    let results = rt.block_on(runner.process_batch(inputs));
    let failed = results.iter().filter(|r| !r.success).count();
    let code = print_json(&results);
    if stats {
        match serde_json::to_string_pretty(&orchestrator.system_stats()) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    if code == 0 && failed > 0 {
        eprintln!("{} of {} items failed", failed, results.len());
        return 2;
    }
    code
}

fn load_roles(settings: &Settings) -> Result<RoleSet, i32> {
    settings.roles().map_err(|e| {
        eprintln!("Error: {}", e);
        1
    })
}

fn cmd_roles_check(settings: &Settings) -> i32 {
    let roles = match load_roles(settings) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let issues = roles.validate();
    if issues.is_empty() {
        for stage in Stage::ALL {
            let role = roles.get(stage);
            println!(
                "{:<7} {} (temperature {}, {} iterations)",
                stage.as_str(),
                role.role,
                role.temperature,
                role.max_iterations
            );
        }
        println!("All roles valid");
        0
    } else {
        for issue in &issues {
            eprintln!("  {}", issue);
        }
        eprintln!("{} role issue(s) found", issues.len());
        1
    }
}

fn cmd_roles_show(settings: &Settings, stage: &str) -> i32 {
    let Some(stage) = Stage::parse(stage) else {
        eprintln!("Error: unknown stage '{}' (expected gather, copy, design or audit)", stage);
        return 1;
    };
    let roles = match load_roles(settings) {
        Ok(r) => r,
        Err(code) => return code,
    };
    match serde_yaml::to_string(roles.get(stage)) {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let settings = match load_settings(cli.config, cli.roles_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Generate {
            input,
            mode,
            stage_timeout,
            dry_run,
            callback,
        } => cmd_generate(
            settings,
            &input,
            GenerateOpts {
                mode,
                stage_timeout,
                dry_run,
                callback,
            },
        ),
        Commands::Batch {
            input,
            concurrency,
            stats,
        } => cmd_batch(settings, &input, concurrency, stats),
        Commands::Stage { stage, input } => cmd_stage(&settings, &stage, &input),
        Commands::Roles { action } => match action {
            RolesAction::Check => cmd_roles_check(&settings),
            RolesAction::Show { stage } => cmd_roles_show(&settings, &stage),
        },
    };
    std::process::exit(code);
}
