//! Thin binary wiring the engine crates together (spec.md §1 "out of
//! scope": the CLI front-end itself). Three subcommands, one per engine:
//! `run` drives the Schema Execution Pipeline, `manage` drives the Change
//! Management Loop, `schedule-tick` drives one Scheduler tick.

mod tracing_init;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use at_runtime::{LocalRunner, Manager, RemoteRunner, Runner, Scheduler, Step};
use at_schema::SchemaMap;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autotransform", about = "Large-scale code modification and change management engine")]
struct Cli {
    /// Path to the repo-local autotransform.toml, if any.
    #[arg(long, global = true)]
    repo_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs a Schema end to end (spec.md §4.1 `run(schema)`).
    Run {
        #[arg(long)]
        schema_map: PathBuf,
        #[arg(long)]
        schema: String,
    },
    /// Runs one Change Management Loop pass (spec.md §4.2).
    Manage {
        #[arg(long)]
        steps: PathBuf,
        #[arg(long)]
        full_repo_name: String,
        #[arg(long, default_value = "main")]
        base_branch: String,
        #[arg(long, default_value = ".")]
        working_copy: PathBuf,
        #[arg(long)]
        run_workflow: String,
        #[arg(long)]
        update_workflow: String,
        #[arg(long)]
        local: bool,
    },
    /// Runs one Scheduler tick (spec.md §4.3).
    ScheduleTick {
        #[arg(long)]
        scheduler: PathBuf,
        #[arg(long)]
        schema_map: PathBuf,
        #[arg(long)]
        full_repo_name: String,
        #[arg(long, default_value = "main")]
        base_branch: String,
        #[arg(long)]
        run_workflow: String,
        #[arg(long)]
        update_workflow: String,
        /// Overrides "now" for testing; defaults to the wall clock.
        #[arg(long)]
        now: Option<i64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = at_config::Config::load(cli.repo_config.as_deref())?;
    let _tracing_guard = tracing_init::init_tracing(&at_config::LoggingConfig::default())?;

    // `GithubRepo` lives in `at-repo`, a crate `at-schema` cannot depend on;
    // registering it here (once, before any bundle referencing it is
    // decoded) is what lets a Schema's `"repo"` field name `"github"`.
    at_repo::register();

    let bot_login = config
        .credentials
        .bot_identity
        .clone()
        .unwrap_or_else(|| "autotransform-bot".to_string());
    let github_token = config
        .credentials
        .github_token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .unwrap_or_default();
    let base_url = config
        .credentials
        .github_base_url
        .clone()
        .unwrap_or_else(|| "https://api.github.com".to_string());

    match cli.command {
        Command::Run { schema_map, schema } => {
            let map = SchemaMap::load(&schema_map)?;
            let schema = map.resolve_file(&schema)?;
            at_runtime::pipeline::run(&schema)?;
        }
        Command::Manage {
            steps,
            full_repo_name,
            base_branch,
            working_copy,
            run_workflow,
            update_workflow,
            local,
        } => {
            let repo = at_repo::GithubRepo::new(
                base_url.clone(),
                github_token.clone(),
                full_repo_name.clone(),
                base_branch.clone(),
                working_copy,
                bot_login,
                "manage",
            );
            let steps = load_steps(&steps)?;
            let local_runner: Box<dyn Runner> = Box::new(LocalRunner);
            let remote_runner: Box<dyn Runner> = Box::new(RemoteRunner::new(
                base_url,
                github_token,
                full_repo_name,
                base_branch,
                run_workflow,
                update_workflow,
            ));
            let manager = Manager::new(Box::new(repo), steps, local_runner, remote_runner);
            let now = now_unix();
            manager.run(local, now)?;
        }
        Command::ScheduleTick {
            scheduler,
            schema_map,
            full_repo_name,
            base_branch,
            run_workflow,
            update_workflow,
            now,
        } => {
            let scheduler = Scheduler::load(&scheduler)?;
            let map = SchemaMap::load(&schema_map)?;
            let remote_runner = RemoteRunner::new(
                base_url,
                github_token,
                full_repo_name,
                base_branch,
                run_workflow,
                update_workflow,
            );
            let now = now.unwrap_or_else(now_unix);
            scheduler.run(now, &map, &remote_runner)?;
        }
    }

    Ok(())
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn load_steps(path: &std::path::Path) -> anyhow::Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)?;
    let bundles: Vec<serde_json::Value> = serde_json::from_str(&text)?;
    bundles
        .into_iter()
        .map(|b| Step::from_json(b).map_err(|e| anyhow::anyhow!("{e}")))
        .collect()
}
