//! CLI command definitions for crowdforge.
//!
//! Provides commands for launching HIT batches, fetching and reviewing
//! results, inspecting account state, and serving the review viewer.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use crate::config::MarketplaceConfig;
use crate::fetcher::Requester;
use crate::launcher::{HitLauncher, LaunchOptions};
use crate::marketplace::{MarketplaceApi, MarketplaceClient};
use crate::review::server::{serve, AppState};
use crate::template::TaskTemplates;

/// Default templates directory.
const DEFAULT_TEMPLATES_DIR: &str = "./templates";

/// Crowdsourcing marketplace orchestration for data labeling tasks.
#[derive(Parser)]
#[command(name = "crowdforge")]
#[command(about = "Launch, fetch, and review crowdsourcing marketplace tasks")]
#[command(version)]
#[command(
    long_about = "crowdforge launches batches of HITs from HTML task templates, fetches and\nparses submitted work, and serves a local web viewer for approving or\nrejecting it.\n\nExample usage:\n  crowdforge launch --items items.json --preset caption --reward 1.00\n  crowdforge fetch HIT123 HIT124 --output results/run.json\n  crowdforge review --results-dir results"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Launch HITs for a list of work items, one HIT per batch.
    Launch(LaunchArgs),

    /// Fetch parsed results for launched HITs.
    Fetch(FetchArgs),

    /// Approve (and optionally reject unparsable) submissions of a HIT.
    ApproveHit(ApproveHitArgs),

    /// Reject a single submitted assignment.
    Reject(RejectArgs),

    /// Show per-HIT completion progress.
    Progress(ProgressArgs),

    /// List every HIT on the account.
    ListHits(ConnectionArgs),

    /// Delete a HIT, force-expiring it first if needed.
    DeleteHit(DeleteHitArgs),

    /// Show the available account balance.
    Balance(ConnectionArgs),

    /// Render a task template to a local HTML file for preview.
    Render(RenderArgs),

    /// Serve the web viewer for reviewing submitted work.
    Review(ReviewArgs),
}

/// Marketplace connection arguments shared by remote commands.
#[derive(Parser, Debug)]
pub struct ConnectionArgs {
    /// API token (can also be set via CROWDFORGE_API_TOKEN).
    #[arg(long, env = "CROWDFORGE_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Target the sandbox environment instead of production.
    #[arg(long)]
    pub sandbox: bool,

    /// Override the requester endpoint (self-hosted or test servers).
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl ConnectionArgs {
    fn config(&self) -> MarketplaceConfig {
        let mut config = if self.sandbox {
            MarketplaceConfig::sandbox(self.api_token.clone())
        } else {
            MarketplaceConfig::production(self.api_token.clone())
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        config
    }

    fn client(&self) -> MarketplaceClient {
        MarketplaceClient::new(self.config())
    }
}

/// Arguments for `crowdforge launch`.
#[derive(Parser, Debug)]
pub struct LaunchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// JSON file containing the work items (a JSON array).
    #[arg(short, long)]
    pub items: PathBuf,

    /// Built-in task preset: caption, verify-question-answer, verify-bbox,
    /// verify-relationship.
    #[arg(short, long, conflicts_with = "template")]
    pub preset: Option<String>,

    /// Custom template name relative to the templates directory
    /// (e.g. tasks/my_task.html). Requires --title and --description.
    #[arg(short, long)]
    pub template: Option<String>,

    /// HIT title (required with --template).
    #[arg(long)]
    pub title: Option<String>,

    /// HIT description (required with --template).
    #[arg(long)]
    pub description: Option<String>,

    /// Comma-separated HIT keywords.
    #[arg(long)]
    pub keywords: Option<String>,

    /// Reward per assignment as a decimal string.
    #[arg(short, long)]
    pub reward: Option<String>,

    /// Number of work items per HIT.
    #[arg(long)]
    pub tasks_per_hit: Option<usize>,

    /// Number of workers per HIT.
    #[arg(long)]
    pub max_assignments: Option<u32>,

    /// Templates directory.
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,

    /// File to write the launched HIT IDs to (JSON array). Prints to
    /// stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `crowdforge fetch`.
#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// HIT IDs to fetch.
    pub hit_ids: Vec<String>,

    /// JSON file of HIT IDs (as written by `launch --output`).
    #[arg(long)]
    pub hits_file: Option<PathBuf>,

    /// Approve every fetched submission.
    #[arg(long)]
    pub approve: bool,

    /// File to write the results mapping to (JSON). Prints to stdout
    /// when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `crowdforge approve-hit`.
#[derive(Parser, Debug)]
pub struct ApproveHitArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// HIT whose submissions should be reviewed.
    pub hit_id: String,

    /// Reject submissions whose answers cannot be parsed.
    #[arg(long)]
    pub reject_on_fail: bool,

    /// Approve even previously rejected assignments.
    #[arg(long)]
    pub override_rejection: bool,
}

/// Arguments for `crowdforge reject`.
#[derive(Parser, Debug)]
pub struct RejectArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Assignment to reject.
    pub assignment_id: String,
}

/// Arguments for `crowdforge progress`.
#[derive(Parser, Debug)]
pub struct ProgressArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// HIT IDs to inspect.
    pub hit_ids: Vec<String>,

    /// JSON file of HIT IDs (as written by `launch --output`).
    #[arg(long)]
    pub hits_file: Option<PathBuf>,
}

/// Arguments for `crowdforge delete-hit`.
#[derive(Parser, Debug)]
pub struct DeleteHitArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// HIT to delete.
    pub hit_id: String,
}

/// Arguments for `crowdforge render`.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Template name relative to the templates directory.
    #[arg(short, long)]
    pub template: String,

    /// File to write the rendered HTML to.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Templates directory.
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,
}

/// Arguments for `crowdforge review`.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Address to bind the viewer to.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,

    /// Templates directory (review pages live under review/).
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the selected command with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Launch(args) => launch(args).await,
        Commands::Fetch(args) => fetch(args).await,
        Commands::ApproveHit(args) => approve_hit(args).await,
        Commands::Reject(args) => reject(args).await,
        Commands::Progress(args) => progress(args).await,
        Commands::ListHits(args) => list_hits(args).await,
        Commands::DeleteHit(args) => delete_hit(args).await,
        Commands::Balance(args) => balance(args).await,
        Commands::Render(args) => render(args),
        Commands::Review(args) => review(args).await,
    }
}

fn launch_options(args: &LaunchArgs) -> anyhow::Result<LaunchOptions> {
    let mut opts = match (&args.preset, &args.template) {
        (Some(preset), None) => LaunchOptions::preset(preset)
            .with_context(|| format!("Unknown preset '{preset}'"))?,
        (None, Some(template)) => {
            let title = args
                .title
                .clone()
                .context("--title is required with --template")?;
            let description = args
                .description
                .clone()
                .context("--description is required with --template")?;
            let mut opts = LaunchOptions::new(template.clone());
            opts.title = title;
            opts.description = description;
            opts
        }
        _ => bail!("Exactly one of --preset or --template must be given"),
    };

    if let Some(keywords) = &args.keywords {
        opts.keywords = keywords.clone();
    }
    if let Some(reward) = &args.reward {
        opts.reward = reward.clone();
    }
    if let Some(tasks_per_hit) = args.tasks_per_hit {
        opts.tasks_per_hit = tasks_per_hit;
    }
    if let Some(max_assignments) = args.max_assignments {
        opts.max_assignments = max_assignments;
    }
    Ok(opts)
}

async fn launch(args: LaunchArgs) -> anyhow::Result<()> {
    let opts = launch_options(&args)?;
    let raw = fs::read_to_string(&args.items)
        .with_context(|| format!("Failed to read items file {}", args.items.display()))?;
    let items: Vec<Value> =
        serde_json::from_str(&raw).context("Items file must contain a JSON array")?;

    let config = args.connection.config();
    let client = MarketplaceClient::new(config.clone());
    let templates = TaskTemplates::from_dir(&args.templates_dir)?;
    let launcher = HitLauncher::new(&client, &templates, &config);

    let hit_ids = launcher.launch(&items, &opts).await?;
    info!(hits = hit_ids.len(), items = items.len(), "Launch complete");
    write_json_output(args.output.as_deref(), &hit_ids)
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let hit_ids = collect_hit_ids(args.hit_ids, args.hits_file.as_deref())?;
    let client = args.connection.client();
    let requester = Requester::new(&client);

    let results = requester.fetch_completed(&hit_ids, args.approve).await?;
    info!(
        fetched = results.len(),
        requested = hit_ids.len(),
        "Fetch complete"
    );
    write_json_output(args.output.as_deref(), &results)
}

async fn approve_hit(args: ApproveHitArgs) -> anyhow::Result<()> {
    let client = args.connection.client();
    let requester = Requester::new(&client);

    let (approved, rejected) = requester
        .approve_hit(&args.hit_id, args.reject_on_fail, args.override_rejection)
        .await?;
    println!("Approved: {}", approved.len());
    println!("Rejected: {}", rejected.len());
    Ok(())
}

async fn reject(args: RejectArgs) -> anyhow::Result<()> {
    let client = args.connection.client();
    let requester = Requester::new(&client);

    if requester.reject_assignment(&args.assignment_id).await? {
        println!("Rejected {}", args.assignment_id);
    } else {
        println!("{} is not in the Submitted state; nothing done", args.assignment_id);
    }
    Ok(())
}

async fn progress(args: ProgressArgs) -> anyhow::Result<()> {
    let hit_ids = collect_hit_ids(args.hit_ids, args.hits_file.as_deref())?;
    let client = args.connection.client();
    let requester = Requester::new(&client);

    let progress = requester.hit_progress(&hit_ids).await?;
    for (hit_id, p) in &progress {
        println!("{hit_id}: {}/{}", p.completed, p.max_assignments);
    }
    Ok(())
}

async fn list_hits(args: ConnectionArgs) -> anyhow::Result<()> {
    let client = args.client();
    let hits = client.list_hits().await?;
    for hit in &hits {
        println!(
            "{}\t{}\tmax_assignments={}",
            hit.hit_id, hit.title, hit.max_assignments
        );
    }
    println!("{} HITs", hits.len());
    Ok(())
}

async fn delete_hit(args: DeleteHitArgs) -> anyhow::Result<()> {
    let client = args.connection.client();
    client.force_delete_hit(&args.hit_id).await?;
    println!("Deleted {}", args.hit_id);
    Ok(())
}

async fn balance(args: ConnectionArgs) -> anyhow::Result<()> {
    let client = args.client();
    println!("{}", client.account_balance().await?);
    Ok(())
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let templates = TaskTemplates::from_dir(&args.templates_dir)?;
    let html = templates.render_preview(&args.template)?;
    fs::write(&args.output, html)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());
    Ok(())
}

async fn review(args: ReviewArgs) -> anyhow::Result<()> {
    let client = args.connection.client();
    let templates = TaskTemplates::from_dir(&args.templates_dir)?;
    let state = AppState {
        api: Arc::new(client),
        templates: Arc::new(templates),
    };
    serve(state, args.addr).await?;
    Ok(())
}

/// Merge positional HIT IDs with an optional IDs file.
fn collect_hit_ids(
    mut hit_ids: Vec<String>,
    hits_file: Option<&std::path::Path>,
) -> anyhow::Result<Vec<String>> {
    if let Some(path) = hits_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read HIT IDs file {}", path.display()))?;
        let from_file: Vec<String> =
            serde_json::from_str(&raw).context("HIT IDs file must contain a JSON array")?;
        hit_ids.extend(from_file);
    }
    if hit_ids.is_empty() {
        bail!("No HIT IDs given (pass them as arguments or via --hits-file)");
    }
    Ok(hit_ids)
}

/// Write a value as pretty JSON to a file, or stdout when no path is given.
fn write_json_output<T: serde::Serialize>(
    path: Option<&std::path::Path>,
    value: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
