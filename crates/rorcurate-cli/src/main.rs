mod display;
mod script;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rorcurate_core::query::DEFAULT_TAG_LIMIT;
use rorcurate_core::{
    FeedbackRow, QueryContext, RawAffiliation, RecordStore, RorRef, clean_ror, export_document,
    feedback_rows, normalize,
};
use rorcurate_ror::{DEFAULT_ROR_API, FeedbackClient, RorClient, resolve_all, resolved_refs};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use script::{EditStep, ids_to_resolve, run_script};

#[derive(Parser, Debug)]
#[command(name = "rorcurate")]
#[command(about = "Review and correct ROR links on affiliation strings")]
#[command(version)]
struct Cli {
    /// ROR API base URL
    #[arg(long, global = true, default_value = DEFAULT_ROR_API, env = "RORCURATE_ROR_API")]
    ror_api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify terms as ROR ids or affiliation strings
    Check {
        terms: Vec<String>,
        /// Minimum length of a usable affiliation string
        #[arg(long, default_value_t = DEFAULT_TAG_LIMIT, env = "RORCURATE_TAG_LIMIT")]
        tag_limit: usize,
    },
    /// Look up ROR ids in the registry, or search it with free text
    Resolve {
        terms: Vec<String>,
        /// Include child organisations
        #[arg(long)]
        children: bool,
    },
    /// Replay an edit script over a query result and write the corrections
    Apply(ApplyArgs),
    /// Send a feedback payload to the submission endpoint
    Submit {
        /// JSON file with an array of feedback rows
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, env = "RORCURATE_FEEDBACK_URL")]
        feedback_url: String,
    },
}

#[derive(clap::Args, Debug)]
struct ApplyArgs {
    /// JSON file with the affiliation records of a query
    #[arg(long)]
    records: PathBuf,
    /// JSON file with the edit steps
    #[arg(long)]
    edits: PathBuf,
    /// Write output here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Write a full export document instead of the bare feedback payload
    #[arg(long)]
    export: bool,
    /// Do not call the registry; added ids carry no names
    #[arg(long)]
    offline: bool,
    /// Searched affiliation strings or ROR ids (recorded in exports)
    #[arg(long = "affiliation")]
    affiliations: Vec<String>,
    /// Excluded affiliation strings or ROR ids (recorded in exports)
    #[arg(long = "deleted-affiliation")]
    deleted_affiliations: Vec<String>,
    #[arg(long)]
    start_year: Option<u16>,
    #[arg(long)]
    end_year: Option<u16>,
    #[arg(long, default_value_t = DEFAULT_TAG_LIMIT, env = "RORCURATE_TAG_LIMIT")]
    tag_limit: usize,
    /// Resolve added ids together with their child organisations
    #[arg(long)]
    children: bool,
}

impl ApplyArgs {
    /// Query parameters recorded in an export document.
    fn query_context(&self) -> QueryContext {
        QueryContext::from_terms(&self.affiliations, &self.deleted_affiliations, self.tag_limit)
            .with_years(self.start_year, self.end_year)
            .with_ror_children(self.children)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "rorcurate=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("rorcurate v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Check { terms, tag_limit } => check(&terms, tag_limit),
        Command::Resolve { terms, children } => {
            let client = RorClient::new(cli.ror_api_url).with_children(children);
            resolve(&client, &terms).await
        }
        Command::Apply(args) => apply(args, cli.ror_api_url).await,
        Command::Submit {
            payload,
            feedback_url,
        } => submit(&payload, feedback_url).await,
    }
}

fn check(terms: &[String], tag_limit: usize) -> anyhow::Result<()> {
    let ctx = QueryContext::from_terms(terms, &[] as &[&str], tag_limit);
    for term in &ctx.affiliations {
        let kind = if term.is_ror {
            "ror"
        } else if term.is_disabled {
            "affiliation (too short)"
        } else {
            "affiliation"
        };
        println!("{:<40} {kind}", term.label);
    }
    Ok(())
}

async fn resolve(client: &RorClient, terms: &[String]) -> anyhow::Result<()> {
    let (ids, texts): (Vec<&String>, Vec<&String>) =
        terms.iter().partition(|t| clean_ror(t).is_some());

    for resolution in resolve_all(client, &ids).await {
        match resolution.result {
            Ok(records) => {
                for record in records {
                    println!(
                        "{}\t{}\t{}",
                        record.ror_id,
                        record.ror_country,
                        record.names.join(" | ")
                    );
                }
            }
            Err(e) => eprintln!("{}: {e}", resolution.query),
        }
    }

    for text in texts {
        let records = client
            .search(&normalize(text))
            .await
            .with_context(|| format!("searching ROR for {text:?}"))?;
        if records.is_empty() {
            eprintln!("{text}: no registry match");
        }
        for record in records {
            println!("{}\t{}\t{}", record.ror_id, record.ror_country, record.display_name());
        }
    }
    Ok(())
}

async fn apply(args: ApplyArgs, ror_api_url: String) -> anyhow::Result<()> {
    let raw: Vec<RawAffiliation> = read_json(&args.records)?;
    let steps: Vec<EditStep> = read_json(&args.edits)?;
    let mut store = RecordStore::load(raw).context("loading affiliation records")?;

    // All lookups are joined before any record is touched.
    let ids = ids_to_resolve(&steps);
    let resolved: HashMap<String, RorRef> = if args.offline {
        ids.iter().map(|id| (id.clone(), RorRef::bare(id))).collect()
    } else {
        let client = RorClient::new(ror_api_url).with_children(args.children);
        let resolutions = resolve_all(&client, &ids).await;
        resolved_refs(&resolutions)
            .into_iter()
            .map(|r| (r.ror_id.clone(), r))
            .collect()
    };
    if resolved.len() < ids.len() {
        warn!(
            requested = ids.len(),
            resolved = resolved.len(),
            "some added ROR ids could not be resolved"
        );
    }

    let outcome = run_script(&mut store, &steps, &resolved).context("running edit script")?;
    info!(
        selected = outcome.selection.len(),
        visible = outcome.visible,
        skipped = outcome.skipped,
        "replayed edits"
    );
    eprint!("{}", display::render_aggregation(&outcome.aggregation));

    let corrections = store.corrections();
    eprint!("{}", display::render_corrections(&corrections));

    if args.export {
        let doc = export_document(&corrections, args.query_context(), chrono::Utc::now().to_rfc3339());
        write_json(args.output.as_deref(), &doc)
    } else {
        write_json(args.output.as_deref(), &feedback_rows(&corrections))
    }
}

async fn submit(payload: &Path, feedback_url: String) -> anyhow::Result<()> {
    let rows: Vec<FeedbackRow> = read_json(payload)?;
    if rows.is_empty() {
        bail!("{} holds no corrections", payload.display());
    }
    let client = FeedbackClient::new(feedback_url);
    let accepted = client.submit(&rows).await.context("submitting feedback")?;
    println!("{accepted}/{} corrections accepted", rows.len());
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote corrections");
        }
        None => println!("{json}"),
    }
    Ok(())
}
