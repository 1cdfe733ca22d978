//! Scrutineer - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use scrutineer::config::Config;
use scrutineer::embedding::{Embedder, GeminiEmbeddings};
use scrutineer::extract::DocumentKind;
use scrutineer::formulas::{
    AccelerationParams, AutocrossParams, CostParams, EfficiencyParams, EnduranceParams,
    ScoringFormula, SkidpadParams,
};
use scrutineer::pipeline::{load_index, IngestPipeline};
use scrutineer::retrieval::Retriever;
use scrutineer::rules::RuleId;

/// Scrutineer - retrieval-backed assistant for competition rulebook questions
#[derive(Parser, Debug)]
#[command(name = "scrutineer")]
#[command(version = "0.3.0")]
#[command(about = "Ask questions about the competition rulebook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, chunk, embed, and index the configured source documents
    Ingest,
    /// Interactive question loop against the built index
    Ask {
        /// Disable the handbook priority boost
        #[arg(long)]
        no_boost: bool,
    },
    /// One-shot retrieval for a query
    Search {
        query: String,

        /// Number of results to return
        #[arg(short, long)]
        top_k: Option<usize>,

        /// Restrict to one document kind (handbook, rulebook, unknown)
        #[arg(long)]
        kind: Option<DocumentKind>,

        /// Use pure semantic search instead of hybrid
        #[arg(long)]
        semantic_only: bool,
    },
    /// Look up chunks citing a specific rule identifier
    Rule {
        /// Rule identifier, e.g. "D 4.3.3"
        id: String,
    },
    /// Evaluate an event scoring formula
    Score {
        #[command(subcommand)]
        event: ScoreCommand,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
enum ScoreCommand {
    /// Skidpad score (D 4.3.3)
    Skidpad {
        #[arg(long)]
        t_team: f64,
        #[arg(long)]
        t_max: f64,
        #[arg(long, default_value_t = 75.0)]
        p_max: f64,
    },
    /// Acceleration score (D 4.2.3)
    Acceleration {
        #[arg(long)]
        t_team: f64,
        #[arg(long)]
        t_max: f64,
        #[arg(long, default_value_t = 75.0)]
        p_max: f64,
    },
    /// Autocross score (D 5.1)
    Autocross {
        #[arg(long)]
        t_team: f64,
        #[arg(long)]
        t_min: f64,
        #[arg(long, default_value_t = 100.0)]
        p_max: f64,
    },
    /// Endurance score (D 6.3)
    Endurance {
        #[arg(long)]
        t_team: f64,
        #[arg(long)]
        t_min: f64,
        #[arg(long, default_value_t = 250.0)]
        p_max: f64,
    },
    /// Efficiency score (D 7.1)
    Efficiency {
        #[arg(long)]
        e_team: f64,
        #[arg(long)]
        e_min: f64,
        #[arg(long)]
        t_team: f64,
        #[arg(long)]
        t_min: f64,
        #[arg(long, default_value_t = 100.0)]
        p_max: f64,
    },
    /// Simplified cost score (D 3.1)
    Cost {
        #[arg(long)]
        cost_real: f64,
        #[arg(long)]
        cost_min: f64,
        #[arg(long, default_value_t = 100.0)]
        p_max: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Ingest => run_ingest(&config).await,
        Commands::Ask { no_boost } => run_ask(&config, no_boost).await,
        Commands::Search {
            query,
            top_k,
            kind,
            semantic_only,
        } => run_search(&config, &query, top_k, kind, semantic_only).await,
        Commands::Rule { id } => run_rule_lookup(&config, &id).await,
        Commands::Score { event } => run_score(event),
        Commands::Config => run_show_config(&config),
    }
}

/// Build the embedder from the explicit client; the composition root is the
/// only place the API key and model are wired together.
fn build_embedder(config: &Config) -> Result<Embedder> {
    let api_key = Config::api_key()?;
    let client = GeminiEmbeddings::new(api_key, config.models.embedding.clone());
    Ok(Embedder::new(Arc::new(client)))
}

fn build_retriever(config: &Config) -> Result<Retriever> {
    let data_dir = config.data_dir()?;
    let index = load_index(&data_dir).with_context(|| {
        format!(
            "No index snapshot under {}; run `scrutineer ingest` first",
            data_dir.display()
        )
    })?;

    let embedder = build_embedder(config)?;
    Ok(Retriever::new(index, embedder).with_top_k(config.retrieval.top_k))
}

async fn run_ingest(config: &Config) -> Result<()> {
    let embedder = build_embedder(config)?;
    let data_dir = config.data_dir()?;
    let pipeline = IngestPipeline::new(embedder, config, data_dir);

    println!("{}", "Building retrieval index...".bold());
    let report = pipeline.run(&config.documents.sources).await?;

    println!(
        "{} {} documents, {} chunks indexed",
        "Done:".green().bold(),
        report.documents,
        report.chunks
    );
    println!("Snapshot: {}", report.snapshot_dir.display());
    Ok(())
}

async fn run_ask(config: &Config, no_boost: bool) -> Result<()> {
    let retriever = build_retriever(config)?;
    let stats = retriever.statistics();

    println!("{}", "Scrutineer - rulebook questions".bold());
    println!(
        "{} chunks indexed, model {}. Type a question, or 'exit' to quit.\n",
        stats.total_chunks, stats.embedding_model
    );

    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("question> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        editor.add_history_entry(question)?;

        // A failed question is reported and the loop continues.
        let outcome = if no_boost {
            retriever.retrieve(question, None, None, true).await
        } else {
            retriever.retrieve_with_priority_boost(question, None).await
        };

        match outcome {
            Ok(result) => {
                println!("\n{}", retriever.format_context_for_llm(&result));
                println!(
                    "{}",
                    format!(
                        "[{} results via {}]",
                        result.total_found, result.retrieval_method
                    )
                    .dimmed()
                );
            }
            Err(e) => println!("{} {e}", "Error:".red().bold()),
        }
        println!();
    }

    println!("Goodbye.");
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    kind: Option<DocumentKind>,
    semantic_only: bool,
) -> Result<()> {
    let retriever = build_retriever(config)?;

    let result = retriever
        .retrieve(query, top_k, kind, !semantic_only)
        .await?;

    println!("{}", retriever.format_context_for_llm(&result));
    Ok(())
}

async fn run_rule_lookup(config: &Config, id: &str) -> Result<()> {
    let rule_id = RuleId::parse(id)
        .with_context(|| format!("'{id}' is not a rule identifier (expected e.g. 'D 4.3.3')"))?;

    let retriever = build_retriever(config)?;
    let results = retriever.retrieve_by_rule_id(&rule_id).await?;

    if results.is_empty() {
        println!("No chunks cite {}", rule_id.canonical().bold());
        return Ok(());
    }

    println!("Chunks citing {}:\n", rule_id.canonical().bold());
    for result in results {
        let (start, end) = result.metadata.page_range;
        println!(
            "{} [{} pages {start}-{end}]",
            result.chunk_id.cyan(),
            result.metadata.document_kind
        );
        println!("{}\n", result.text);
    }
    Ok(())
}

fn run_score(event: ScoreCommand) -> Result<()> {
    let formula = match event {
        ScoreCommand::Skidpad { t_team, t_max, p_max } => {
            ScoringFormula::Skidpad(SkidpadParams { t_team, t_max, p_max })
        }
        ScoreCommand::Acceleration { t_team, t_max, p_max } => {
            ScoringFormula::Acceleration(AccelerationParams { t_team, t_max, p_max })
        }
        ScoreCommand::Autocross { t_team, t_min, p_max } => {
            ScoringFormula::Autocross(AutocrossParams { t_team, t_min, p_max })
        }
        ScoreCommand::Endurance { t_team, t_min, p_max } => {
            ScoringFormula::Endurance(EnduranceParams { t_team, t_min, p_max })
        }
        ScoreCommand::Efficiency { e_team, e_min, t_team, t_min, p_max } => {
            ScoringFormula::Efficiency(EfficiencyParams { e_team, e_min, t_team, t_min, p_max })
        }
        ScoreCommand::Cost { cost_real, cost_min, p_max } => {
            ScoringFormula::Cost(CostParams { cost_real, cost_min, p_max })
        }
    };

    let outcome = formula.evaluate()?;

    println!(
        "{} {} points",
        format!("{}:", outcome.formula).bold(),
        format!("{:.2}", outcome.score).green().bold()
    );
    println!("Rule: {} ({})", outcome.rule_reference, outcome.version);
    println!("{}", outcome.explanation);
    Ok(())
}

fn run_show_config(config: &Config) -> Result<()> {
    println!("{}", "Scrutineer configuration".bold());
    println!("Config file: {}", Config::config_path()?.display());
    println!("Data dir:    {}", config.data_dir()?.display());
    println!("\n[models]");
    println!("embedding = {}", config.models.embedding);
    println!("\n[retrieval]");
    println!("chunk_size = {}", config.retrieval.chunk_size);
    println!("chunk_overlap = {}", config.retrieval.chunk_overlap);
    println!("min_chunk_size = {}", config.retrieval.min_chunk_size);
    println!("page_window = {}", config.retrieval.page_window);
    println!("top_k = {}", config.retrieval.top_k);
    println!("\n[documents]");
    for source in &config.documents.sources {
        println!("source = {}", source.display());
    }
    if config.documents.sources.is_empty() {
        println!("(no sources configured)");
    }
    Ok(())
}
