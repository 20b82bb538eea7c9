use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsift_search::{RankingProfile, SearchEngine, SearchQuery};
use docsift_vector_store::VectorStore;
use std::env;
use std::path::{Path, PathBuf};

mod input;
mod report;

const PROFILE_ENV: &str = "DOCSIFT_PROFILE";

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Rank documents by keyword, semantic and metadata relevance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Ranking profile file, JSON or TOML (default: $DOCSIFT_PROFILE, then the bundled profile)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a corpus of documents for a query
    Search(SearchArgs),

    /// Show how a query expands with synonyms
    Expand(ExpandArgs),

    /// Group vectors by cosine similarity
    Cluster(ClusterArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// JSON array of documents
    #[arg(long)]
    corpus: PathBuf,

    /// JSON array of {id, vector, metadata} records
    #[arg(long)]
    vectors: Option<PathBuf>,

    /// Query embedding, comma-separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    query_vector: Option<Vec<f32>>,

    /// Maximum number of results
    #[arg(long)]
    top_k: Option<usize>,

    /// Minimum final score (overrides the profile)
    #[arg(long)]
    min_score: Option<f32>,

    /// Skip synonym expansion
    #[arg(long)]
    no_expand: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Search query
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

#[derive(Args)]
struct ExpandArgs {
    /// Print the expansion as JSON
    #[arg(long)]
    json: bool,

    /// Query to expand
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

#[derive(Args)]
struct ClusterArgs {
    /// JSON array of {id, vector, metadata} records
    #[arg(long)]
    vectors: PathBuf,

    /// Minimum cosine similarity to join a cluster
    #[arg(long, default_value_t = 0.7)]
    threshold: f32,

    /// Print clusters as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let profile = load_profile(cli.profile.as_deref())?;

    match cli.command {
        Commands::Search(args) => run_search(args, profile).await?,
        Commands::Expand(args) => run_expand(&args, &profile)?,
        Commands::Cluster(args) => run_cluster(args).await?,
    }

    Ok(())
}

fn load_profile(flag: Option<&Path>) -> Result<RankingProfile> {
    let from_env = env::var_os(PROFILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    match flag.map(Path::to_path_buf).or(from_env) {
        Some(path) => {
            let profile = RankingProfile::from_file(&path)?;
            log::debug!("Using profile '{}' from {}", profile.name(), path.display());
            Ok(profile)
        }
        None => RankingProfile::bundled(),
    }
}

async fn run_search(args: SearchArgs, profile: RankingProfile) -> Result<()> {
    let (documents, vectors) = input::load_inputs(&args.corpus, args.vectors.as_deref()).await?;

    let engine = SearchEngine::new(profile)?;
    for record in vectors {
        engine
            .upsert_vector(&record.id, record.vector, record.metadata)
            .with_context(|| format!("Failed to store vector '{}'", record.id))?;
    }
    engine
        .index(documents)
        .with_context(|| format!("Failed to index {}", args.corpus.display()))?;

    let mut query = SearchQuery::new(args.query.join(" "));
    if let Some(top_k) = args.top_k {
        query = query.top_k(top_k);
    }
    if let Some(min_score) = args.min_score {
        query = query.min_relevance(min_score);
    }
    if let Some(vector) = args.query_vector {
        query = query.vector(vector);
    }
    if args.no_expand {
        query = query.without_expansion();
    }

    let results = engine.search(&query)?;
    log::info!("Found {} results for '{}'", results.len(), query.text);

    if args.json {
        report::print_json(&results)?;
    } else {
        report::print_results(&engine, &results);
    }
    Ok(())
}

fn run_expand(args: &ExpandArgs, profile: &RankingProfile) -> Result<()> {
    let query = args.query.join(" ");
    let expansion = profile.expander().expand(&query);
    report::print_expansion(&query, &expansion, args.json)
}

async fn run_cluster(args: ClusterArgs) -> Result<()> {
    let records = input::load_vectors(&args.vectors).await?;
    let ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();

    let store = VectorStore::new();
    store
        .upsert_batch(records)
        .with_context(|| format!("Invalid vectors in {}", args.vectors.display()))?;

    let clusters = store.cluster(&ids, args.threshold);
    report::print_clusters(&clusters, args.json)
}
