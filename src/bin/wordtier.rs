use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wordtier::server::{start_server, ServerSettings};
use wordtier::{
    validate_forest, InMemoryStore, Metric, Pipeline, PipelineConfig, SimpleTokenizer,
    WeightingMode,
};

#[derive(Parser, Debug)]
#[command(
    name = "wordtier",
    about = "Hierarchical word clusters from text via k-NN graphs and Louvain"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster one text and print the node array as JSON.
    Cluster {
        /// Text file to read; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
        /// Check the output tree and report problems on stderr.
        #[arg(long)]
        validate: bool,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Start the HTTP API server.
    Serve {
        /// Address to bind the HTTP server to (host:port).
        #[arg(long, env = "WORDTIER_BIND", default_value = "127.0.0.1:8080")]
        bind: String,
        /// Per-request deadline in milliseconds.
        #[arg(long, env = "WORDTIER_TIMEOUT_MS")]
        timeout_ms: Option<u64>,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Word vectors in word2vec text format.
    #[arg(long, env = "WORDTIER_VECTORS")]
    vectors: PathBuf,
    /// Corpus frequencies, one `word count` pair per line.
    #[arg(long, env = "WORDTIER_FREQUENCIES")]
    frequencies: Option<PathBuf>,
    /// Language code the vectors and text are in.
    #[arg(long, env = "WORDTIER_LANG", default_value = "en")]
    lang: String,
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// Maximum number of words kept.
    #[arg(long, env = "WORDTIER_WORDS", default_value_t = wordtier::config::DEFAULT_MAX_WORDS)]
    words: usize,
    /// Neighbors per word in the similarity graph.
    #[arg(long, env = "WORDTIER_NEIGHBORS", default_value_t = wordtier::config::DEFAULT_K)]
    n_neighbors: usize,
    /// Word weighting: inverse-frequency or raw-count.
    #[arg(long, env = "WORDTIER_WEIGHTING", default_value = "inverse-frequency")]
    weighting: WeightingMode,
    /// Distance metric: cosine, euclidean or manhattan.
    #[arg(long, env = "WORDTIER_METRIC", default_value = "cosine")]
    metric: Metric,
    /// Modularity resolution.
    #[arg(long, env = "WORDTIER_RESOLUTION", default_value_t = 1.0)]
    resolution: f64,
    /// Seed for a shuffled node visiting order.
    #[arg(long, env = "WORDTIER_SEED")]
    seed: Option<u64>,
}

impl ParamArgs {
    fn to_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_max_words(self.words)
            .with_k(self.n_neighbors)
            .with_weighting(self.weighting)
            .with_metric(self.metric)
            .with_resolution(self.resolution)
            .with_seed(self.seed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cluster {
            input,
            pretty,
            validate,
            store,
            params,
        } => cmd_cluster(input.as_deref(), pretty, validate, &store, &params),
        Commands::Serve {
            bind,
            timeout_ms,
            store,
            params,
        } => cmd_serve(&bind, timeout_ms, &store, &params).await,
    }
}

fn load_store(args: &StoreArgs) -> Result<InMemoryStore> {
    let mut store = InMemoryStore::new();
    let file = File::open(&args.vectors)
        .with_context(|| format!("failed to open {}", args.vectors.display()))?;
    let n = store
        .load_word2vec_text(BufReader::new(file), &args.lang)
        .with_context(|| format!("failed to load vectors from {}", args.vectors.display()))?;
    tracing::info!("Loaded {} vectors for '{}'", n, args.lang);

    if let Some(path) = &args.frequencies {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let n = store
            .load_frequencies(BufReader::new(file), &args.lang)
            .with_context(|| format!("failed to load frequencies from {}", path.display()))?;
        tracing::info!("Loaded {} frequencies for '{}'", n, args.lang);
    }
    Ok(store)
}

fn read_text(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn cmd_cluster(
    input: Option<&Path>,
    pretty: bool,
    validate: bool,
    store: &StoreArgs,
    params: &ParamArgs,
) -> Result<()> {
    let config = params.to_config();
    let pipeline = Pipeline::new(SimpleTokenizer::new(), load_store(store)?);
    let text = read_text(input)?;

    let nodes = pipeline.run(&text, &store.lang, &config)?;

    if validate {
        let report = validate_forest(&nodes);
        if !report.is_clean() {
            eprintln!("{report}");
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, &nodes)?;
    } else {
        serde_json::to_writer(&mut out, &nodes)?;
    }
    writeln!(out)?;
    Ok(())
}

async fn cmd_serve(
    bind: &str,
    timeout_ms: Option<u64>,
    store: &StoreArgs,
    params: &ParamArgs,
) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;
    let defaults = params.to_config();
    defaults.validate()?;

    let pipeline = Arc::new(Pipeline::new(
        SimpleTokenizer::new(),
        Arc::new(load_store(store)?),
    ));
    let settings = ServerSettings {
        defaults,
        default_lang: store.lang.clone(),
        request_timeout: timeout_ms.map(Duration::from_millis),
    };
    start_server(pipeline, settings, addr).await
}
