//! Command-line interface.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use crate::config::{ConnectionArgs, DEFAULT_MODEL, EsConfig};
use crate::corpus::embed_directory;
use crate::embed::{create_embedder, model_dimension};
use crate::es::{EsClient, EsError, IndexSpec, Similarity};
use crate::profiler::Profiler;
use crate::search::{
    DEFAULT_K, DEFAULT_NUM_CANDIDATES, DEFAULT_TOP, InteractiveTerminal, ScriptedTerminal,
    SemanticSearcher, Terminal, format_results, run_session,
};

#[derive(Parser, Debug)]
#[command(
    name = "essearch",
    version,
    about = "Embed local text files into Elasticsearch and search them semantically",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Embedding model: a Hugging Face id, its short name, or `hash[:dims]`
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Logging configuration file, reloaded on change [default: logging.yaml]
    #[arg(long, env = "ESSEARCH_LOG_CONFIG", global = true)]
    pub log_config: Option<PathBuf>,

    /// Append profiling reports to this file
    #[arg(long, env = "ESSEARCH_PROFILE_LOG", global = true)]
    pub profile_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show cluster name, node and version
    Info,

    /// Create an index with a dense_vector mapping
    #[command(
        after_help = "EXAMPLES:\n    essearch create-index --index-name es0\n    essearch create-index --index-name es0 --embedding-dims 384 --recreate"
    )]
    CreateIndex(CreateIndexArgs),

    /// Embed every .txt file in a directory and index it
    Embed(EmbedArgs),

    /// Interactive semantic search
    #[command(
        after_help = "EXAMPLES:\n    essearch search --index-name es0\n    essearch search --index-name es0 --query 'ownership rules' --top 5"
    )]
    Search(SearchArgs),

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct CreateIndexArgs {
    #[arg(long)]
    pub index_name: String,

    /// Vector length; defaults to the model's dimension
    #[arg(long)]
    pub embedding_dims: Option<usize>,

    #[arg(long, default_value_t = 2)]
    pub shards: u32,

    #[arg(long, default_value_t = 1)]
    pub replicas: u32,

    #[arg(long, value_enum, default_value_t = Similarity::Cosine)]
    pub similarity: Similarity,

    /// Delete the index first if it exists
    #[arg(long)]
    pub recreate: bool,
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Directory holding the .txt files
    #[arg(long)]
    pub data_path: PathBuf,

    #[arg(long)]
    pub index_name: String,

    /// Skip the index refresh after embedding
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub index_name: String,

    /// Hits requested from the engine
    #[arg(long, default_value_t = DEFAULT_K)]
    pub k: usize,

    /// Candidates considered per shard (raised to k when lower)
    #[arg(long, default_value_t = DEFAULT_NUM_CANDIDATES)]
    pub num_candidates: usize,

    /// Hits shown per query
    #[arg(long, default_value_t = DEFAULT_TOP)]
    pub top: usize,

    /// Run one search and exit
    #[arg(long)]
    pub query: Option<String>,
}

impl Cli {
    fn client(&self) -> Result<EsClient> {
        let config = EsConfig::from_args(&self.connection).context("invalid connection settings")?;
        tracing::debug!(url = config.base_url(), "connecting to elasticsearch");
        Ok(EsClient::new(config)?)
    }

    fn profiler(&self) -> Profiler {
        match &self.profile_log {
            Some(path) => Profiler::new().with_log_file(path),
            None => Profiler::new(),
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Info => run_info(&cli),
        Commands::CreateIndex(args) => run_create_index(&cli, args),
        Commands::Embed(args) => run_embed(&cli, args),
        Commands::Search(args) => run_search(&cli, args),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            run_completions(*shell, &mut command, &mut io::stdout())
        }
    }
}

fn run_info(cli: &Cli) -> Result<()> {
    let client = cli.client()?;
    let info = client
        .info()
        .with_context(|| format!("querying {}", client.config().base_url()))?;
    tracing::info!(%info, "connected");
    println!("{} {}", "Cluster:".bold(), info.cluster_name);
    println!("{} {}", "Node:".bold(), info.name);
    println!("{} {}", "Version:".bold(), info.version.number);
    Ok(())
}

fn run_create_index(cli: &Cli, args: &CreateIndexArgs) -> Result<()> {
    let dims = match args.embedding_dims {
        Some(dims) => dims,
        None => model_dimension(&cli.model)?,
    };
    anyhow::ensure!(dims > 0, "--embedding-dims must be positive");

    let spec = IndexSpec {
        shards: args.shards,
        replicas: args.replicas,
        dims,
        similarity: args.similarity,
    };

    let client = cli.client()?;
    if args.recreate && client.delete_index(&args.index_name)? {
        tracing::info!(index = %args.index_name, "deleted existing index");
    }

    match client.create_index(&args.index_name, &spec) {
        Ok(()) => {
            tracing::info!(index = %args.index_name, dims, "created index");
            println!("Created index {} ({dims} dims)", args.index_name);
            Ok(())
        }
        Err(EsError::IndexExists(index)) => {
            tracing::debug!(index = %index, "index already exists");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("creating index {}", args.index_name)),
    }
}

fn run_embed(cli: &Cli, args: &EmbedArgs) -> Result<()> {
    if !args.data_path.is_dir() {
        anyhow::bail!("data path {} is not a directory", args.data_path.display());
    }
    let client = cli.client()?;
    let mut embedder = create_embedder(&cli.model)?;

    let report = cli.profiler().run("embed_directory", || {
        embed_directory(&client, embedder.as_mut(), &args.index_name, &args.data_path)
    })?;

    if !args.no_refresh {
        client
            .refresh(&args.index_name)
            .with_context(|| format!("refreshing index {}", args.index_name))?;
    }

    println!(
        "Indexed {} document(s) into {} ({} skipped, {} failed)",
        report.indexed,
        args.index_name,
        report.skipped,
        report.failed()
    );
    for failure in &report.failures {
        eprintln!("{} {}: {}", "failed".red(), failure.path.display(), failure.error);
    }
    Ok(())
}

fn run_search(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let client = cli.client()?;
    let embedder = create_embedder(&cli.model)?;
    let mut searcher = SemanticSearcher::new(&client, embedder, &args.index_name)
        .with_k(args.k)
        .with_num_candidates(args.num_candidates);
    let profiler = cli.profiler();
    let mut out = io::stdout().lock();

    if let Some(query) = &args.query {
        let hits = profiler.run("perform_search", || searcher.search(query))?;
        writeln!(out, "{}", "Results:".bold())?;
        for line in format_results(&hits, args.top) {
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    let mut terminal: Box<dyn Terminal> = if io::stdin().is_terminal() {
        Box::new(InteractiveTerminal::new())
    } else {
        Box::new(ScriptedTerminal::new(io::stdin().lock()))
    };
    let stats = run_session(&mut searcher, terminal.as_mut(), &mut out, args.top, &profiler)?;
    tracing::debug!(
        queries = stats.queries,
        failures = stats.failures,
        "search session finished"
    );
    Ok(())
}

fn run_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) -> Result<()> {
    let name = command.get_name().to_string();
    clap_complete::generate(shell, command, name, out);
    Ok(())
}
