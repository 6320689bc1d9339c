use clap::{Args, Parser, Subcommand};
use pib_core::{
    load_store, Candidate, LevelGroups, MatchMode, PibConfig, PibError, PolicyStore, Request,
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pib",
    version,
    about = "Match transport candidates against a policy information base"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Directory containing policy files
    #[arg(long)]
    policy_dir: Option<PathBuf>,

    /// Require every match key of a policy to be satisfied
    #[arg(long)]
    match_all: bool,

    /// Let informational properties satisfy stronger match requirements
    #[arg(long)]
    lenient: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the policy directory and print the PIB
    Policies {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Apply the PIB to the candidates of a request
    Lookup {
        #[command(flatten)]
        store: StoreArgs,

        /// JSON file with immutable/requested/informational request properties
        #[arg(long)]
        request: PathBuf,

        /// JSON array of per-candidate properties, layered onto the request
        #[arg(long)]
        candidates: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PibError> {
    let config = match &cli.config {
        Some(path) => PibConfig::from_file(path)?,
        None => PibConfig::default(),
    };

    match cli.command {
        Commands::Policies { store } => {
            let store = open_store(&config, &store)?;
            println!("{}", store);
        }
        Commands::Lookup {
            store,
            request,
            candidates,
        } => {
            let store = open_store(&config, &store)?;
            let mut request = read_request(&request, candidates.as_deref())?;
            let report = request.lookup_all(&store);

            println!("{}", request);
            for (rank, candidate) in request.ranked().into_iter().enumerate() {
                println!("#{} score {:+.1}", rank + 1, candidate.score());
                println!("  {}", candidate.properties);
                println!("  policies: {}", policy_names(&store, candidate).join(", "));
            }
            println!("{} candidate(s) invalidated by policy", report.invalidated.len());
        }
    }
    Ok(())
}

fn open_store(config: &PibConfig, args: &StoreArgs) -> Result<PolicyStore, PibError> {
    let mut config = config.clone();
    if let Some(dir) = &args.policy_dir {
        config.policy_dir = dir.clone();
    }
    if args.match_all {
        config.match_mode = MatchMode::All;
    }
    if args.lenient {
        config.strict = false;
    }

    let (store, report) = load_store(&config)?;
    info!(
        "Loaded {} policies from {} ({} skipped, {} failed)",
        report.loaded.len(),
        config.policy_dir.display(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(store)
}

fn read_request(request: &Path, candidates: Option<&Path>) -> Result<Request, PibError> {
    let groups: LevelGroups = serde_json::from_str(&std::fs::read_to_string(request)?)?;
    let mut request = groups.to_request()?;

    let Some(path) = candidates else {
        request.push_candidate(request.candidate());
        return Ok(request);
    };

    let entries: Vec<LevelGroups> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    debug!("Read {} candidate(s) from {}", entries.len(), path.display());
    for entry in entries {
        request.push_candidate(layer_candidate(&request, &entry)?);
    }
    Ok(request)
}

/// A copy of the request properties with `entry` laid over it.
///
/// Entry properties replace request properties with the same key. Nothing is
/// scored here, so every candidate enters lookup with a zero score.
fn layer_candidate(request: &Request, entry: &LevelGroups) -> Result<Candidate, PibError> {
    let mut candidate = request.candidate();
    for property in &entry.to_property_set()? {
        candidate.properties.put(property.clone());
    }
    Ok(candidate)
}

fn policy_names(store: &PolicyStore, candidate: &Candidate) -> Vec<String> {
    candidate
        .applied_policies()
        .iter()
        .filter_map(|id| store.get(*id))
        .map(|policy| policy.name.clone())
        .collect()
}
