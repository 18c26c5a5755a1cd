//! ATS command line.
//!
//! `ats as <words...>` asserts a new attestation; `ats ax <words...>` runs
//! a query; `ats search <text>` does a rich-text probe over attribute
//! fields. The storage backend is a local SQLite database.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ats_core::parser::Parser;
use ats_core::resolve::{NoopExpander, NoopResolver};
use ats_core::richtext::RichTextSearch;
use ats_core::sign::AttestationSigner;
use ats_core::storage::AttestationStore;
use ats_core::{run_query, AxFilter};
use ats_sqlite::SqliteStore;

#[derive(ClapParser)]
#[command(name = "ats", version, about = "attestation graph engine")]
struct Cli {
    /// Path to the attestation database
    #[arg(long, default_value = "ats.db", global = true)]
    db: PathBuf,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assert a new attestation: ats as ALICE is engineer of acme
    #[command(name = "as")]
    Assert {
        /// Assertion words
        args: Vec<String>,

        /// Hex-encoded Ed25519 private key file; signs the attestation
        #[arg(long)]
        sign_key: Option<PathBuf>,
    },

    /// Query attestations: ats ax ALICE since '2024-01-01'
    #[command(name = "ax")]
    Ax {
        /// Query words
        args: Vec<String>,

        /// Output format (table or json), overriding the filter default
        #[arg(long)]
        format: Option<String>,
    },

    /// Rich-text search over attestation attributes
    Search {
        query: String,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open(&cli.db)?;
    debug!(db = %cli.db.display(), "database opened");

    match cli.command {
        Command::Assert { args, sign_key } => assert_command(&mut store, &args, sign_key),
        Command::Ax { args, format } => query_command(&store, &args, format),
        Command::Search { query, limit } => search_command(&store, &query, limit),
    }
}

fn assert_command(
    store: &mut SqliteStore,
    args: &[String],
    sign_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Parser::new().parse_command(args)?;
    for warning in &parsed.warnings {
        eprintln!("{}", warning.render_plain());
    }

    let mut attestation = store.generate_and_create(parsed.value, "cli")?;

    if let Some(key_path) = sign_key {
        let signer = load_signer(&key_path)?;
        signer.sign(&mut attestation)?;
        store.update(attestation.clone())?;
        println!("signed by {}", attestation.signer_did);
    }

    println!("created {}", attestation.id);
    Ok(())
}

fn query_command(
    store: &SqliteStore,
    args: &[String],
    format: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Parser::new().parse_query(args)?;
    for warning in &parsed.warnings {
        eprintln!("{}", warning.render_plain());
    }

    let filter = parsed.value;
    let result = run_query(store, &filter, &NoopResolver, &NoopExpander)?;

    let format = format.unwrap_or_else(|| filter.format.clone());
    match format.as_str() {
        "json" => println!("{}", render::render_json(&result)?),
        _ => print!("{}", render::render_table(&result)),
    }
    Ok(())
}

fn search_command(
    store: &SqliteStore,
    query: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    // Probe the full live set; the hit limit is applied by the searcher
    let filter = AxFilter {
        limit: usize::MAX,
        ..Default::default()
    };
    let result = store.query(&filter)?;

    let hits = RichTextSearch::new(&[])
        .with_limit(limit)
        .search(&result.attestations, query);
    print!("{}", render::render_hits(&hits));
    Ok(())
}

fn load_signer(path: &PathBuf) -> Result<AttestationSigner, Box<dyn std::error::Error>> {
    let hex_key = std::fs::read_to_string(path)?;
    let bytes = hex::decode(hex_key.trim())?;
    let secret: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("sign key must be 32 bytes, got {}", bytes.len()))?;
    Ok(AttestationSigner::from_bytes(&secret))
}
