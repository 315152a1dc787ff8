use clap::{Args, Parser, Subcommand};
use sagasu::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Query a recipe database from the command line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to $SAGASU_CONFIG, then config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database directory, overriding the config
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Open the database without taking the lock
    #[arg(long, global = true)]
    bypass_lock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search, optionally filter, then cook the result
    Search(SearchArgs),
    /// Print the database layout and catalog
    Info,
    /// Print one recipe by id
    Get { id: u64 },
    /// Check the checksum of every chunk
    Verify,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(long, default_value_t = 0)]
    min: i32,
    #[arg(long, default_value_t = 120)]
    max: i32,
    /// Modifiers that must be present, e.g. `addLife,critical`
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,
    /// Modifiers that must not be present
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
    /// Also match when the value reaches the range through a crit
    #[arg(long)]
    crit: bool,
    /// Allow recipes using prompt-entanglement-only groups
    #[arg(long)]
    pe_only: bool,
    /// Only keep recipes made of these groups
    #[arg(long, value_delimiter = ',')]
    groups: Vec<GroupId>,
    /// Only keep recipes made of the groups of these actors
    #[arg(long, value_delimiter = ',')]
    actors: Vec<ActorId>,
    /// Cook the final result and print it
    #[arg(long)]
    cook: bool,
    /// Print every event as a JSON line
    #[arg(long)]
    events: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoOutput<'a> {
    path: String,
    chunk_size: u32,
    chunk_count: u32,
    total_record: u64,
    groups: &'a [sagasu::catalog::GroupDef],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path).unwrap_or_else(|e| {
            exit_with_error(&format!(
                "Failed to load config '{}': {}",
                path.display(),
                e
            ))
        }),
        None => Config::load(),
    };
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    config.bypass_lock |= cli.bypass_lock;

    match cli.command {
        Command::Search(args) => run_search(config, args),
        Command::Info => run_info(&config),
        Command::Get { id } => run_get(&config, id),
        Command::Verify => run_verify(&config),
    }
}

fn open_database(config: &Config) -> Database {
    let result = if config.bypass_lock {
        Database::open_unlocked(&config.database_path)
    } else {
        Database::open(&config.database_path)
    };
    result.unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to open database '{}': {}",
            config.database_path.display(),
            e
        ))
    })
}

fn run_search(config: Config, args: SearchArgs) {
    let total_start = Instant::now();
    let filter = SearchFilter {
        min_value: args.min,
        max_value: args.max,
        includes_modifier: parse_modifiers(&args.include),
        excludes_modifier: parse_modifiers(&args.exclude),
        include_crit_rng_hp: args.crit,
        include_pe_only: args.pe_only,
    };

    let (sender, events) = flume::unbounded();
    let host = Host::new(config, sender)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start: {}", e)));
    if let Err(e) = host.initialize().wait() {
        exit_with_error(&format!("Failed to initialize: {}", e));
    }

    let stats = host
        .search(filter)
        .and_then(Operation::wait)
        .unwrap_or_else(|e| exit_with_error(&format!("Search failed: {}", e)));
    print_json(&stats);

    let mut groups = args.groups;
    if !args.actors.is_empty() {
        let db = host
            .database()
            .unwrap_or_else(|e| exit_with_error(&e.to_string()));
        groups.extend(db.catalog().groups_of_actors(&args.actors));
    }
    if !groups.is_empty() {
        let stats = host
            .filter(groups)
            .and_then(Operation::wait)
            .unwrap_or_else(|e| exit_with_error(&format!("Filter failed: {}", e)));
        print_json(&stats);
    }

    if args.cook {
        let output = host
            .cook()
            .and_then(Operation::wait)
            .unwrap_or_else(|e| exit_with_error(&format!("Cook failed: {}", e)));
        if output.stats.found_count > host.result_limit() {
            eprintln!(
                "Only the first {} of {} recipes were cooked",
                host.result_limit(),
                output.stats.found_count
            );
        }
        print_json(&output);
    }

    if args.events {
        for event in events.try_iter() {
            match event.to_json() {
                Ok(json) => eprintln!("{}", json),
                Err(e) => eprintln!("Failed to serialize event {}: {}", event.name(), e),
            }
        }
    }
    eprintln!("Total Execution: {:?}", total_start.elapsed());
}

fn run_info(config: &Config) {
    let db = open_database(config);
    let meta = db.meta();
    print_json(&InfoOutput {
        path: db.path().display().to_string(),
        chunk_size: meta.chunk_size,
        chunk_count: meta.chunk_count,
        total_record: meta.total_record,
        groups: db.catalog().groups(),
    });
}

fn run_get(config: &Config, id: u64) {
    let db = open_database(config);
    let recipe = db
        .get(id)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read recipe {}: {}", id, e)));
    print_json(&recipe);
}

fn run_verify(config: &Config) {
    let db = open_database(config);
    let start = Instant::now();
    let mut failed = 0;
    for chunk in 0..db.chunk_count() {
        if let Err(e) = db.verify_chunk(chunk) {
            eprintln!("  -> chunk {}: {}", chunk, e);
            failed += 1;
        }
    }
    eprintln!(
        "Verified {} chunks in {:?}, {} failed",
        db.chunk_count(),
        start.elapsed(),
        failed
    );
    if failed > 0 {
        std::process::exit(1);
    }
}

fn parse_modifiers(names: &[String]) -> ModifierSet {
    names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| {
            ModifierSet::from_flag_name(name)
                .unwrap_or_else(|| exit_with_error(&format!("Unknown modifier '{}'", name)))
        })
        .fold(ModifierSet::empty(), |acc, flag| acc | flag)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(&format!("Failed to serialize output: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
