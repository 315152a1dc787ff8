use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sagasu::catalog::{ActorDef, GroupDef};
use sagasu::prelude::*;
use sagasu::store::NUM_SLOTS;
use sagasu::store::record::MAX_VALUE;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A CLI tool to generate a random recipe database
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The directory to write the database to
    #[arg(short, long, default_value = "database")]
    output: PathBuf,

    /// Number of recipes to generate
    #[arg(short, long, default_value_t = 100_000)]
    recipes: u64,

    /// Number of records per chunk
    #[arg(long, default_value_t = 4096)]
    chunk_size: u32,

    /// Number of ingredient groups in the catalog
    #[arg(long, default_value_t = 64)]
    groups: u16,

    /// The maximum number of actors in each group
    #[arg(long, default_value_t = 3)]
    max_actors: u16,

    /// Chance for a group to be prompt-entanglement only
    #[arg(long, default_value_t = 0.1)]
    pe_only_chance: f64,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.groups == 0 || cli.max_actors == 0 {
        eprintln!("Error: --groups and --max-actors must be at least 1");
        std::process::exit(1);
    }
    if !(0.0..=1.0).contains(&cli.pe_only_chance) {
        eprintln!(
            "Error: --pe-only-chance ({}) must be between 0 and 1",
            cli.pe_only_chance
        );
        std::process::exit(1);
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    info!(seed, "generating database");
    let start = Instant::now();

    let catalog = generate_catalog(&mut rng, &cli)?;
    let mut builder = DatabaseBuilder::new(&cli.output, catalog, cli.chunk_size)?;
    for _ in 0..cli.recipes {
        builder.push(generate_recipe(&mut rng, cli.groups))?;
    }
    let meta = builder.finish()?;

    println!(
        "Successfully generated {} recipes in {} chunks at '{}' in {:?}",
        meta.total_record,
        meta.chunk_count,
        cli.output.display(),
        start.elapsed()
    );
    Ok(())
}

/// Groups `1..=groups`, each with 1 to `max_actors` actors with unique ids.
fn generate_catalog(rng: &mut StdRng, cli: &Cli) -> Result<Catalog, DatabaseError> {
    let mut next_actor: ActorId = 1;
    let mut groups = Vec::with_capacity(cli.groups as usize);
    for id in 1..=cli.groups {
        let count = rng.random_range(1..=cli.max_actors);
        let actors = (0..count)
            .map(|i| {
                let actor = ActorDef {
                    id: next_actor,
                    name: format!("Actor {}-{}", id, i),
                };
                next_actor += 1;
                actor
            })
            .collect();
        groups.push(GroupDef {
            id,
            name: format!("Group {}", id),
            pe_only: rng.random_bool(cli.pe_only_chance),
            actors,
        });
    }
    println!("-> Generated {} groups and {} actors.", groups.len(), next_actor - 1);
    Catalog::new(groups)
}

fn generate_recipe(rng: &mut StdRng, groups: u16) -> RecipeEntry {
    let count = rng.random_range(1..=NUM_SLOTS);
    let mut modifier = ModifierSet::empty();
    for (_, flag) in ModifierSet::all().iter_names() {
        if rng.random_bool(0.15) {
            modifier |= flag;
        }
    }
    RecipeEntry {
        groups: (0..count).map(|_| rng.random_range(1..=groups)).collect(),
        value: rng.random_range(0..=MAX_VALUE),
        modifier,
        hearty: rng.random_bool(0.1),
        crit_rng: rng.random_bool(0.3),
    }
}
