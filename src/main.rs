use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sha1sat::encoder::{self, Attack, Config};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AttackArg {
    Preimage,
    SecondPreimage,
    Collision,
}

impl From<AttackArg> for Attack {
    fn from(arg: AttackArg) -> Self {
        match arg {
            AttackArg::Preimage => Attack::Preimage,
            AttackArg::SecondPreimage => Attack::SecondPreimage,
            AttackArg::Collision => Attack::Collision,
        }
    }
}

/// SAT and pseudo-boolean instance generator for SHA-1 preimage,
/// second-preimage and collision attacks.
#[derive(Debug, Parser)]
#[command(name = "sha1sat", version)]
struct Cli {
    /// Random number seed (default: wall-clock seconds)
    #[arg(long)]
    seed: Option<u64>,

    /// Attack type
    #[arg(long, value_enum, default_value = "preimage")]
    attack: AttackArg,

    /// Number of rounds (16-80)
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u32).range(16..=80))]
    rounds: u32,

    /// Number of fixed message bits (0-512)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=512))]
    message_bits: u32,

    /// Number of fixed hash bits (0-160)
    #[arg(long, default_value_t = 160, value_parser = clap::value_parser!(u32).range(0..=160))]
    hash_bits: u32,

    /// Generate CNF
    #[arg(long)]
    cnf: bool,

    /// Generate OPB
    #[arg(long)]
    opb: bool,

    /// Use the Tseitin encoding of the circuit representation of adders
    #[arg(long)]
    tseitin_adders: bool,

    /// Use XOR clauses (CNF only)
    #[arg(long)]
    xor: bool,

    /// Use half-adder clauses (CNF only)
    #[arg(long)]
    halfadder: bool,

    /// Restrict branching variables to message bits (CNF only)
    #[arg(long)]
    restrict_branching: bool,

    /// Use compact adders (OPB only)
    #[arg(long)]
    compact_adders: bool,

    /// Pipe half-adder truth tables to an external logic minimizer instead
    /// of using the embedded covers
    #[arg(long, value_name = "PATH")]
    espresso: Option<String>,
}

fn main() -> Result<()> {
    // Logging goes to stderr; stdout carries only the instance.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .try_init();

    let cli = Cli::parse();

    let seed = match cli.seed {
        Some(seed) => seed,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };
    debug!(seed, "starting instance generation");

    let config = Config {
        attack: cli.attack.into(),
        nr_rounds: cli.rounds as usize,
        nr_message_bits: cli.message_bits as usize,
        nr_hash_bits: cli.hash_bits as usize,
        cnf: cli.cnf,
        opb: cli.opb,
        use_xor_clauses: cli.xor,
        use_halfadder_clauses: cli.halfadder,
        use_tseitin_adders: cli.tseitin_adders,
        use_compact_adders: cli.compact_adders,
        restrict_branching: cli.restrict_branching,
        espresso: cli.espresso,
        seed,
        command_line: env::args().collect::<Vec<_>>().join(" "),
    };

    let out = encoder::generate(&config)?;
    if let Some(cnf) = out.cnf {
        print!("{}", cnf);
    }
    if let Some(opb) = out.opb {
        print!("{}", opb);
    }
    Ok(())
}
