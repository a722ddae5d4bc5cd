use anyhow::{bail, Result};

pub mod adders;
pub mod attack;
pub mod formula;
pub mod gates;
pub mod minimize;
pub mod sha1;
pub mod tables;

pub use formula::{AdderKind, EncodeOpts, Encoder, Lit, Word};

/// Which cryptanalytic problem the instance encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attack {
    Preimage,
    SecondPreimage,
    Collision,
}

/// Full instance configuration, normally built from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub attack: Attack,
    pub nr_rounds: usize,
    pub nr_message_bits: usize,
    pub nr_hash_bits: usize,
    pub cnf: bool,
    pub opb: bool,
    pub use_xor_clauses: bool,
    pub use_halfadder_clauses: bool,
    pub use_tseitin_adders: bool,
    pub use_compact_adders: bool,
    pub restrict_branching: bool,
    pub espresso: Option<String>,
    pub seed: u64,
    pub command_line: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            attack: Attack::Preimage,
            nr_rounds: 80,
            nr_message_bits: 0,
            nr_hash_bits: 160,
            cnf: false,
            opb: false,
            use_xor_clauses: false,
            use_halfadder_clauses: false,
            use_tseitin_adders: false,
            use_compact_adders: false,
            restrict_branching: false,
            espresso: None,
            seed: 0,
            command_line: String::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(16..=80).contains(&self.nr_rounds) {
            bail!("--rounds must be between 16 and 80");
        }
        if self.nr_message_bits > 512 {
            bail!("--message-bits must be at most 512");
        }
        if self.nr_hash_bits > 160 {
            bail!("--hash-bits must be at most 160");
        }
        if !self.cnf && !self.opb {
            bail!("must specify either --cnf or --opb");
        }
        if self.use_xor_clauses && !self.cnf {
            bail!("cannot specify --xor without --cnf");
        }
        if self.use_halfadder_clauses && !self.cnf {
            bail!("cannot specify --halfadder without --cnf");
        }
        if self.restrict_branching && !self.cnf {
            bail!("cannot specify --restrict-branching without --cnf");
        }
        if self.use_compact_adders && !self.opb {
            bail!("cannot specify --compact-adders without --opb");
        }
        if self.use_tseitin_adders && self.use_compact_adders {
            bail!("cannot specify both --tseitin-adders and --compact-adders");
        }
        Ok(())
    }

    fn adder_kind(&self) -> AdderKind {
        if self.use_tseitin_adders {
            AdderKind::Tseitin
        } else if self.use_compact_adders {
            AdderKind::Compact
        } else {
            AdderKind::HalfAdder
        }
    }

    pub fn encode_opts(&self) -> EncodeOpts {
        EncodeOpts {
            adders: self.adder_kind(),
            xor_clauses: self.use_xor_clauses,
            native_halfadders: self.use_halfadder_clauses,
            restrict_branching: self.restrict_branching,
            espresso: self.espresso.clone(),
        }
    }
}

/// Finished instance text, one entry per requested format. Each entry is the
/// complete stream including its header line.
#[derive(Debug)]
pub struct Output {
    pub cnf: Option<String>,
    pub opb: Option<String>,
}

/// Build the instance described by `config`. Nothing is written anywhere
/// until construction has fully succeeded.
pub fn generate(config: &Config) -> Result<Output> {
    config.validate()?;

    let mut enc = Encoder::new(config.encode_opts());

    enc.comment("");
    enc.comment(&format!(
        "Instance generated by {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    enc.comment("");
    enc.comment(&format!("command line: {}", config.command_line));
    enc.comment(&format!("parameter seed = {}", config.seed));

    let mut streams = attack::Streams::from_seed(config.seed);
    match config.attack {
        Attack::Preimage => attack::preimage(&mut enc, config, &mut streams)?,
        Attack::SecondPreimage => attack::second_preimage(&mut enc, config, &mut streams)?,
        Attack::Collision => attack::collision(&mut enc, config, &mut streams)?,
    }

    Ok(Output {
        cnf: config.cnf.then(|| enc.cnf_output()),
        opb: config.opb.then(|| enc.opb_output()),
    })
}
