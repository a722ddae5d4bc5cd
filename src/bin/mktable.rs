//! Print the PLA truth table of a half-adder (unary-to-binary) constraint
//! shape on stdout, suitable as input to an espresso-compatible logic
//! minimizer. Used to regenerate or audit the covers embedded in the
//! instance generator.
//!
//! The constraint is over N 1-bit addends and one M-bit output and is
//! satisfied when the output equals the number of true addends. For
//! example, with N=4 and M=3 the inputs n=1101b, m=011b satisfy it because
//! 1 + 1 + 0 + 1 == 3.

use anyhow::{ensure, Result};
use clap::Parser;

use sha1sat::encoder::minimize::write_truth_table;

#[derive(Debug, Parser)]
#[command(name = "mktable")]
struct Cli {
    /// Number of 1-bit addends
    n: usize,
    /// Number of output bits
    m: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ensure!(cli.n >= 1 && cli.m >= 1, "N and M must be positive");
    ensure!(cli.n + cli.m <= 24, "table with {} inputs is too large", cli.n + cli.m);

    let stdout = std::io::stdout();
    write_truth_table(&mut stdout.lock(), cli.n, cli.m)?;
    Ok(())
}
