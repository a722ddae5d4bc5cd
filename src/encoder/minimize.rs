use std::io::{Read, Write};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use super::formula::Lit;
use super::tables;

/// Minimization of the half-adder truth table for `n` addends and `m`
/// output bits into a product-of-sums cover.
///
/// Implementations must be pure functions of `(n, m)`: the table depends
/// only on the arities, and the returned term order fixes the clause
/// emission order of the instance.
///
/// Terms use the minimizer's column convention: literal `i` refers to
/// column `i - 1` of the truth table (addends first, then the output group
/// msb first), positive when the column selects the original variable.
pub trait Minimize {
    fn minimize(&self, n: usize, m: usize) -> Result<Vec<Vec<Lit>>>;
}

/// Covers compiled into the binary, one per arity pair produced by the
/// 2- and 5-input adders. See [`tables`].
pub struct EmbeddedTables;

impl Minimize for EmbeddedTables {
    fn minimize(&self, n: usize, m: usize) -> Result<Vec<Vec<Lit>>> {
        match tables::lookup(n, m) {
            Some(table) => Ok(table.iter().map(|term| term.to_vec()).collect()),
            None => bail!(
                "no embedded cover for half-adder shape ({}, {}); rerun with --espresso",
                n,
                m
            ),
        }
    }
}

/// Dialogue with an external espresso-compatible minimizer over pipes:
/// write the complete PLA description, close the write side, read product
/// terms back until `.e`, reap the child. Any failure is fatal.
pub struct Espresso {
    pub program: String,
}

impl Minimize for Espresso {
    fn minimize(&self, n: usize, m: usize) -> Result<Vec<Vec<Lit>>> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn minimizer '{}'", self.program))?;

        {
            let stdin = child.stdin.take().context("minimizer stdin unavailable")?;
            let mut stdin = std::io::BufWriter::new(stdin);
            write_truth_table(&mut stdin, n, m)
                .with_context(|| format!("failed to write truth table ({}, {})", n, m))?;
            stdin.flush().context("failed to flush truth table")?;
        }

        let mut output = String::new();
        child
            .stdout
            .take()
            .context("minimizer stdout unavailable")?
            .read_to_string(&mut output)
            .context("failed to read minimizer output")?;

        let status = child.wait().context("failed to reap minimizer")?;
        if !status.success() {
            bail!("minimizer '{}' exited with {}", self.program, status);
        }

        parse_product_terms(&output, n + m)
    }
}

/// The PLA truth table of the half-adder constraint: one row per
/// combination of `n` addend bits and `m` output bits, both groups written
/// msb first and complemented, marked invalid when the popcount of the
/// addends differs from the binary value of the output group.
pub fn write_truth_table<W: Write>(out: &mut W, n: usize, m: usize) -> std::io::Result<()> {
    writeln!(out, ".i {}", n + m)?;
    writeln!(out, ".o 1")?;
    for i in 0..1u64 << n {
        for j in 0..1u64 << m {
            let mut row = String::with_capacity(n + m);
            for k in (0..n).rev() {
                row.push(if (i >> k) & 1 == 0 { '1' } else { '0' });
            }
            for k in (0..m).rev() {
                row.push(if (j >> k) & 1 == 0 { '1' } else { '0' });
            }
            writeln!(out, "{} {}", row, u64::from(u64::from(i.count_ones()) != j))?;
        }
    }
    writeln!(out, ".e")
}

fn parse_product_terms(output: &str, width: usize) -> Result<Vec<Vec<Lit>>> {
    let mut terms = Vec::new();
    let mut terminated = false;
    for line in output.lines() {
        if line.starts_with(".i") || line.starts_with(".o") || line.starts_with(".p") {
            continue;
        }
        if line.starts_with(".e") {
            terminated = true;
            break;
        }
        let mut term = Vec::new();
        for (i, ch) in line.chars().take(width).enumerate() {
            match ch {
                '0' => term.push(-(i as Lit + 1)),
                '1' => term.push(i as Lit + 1),
                _ => {}
            }
        }
        if !term.is_empty() {
            terms.push(term);
        }
    }
    if !terminated {
        bail!("truncated minimizer output (missing .e)");
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table_uses_the_pla_format() {
        let mut out = Vec::new();
        write_truth_table(&mut out, 2, 1).unwrap();
        let expected = "\
.i 3
.o 1
111 0
110 1
101 1
100 0
011 1
010 0
001 1
000 1
.e
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn product_terms_are_parsed_with_dont_cares() {
        let terms = parse_product_terms(".p 2\n10-1 1\n0110 1\n.e\n", 4).unwrap();
        assert_eq!(terms, vec![vec![1, -2, 4], vec![-1, 2, 3, -4]]);
    }

    #[test]
    fn truncated_output_is_an_error() {
        assert!(parse_product_terms("10 1\n", 2).is_err());
    }

    #[test]
    fn embedded_tables_cover_the_adder_shapes() {
        for (n, m) in [(2, 2), (3, 2), (5, 3), (6, 3), (7, 3)] {
            assert!(EmbeddedTables.minimize(n, m).is_ok());
        }
        assert!(EmbeddedTables.minimize(9, 4).is_err());
    }
}
