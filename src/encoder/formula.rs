use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;

use super::minimize::{EmbeddedTables, Espresso, Minimize};

pub const WORD_BITS: usize = 32;

/// A literal: a strictly positive variable id, negated by integer negation.
/// Zero is reserved as the end-of-clause marker.
pub type Lit = i32;

/// A 32-bit quantity as boolean variables, bit 0 least significant.
pub type Word = [Lit; WORD_BITS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdderKind {
    /// Column-wise unary-to-binary constraints, minimized per arity (default).
    HalfAdder,
    /// Ripple-carry circuit through auxiliary gate variables.
    Tseitin,
    /// One linear equation per adder, OPB sink only.
    Compact,
}

/// Encoding options, a subset of the full [`Config`](super::Config).
#[derive(Debug, Clone)]
pub struct EncodeOpts {
    pub adders: AdderKind,
    pub xor_clauses: bool,
    pub native_halfadders: bool,
    pub restrict_branching: bool,
    /// Pipe half-adder truth tables to this external minimizer instead of
    /// using the embedded covers.
    pub espresso: Option<String>,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            adders: AdderKind::HalfAdder,
            xor_clauses: false,
            native_halfadders: false,
            restrict_branching: false,
            espresso: None,
        }
    }
}

/// The one-shot instance builder: variable registry, CNF and OPB sinks,
/// counters and the half-adder minimization cache.
///
/// Both sinks are always filled; the driver decides which to flush. Header
/// lines are prepended at flush time so a failed construction emits nothing.
pub struct Encoder {
    pub(crate) opts: EncodeOpts,
    cnf_buf: String,
    opb_buf: String,
    nr_variables: Lit,
    nr_clauses: usize,
    nr_xor_clauses: usize,
    nr_constraints: usize,
    minimizer: Box<dyn Minimize>,
    halfadder_cache: HashMap<(usize, usize), Rc<Vec<Vec<Lit>>>>,
}

impl Encoder {
    pub fn new(opts: EncodeOpts) -> Self {
        let minimizer: Box<dyn Minimize> = match &opts.espresso {
            Some(program) => Box::new(Espresso { program: program.clone() }),
            None => Box::new(EmbeddedTables),
        };
        Self {
            opts,
            cnf_buf: String::new(),
            opb_buf: String::new(),
            nr_variables: 0,
            nr_clauses: 0,
            nr_xor_clauses: 0,
            nr_constraints: 0,
            minimizer,
            halfadder_cache: HashMap::new(),
        }
    }

    /// Allocate `n` consecutive fresh variables. When branching restriction
    /// is active, each id additionally gets a decision hint line: positive
    /// for decision variables, negative for everything else.
    pub fn fresh(&mut self, label: &str, n: usize, decision: bool) -> Vec<Lit> {
        let first = self.nr_variables + 1;
        self.nr_variables += n as Lit;
        let ids: Vec<Lit> = (first..first + n as Lit).collect();

        self.comment(&format!("var {}/{} {}", first, n, label));

        if self.opts.restrict_branching {
            for &x in &ids {
                if decision {
                    self.cnf_buf.push_str(&format!("d {} 0\n", x));
                } else {
                    self.cnf_buf.push_str(&format!("d -{} 0\n", x));
                }
            }
        }
        ids
    }

    pub fn fresh_word(&mut self, label: &str, decision: bool) -> Word {
        let ids = self.fresh(label, WORD_BITS, decision);
        let mut word = [0; WORD_BITS];
        word.copy_from_slice(&ids);
        word
    }

    /// Total number of variables allocated so far.
    pub fn count(&self) -> Lit {
        self.nr_variables
    }

    pub fn comment(&mut self, s: &str) {
        self.cnf_buf.push_str(&format!("c {}\n", s));
        self.opb_buf.push_str(&format!("* {}\n", s));
    }

    /// A disjunction, emitted to both sinks.
    pub fn clause(&mut self, lits: &[Lit]) {
        self.write_cnf_clause(lits);
        self.write_opb_clause(lits);
    }

    /// A disjunction for the CNF sink only (minimized half-adder products;
    /// the OPB sink receives the exact linear form instead).
    pub fn cnf_clause(&mut self, lits: &[Lit]) {
        self.write_cnf_clause(lits);
    }

    /// A disjunction for the OPB sink only (mirrors of native XOR lines).
    pub fn opb_clause(&mut self, lits: &[Lit]) {
        self.write_opb_clause(lits);
    }

    pub fn xor_clause(&mut self, lits: &[Lit]) {
        self.cnf_buf.push_str("x ");
        for &l in lits {
            self.cnf_buf.push_str(&format!("{} ", l));
        }
        self.cnf_buf.push_str("0\n");
        self.nr_xor_clauses += 1;
    }

    /// A native half-adder line: `h <lhs> 0 <rhs> 0`. Not counted in
    /// `nr_clauses`; solvers that do not understand it must not see it.
    pub fn halfadder_line(&mut self, lhs: &[Lit], rhs: &[Lit]) {
        self.cnf_buf.push_str("h ");
        for &x in lhs {
            self.cnf_buf.push_str(&format!("{} ", x));
        }
        self.cnf_buf.push_str("0 ");
        for &x in rhs {
            self.cnf_buf.push_str(&format!("{} ", x));
        }
        self.cnf_buf.push_str("0\n");
    }

    /// Pin a single variable.
    pub fn constant(&mut self, r: Lit, value: bool) {
        self.cnf_buf
            .push_str(&format!("{}{} 0\n", if value { "" } else { "-" }, r));
        self.opb_buf
            .push_str(&format!("1 x{} = {};\n", r, u32::from(value)));
        self.nr_clauses += 1;
        self.nr_constraints += 1;
    }

    /// A fully formed OPB equality or inequality line.
    pub(crate) fn push_opb_equation(&mut self, line: String) {
        self.opb_buf.push_str(&line);
        self.nr_constraints += 1;
    }

    /// Product terms of the minimized half-adder cover for `n` addends and
    /// `m` output bits, resolved through the cache.
    pub(crate) fn halfadder_terms(&mut self, n: usize, m: usize) -> Result<Rc<Vec<Vec<Lit>>>> {
        if let Some(terms) = self.halfadder_cache.get(&(n, m)) {
            return Ok(terms.clone());
        }
        let terms = Rc::new(self.minimizer.minimize(n, m)?);
        self.halfadder_cache.insert((n, m), terms.clone());
        Ok(terms)
    }

    fn write_cnf_clause(&mut self, lits: &[Lit]) {
        for &l in lits {
            self.cnf_buf.push_str(&format!("{} ", l));
        }
        self.cnf_buf.push_str("0\n");
        self.nr_clauses += 1;
    }

    fn write_opb_clause(&mut self, lits: &[Lit]) {
        for &l in lits {
            if l < 0 {
                self.opb_buf.push_str(&format!("1 ~x{} ", -l));
            } else {
                self.opb_buf.push_str(&format!("1 x{} ", l));
            }
        }
        self.opb_buf.push_str(">= 1;\n");
        self.nr_constraints += 1;
    }

    pub fn nr_clauses(&self) -> usize {
        self.nr_clauses
    }

    pub fn nr_xor_clauses(&self) -> usize {
        self.nr_xor_clauses
    }

    pub fn nr_constraints(&self) -> usize {
        self.nr_constraints
    }

    /// CNF buffer without its header, for inspection.
    pub fn cnf(&self) -> &str {
        &self.cnf_buf
    }

    /// OPB buffer without its header, for inspection.
    pub fn opb(&self) -> &str {
        &self.opb_buf
    }

    pub fn cnf_output(&self) -> String {
        format!(
            "p cnf {} {}\n{}",
            self.nr_variables, self.nr_clauses, self.cnf_buf
        )
    }

    pub fn opb_output(&self) -> String {
        format!(
            "* #variable= {} #constraint= {}\n{}",
            self.nr_variables, self.nr_constraints, self.opb_buf
        )
    }
}
