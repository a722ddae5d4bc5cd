use anyhow::Result;

use super::formula::{AdderKind, Encoder, Lit, Word, WORD_BITS};

impl Encoder {
    /// `r = a + b (mod 2^32)` under the configured adder strategy.
    pub fn add2(&mut self, label: &str, r: &Word, a: &Word, b: &Word) -> Result<()> {
        self.comment("add2");
        match self.opts.adders {
            AdderKind::Tseitin => {
                let c = self.fresh("carry", 31, false);
                let t0 = self.fresh("t0", 31, false);
                let t1 = self.fresh("t1", 31, false);
                let t2 = self.fresh("t2", 31, false);

                self.and2(&c[..1], &a[..1], &b[..1]);
                self.xor2(&r[..1], &a[..1], &b[..1]);

                self.xor2(&t0, &a[1..], &b[1..]);
                self.and2(&t1, &a[1..], &b[1..]);
                self.and2(&t2, &t0, &c);
                self.or2(&c[1..], &t1[..30], &t2[..30]);
                self.xor2(&r[1..], &t0, &c);
                Ok(())
            }
            AdderKind::Compact => {
                self.compact_sum(&[a, b], r);
                Ok(())
            }
            AdderKind::HalfAdder => self.column_sum(label, r, &[a, b]),
        }
    }

    /// `r = a + b + c + d + e (mod 2^32)` under the configured strategy.
    /// The Tseitin form chains four 2-input adders.
    pub fn add5(
        &mut self,
        label: &str,
        r: &Word,
        a: &Word,
        b: &Word,
        c: &Word,
        d: &Word,
        e: &Word,
    ) -> Result<()> {
        self.comment("add5");
        match self.opts.adders {
            AdderKind::Tseitin => {
                let t0 = self.fresh_word("t0", false);
                let t1 = self.fresh_word("t1", false);
                let t2 = self.fresh_word("t2", false);

                self.add2(label, &t0, a, b)?;
                self.add2(label, &t1, c, d)?;
                self.add2(label, &t2, &t0, &t1)?;
                self.add2(label, r, &t2, e)
            }
            AdderKind::Compact => {
                self.compact_sum(&[a, b, c, d, e], r);
                Ok(())
            }
            AdderKind::HalfAdder => self.column_sum(label, r, &[a, b, c, d, e]),
        }
    }

    /// Column-wise half-adder decomposition: each bit column sums its input
    /// bits plus the carries routed in from lower columns, producing the
    /// result bit and fresh carry bits for the columns above. Carries routed
    /// past bit 31 are constrained but dropped, giving the mod-2^32 wrap.
    fn column_sum(&mut self, label: &str, r: &Word, inputs: &[&Word]) -> Result<()> {
        let mut addends: Vec<Vec<Lit>> = vec![Vec::new(); WORD_BITS + 5];
        for i in 0..WORD_BITS {
            for w in inputs {
                addends[i].push(w[i]);
            }

            let m = addends[i].len().ilog2() as usize;
            let mut rhs = Vec::with_capacity(1 + m);
            rhs.push(r[i]);
            rhs.extend(self.fresh(&format!("{}_rhs[{}]", label, i), m, false));
            for j in 1..=m {
                addends[i + j].push(rhs[j]);
            }

            let lhs = addends[i].clone();
            self.halfadder(&lhs, &rhs)?;
        }
        Ok(())
    }

    /// The half-adder (unary-to-binary) constraint: the number of true bits
    /// in `lhs` equals the binary value of `rhs`, lsb first.
    ///
    /// The CNF form is the minimized cover for the `(|lhs|, |rhs|)` arity
    /// pair; term literal `j < n` maps to `lhs[j]`, the remainder to `rhs`
    /// msb first. With native half-adder clauses enabled the constraint is
    /// handed to the solver verbatim instead. The OPB sink always receives
    /// the exact linear form.
    pub fn halfadder(&mut self, lhs: &[Lit], rhs: &[Lit]) -> Result<()> {
        if self.opts.native_halfadders {
            self.halfadder_line(lhs, rhs);
        } else {
            let n = lhs.len();
            let m = rhs.len();
            let terms = self.halfadder_terms(n, m)?;
            for term in terms.iter() {
                let mut cl = Vec::with_capacity(term.len());
                for &t in term {
                    let j = t.unsigned_abs() as usize - 1;
                    let var = if j < n { lhs[j] } else { rhs[m - 1 - (j - n)] };
                    cl.push(if t < 0 { -var } else { var });
                }
                self.cnf_clause(&cl);
            }
        }

        let mut line = String::new();
        for &x in lhs {
            line.push_str(&format!("1 x{} ", x));
        }
        for (i, &x) in rhs.iter().enumerate() {
            line.push_str(&format!("-{} x{} ", 1u64 << i, x));
        }
        line.push_str("= 0;\n");
        self.push_opb_equation(line);
        Ok(())
    }

    /// One linear equation per adder, coefficients up to 2^31. The missing
    /// carry-out term makes the equality hold modulo 2^32.
    fn compact_sum(&mut self, inputs: &[&Word], r: &Word) {
        let mut line = String::new();
        for w in inputs {
            for (i, &x) in w.iter().enumerate() {
                line.push_str(&format!("{} x{} ", 1i64 << i, x));
            }
        }
        for (i, &x) in r.iter().enumerate() {
            line.push_str(&format!("-{} x{} ", 1u64 << i, x));
        }
        line.push_str("= 0;\n");
        self.push_opb_equation(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::formula::EncodeOpts;
    use crate::encoder::testutil::{clauses, satisfied};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::collections::HashMap;

    fn enc(adders: AdderKind) -> Encoder {
        Encoder::new(EncodeOpts { adders, ..EncodeOpts::default() })
    }

    fn word_assignment(assign: &mut HashMap<i32, bool>, word: &Word, value: u32) {
        for (i, &var) in word.iter().enumerate() {
            assign.insert(var, (value >> i) & 1 == 1);
        }
    }

    #[test]
    fn halfadder_admits_exactly_the_popcount_rows() {
        for (n, m) in [(2usize, 2usize), (3, 2), (5, 3), (6, 3), (7, 3)] {
            let mut e = enc(AdderKind::HalfAdder);
            let lhs = e.fresh("lhs", n, false);
            let rhs = e.fresh("rhs", m, false);
            e.halfadder(&lhs, &rhs).unwrap();
            let cls = clauses(e.cnf());

            for v in 0..1u32 << (n + m) {
                let mut assign = HashMap::new();
                for (i, &var) in lhs.iter().chain(rhs.iter()).enumerate() {
                    assign.insert(var, (v >> i) & 1 == 1);
                }
                let count = (0..n).filter(|&i| (v >> i) & 1 == 1).count() as u32;
                let value: u32 = (0..m).map(|i| ((v >> (n + i)) & 1) << i).sum();
                assert_eq!(
                    satisfied(&cls, &assign),
                    count == value,
                    "shape ({}, {}) v={:#b}",
                    n,
                    m,
                    v
                );
            }
        }
    }

    #[test]
    fn halfadder_emits_the_linear_opb_form() {
        let mut e = enc(AdderKind::HalfAdder);
        let lhs = e.fresh("lhs", 2, false);
        let rhs = e.fresh("rhs", 2, false);
        e.halfadder(&lhs, &rhs).unwrap();
        assert!(e.opb().contains("1 x1 1 x2 -1 x3 -2 x4 = 0;\n"));
        assert_eq!(e.nr_constraints(), 1);
    }

    #[test]
    fn native_halfadder_lines_skip_minimization() {
        let opts = EncodeOpts {
            native_halfadders: true,
            ..EncodeOpts::default()
        };
        let mut e = Encoder::new(opts);
        let lhs = e.fresh("lhs", 2, false);
        let rhs = e.fresh("rhs", 2, false);
        e.halfadder(&lhs, &rhs).unwrap();
        assert!(e.cnf().contains("h 1 2 0 3 4 0\n"));
        assert_eq!(e.nr_clauses(), 0);
        assert_eq!(e.nr_constraints(), 1);
    }

    #[test]
    fn halfadder_add2_is_addition_mod_2_32() {
        let mut e = enc(AdderKind::HalfAdder);
        let r = e.fresh_word("r", false);
        let a = e.fresh_word("a", false);
        let b = e.fresh_word("b", false);
        let base = e.count();
        e.add2("sum", &r, &a, &b).unwrap();
        // One fresh carry per column.
        assert_eq!(e.count(), base + 32);
        let cls = clauses(e.cnf());

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..16 {
            let av = rng.next_u32();
            let bv = rng.next_u32();
            let sum = av.wrapping_add(bv);

            let mut assign = HashMap::new();
            word_assignment(&mut assign, &a, av);
            word_assignment(&mut assign, &b, bv);
            word_assignment(&mut assign, &r, sum);
            let mut carry = 0u32;
            for i in 0..32 {
                let total = ((av >> i) & 1) + ((bv >> i) & 1) + carry;
                carry = total >> 1;
                assign.insert(base + 1 + i as i32, carry == 1);
            }
            assert!(satisfied(&cls, &assign));

            let flip = (rng.next_u32() % 32) as usize;
            let mut bad = assign.clone();
            bad.insert(r[flip], (sum >> flip) & 1 == 0);
            assert!(!satisfied(&cls, &bad));
        }
    }

    #[test]
    fn halfadder_add5_is_five_way_addition_mod_2_32() {
        let mut e = enc(AdderKind::HalfAdder);
        let r = e.fresh_word("r", false);
        let inputs: Vec<Word> = (0..5).map(|i| e.fresh_word(&format!("in{}", i), false)).collect();
        let base = e.count();
        e.add5("sum", &r, &inputs[0], &inputs[1], &inputs[2], &inputs[3], &inputs[4])
            .unwrap();
        // Two fresh carries per column.
        assert_eq!(e.count(), base + 64);
        let cls = clauses(e.cnf());

        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..8 {
            let values: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
            let sum = values.iter().fold(0u32, |acc, &v| acc.wrapping_add(v));

            let mut assign = HashMap::new();
            for (word, &value) in inputs.iter().zip(&values) {
                word_assignment(&mut assign, word, value);
            }
            word_assignment(&mut assign, &r, sum);

            let mut routed: Vec<Vec<u32>> = vec![Vec::new(); 37];
            for i in 0..32 {
                let mut total: u32 = values.iter().map(|&v| (v >> i) & 1).sum();
                total += routed[i].iter().sum::<u32>();
                assert_eq!(total & 1, (sum >> i) & 1);
                routed[i + 1].push((total >> 1) & 1);
                routed[i + 2].push((total >> 2) & 1);
                assign.insert(base + 1 + 2 * i as i32, (total >> 1) & 1 == 1);
                assign.insert(base + 2 + 2 * i as i32, (total >> 2) & 1 == 1);
            }
            assert!(satisfied(&cls, &assign));

            let flip = (rng.next_u32() % 32) as usize;
            let mut bad = assign.clone();
            bad.insert(r[flip], (sum >> flip) & 1 == 0);
            assert!(!satisfied(&cls, &bad));
        }
    }

    #[test]
    fn tseitin_add2_is_addition_mod_2_32() {
        let mut e = enc(AdderKind::Tseitin);
        let r = e.fresh_word("r", false);
        let a = e.fresh_word("a", false);
        let b = e.fresh_word("b", false);
        let base = e.count();
        e.add2("sum", &r, &a, &b).unwrap();
        // carry, t0, t1, t2: 31 bits each, allocated in that order.
        assert_eq!(e.count(), base + 124);
        let cls = clauses(e.cnf());

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..16 {
            let av = rng.next_u32();
            let bv = rng.next_u32();
            let sum = av.wrapping_add(bv);

            let mut assign = HashMap::new();
            word_assignment(&mut assign, &a, av);
            word_assignment(&mut assign, &b, bv);
            word_assignment(&mut assign, &r, sum);

            let bit = |v: u32, i: usize| (v >> i) & 1 == 1;
            let mut c = [false; 31];
            let mut t0 = [false; 31];
            let mut t1 = [false; 31];
            let mut t2 = [false; 31];
            c[0] = bit(av, 0) && bit(bv, 0);
            for i in 0..31 {
                t0[i] = bit(av, i + 1) ^ bit(bv, i + 1);
                t1[i] = bit(av, i + 1) && bit(bv, i + 1);
            }
            for i in 0..30 {
                t2[i] = t0[i] && c[i];
                c[i + 1] = t1[i] || t2[i];
            }
            t2[30] = t0[30] && c[30];

            for i in 0..31 {
                assign.insert(base + 1 + i as i32, c[i]);
                assign.insert(base + 32 + i as i32, t0[i]);
                assign.insert(base + 63 + i as i32, t1[i]);
                assign.insert(base + 94 + i as i32, t2[i]);
            }
            assert!(satisfied(&cls, &assign));

            let flip = (rng.next_u32() % 32) as usize;
            let mut bad = assign.clone();
            bad.insert(r[flip], (sum >> flip) & 1 == 0);
            assert!(!satisfied(&cls, &bad));
        }
    }

    #[test]
    fn compact_adders_write_one_equation() {
        let mut e = enc(AdderKind::Compact);
        let r = e.fresh_word("r", false);
        let a = e.fresh_word("a", false);
        let b = e.fresh_word("b", false);
        e.add2("sum", &r, &a, &b).unwrap();
        assert_eq!(e.nr_constraints(), 1);
        assert_eq!(e.nr_clauses(), 0);
        let line = e.opb().lines().last().unwrap();
        assert!(line.starts_with("1 x33 2 x34 4 x35"));
        assert!(line.contains("2147483648 x64"));
        assert!(line.contains("-2147483648 x32"));
        assert!(line.ends_with("= 0;"));
    }

    #[test]
    fn add5_compact_sums_all_five_inputs() {
        let mut e = enc(AdderKind::Compact);
        let r = e.fresh_word("r", false);
        let ws: Vec<Word> = (0..5).map(|i| e.fresh_word(&format!("in{}", i), false)).collect();
        e.add5("sum", &r, &ws[0], &ws[1], &ws[2], &ws[3], &ws[4]).unwrap();
        assert_eq!(e.nr_constraints(), 1);
        let line = e.opb().lines().last().unwrap();
        // 5 * 32 positive terms plus 32 negated result terms.
        assert_eq!(line.matches(" x").count(), 192);
    }
}
