use anyhow::Result;

use super::formula::{Encoder, Word, WORD_BITS};
use super::gates::rotl;

/// Initial chaining values.
pub const H_INIT: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// Round constants, one per group of twenty rounds.
pub const K: [u32; 4] = [0x5A827999, 0x6ED9EBA1, 0x8F1BBCDC, 0xCA62C1D6];

/// The SHA-1 compression function as a constraint circuit over `nr_rounds`
/// rounds. Two circuits built with different `name`s share no variables.
pub struct Sha1Circuit {
    /// Message schedule; `w[0..16]` are the free input words.
    pub w: Vec<Word>,
    pub h_in: [Word; 5],
    pub h_out: [Word; 5],
    /// Working-variable history, `a[i+5]` produced by round `i`. The last
    /// three initial entries are stored pre-rotated by 30 so the per-round
    /// rotations stay free rewirings.
    pub a: Vec<Word>,
}

impl Sha1Circuit {
    pub fn build(enc: &mut Encoder, nr_rounds: usize, name: &str) -> Result<Self> {
        enc.comment("sha1");
        enc.comment(&format!("parameter nr_rounds = {}", nr_rounds));

        let mut w: Vec<Word> = Vec::with_capacity(nr_rounds);
        for i in 0..16 {
            w.push(enc.fresh_word(&format!("w{}[{}]", name, i), true));
        }
        let mut wt: Vec<Word> = Vec::with_capacity(nr_rounds.saturating_sub(16));
        for i in 16..nr_rounds {
            wt.push(enc.fresh_word(&format!("w{}[{}]", name, i), false));
        }

        let h_in = [
            enc.fresh_word(&format!("h{}_in0", name), false),
            enc.fresh_word(&format!("h{}_in1", name), false),
            enc.fresh_word(&format!("h{}_in2", name), false),
            enc.fresh_word(&format!("h{}_in3", name), false),
            enc.fresh_word(&format!("h{}_in4", name), false),
        ];
        let h_out = [
            enc.fresh_word(&format!("h{}_out0", name), false),
            enc.fresh_word(&format!("h{}_out1", name), false),
            enc.fresh_word(&format!("h{}_out2", name), false),
            enc.fresh_word(&format!("h{}_out3", name), false),
            enc.fresh_word(&format!("h{}_out4", name), false),
        ];

        let mut a: Vec<Word> = vec![[0; WORD_BITS]; nr_rounds + 5];
        for i in 0..nr_rounds {
            a[i + 5] = enc.fresh_word(&format!("a[{}]", i + 5), false);
        }

        // Message expansion: each later schedule word is a rotate of a
        // four-way xor of earlier ones.
        for i in 16..nr_rounds {
            let t = wt[i - 16];
            enc.xor4(&t, &w[i - 3], &w[i - 8], &w[i - 14], &w[i - 16]);
            w.push(rotl(&t, 1));
        }

        let k = [
            enc.new_constant("k[0]", K[0]),
            enc.new_constant("k[1]", K[1]),
            enc.new_constant("k[2]", K[2]),
            enc.new_constant("k[3]", K[3]),
        ];

        for (word, &value) in h_in.iter().zip(H_INIT.iter()) {
            enc.constant32(word, value);
        }

        a[4] = rotl(&h_in[0], 32);
        a[3] = rotl(&h_in[1], 32);
        a[2] = rotl(&h_in[2], 2);
        a[1] = rotl(&h_in[3], 2);
        a[0] = rotl(&h_in[4], 2);

        for i in 0..nr_rounds {
            let prev_a = rotl(&a[i + 4], 5);
            let b = a[i + 3];
            let c = rotl(&a[i + 2], 30);
            let d = rotl(&a[i + 1], 30);
            let e = rotl(&a[i], 30);

            let f = enc.fresh_word(&format!("f[{}]", i), false);
            if i < 20 {
                enc.ch(&f, &b, &c, &d);
            } else if i < 40 {
                enc.xor3(&f, &b, &c, &d);
            } else if i < 60 {
                enc.maj(&f, &b, &c, &d);
            } else {
                enc.xor3(&f, &b, &c, &d);
            }

            let target = a[i + 5];
            enc.add5(
                &format!("a[{}]", i + 5),
                &target,
                &prev_a,
                &f,
                &e,
                &k[i / 20],
                &w[i],
            )?;
        }

        // Undo the baked-in rotations of the last three working words.
        let c = rotl(&a[nr_rounds + 2], 30);
        let d = rotl(&a[nr_rounds + 1], 30);
        let e = rotl(&a[nr_rounds], 30);

        enc.add2("h_out", &h_out[0], &h_in[0], &a[nr_rounds + 4])?;
        enc.add2("h_out", &h_out[1], &h_in[1], &a[nr_rounds + 3])?;
        enc.add2("h_out", &h_out[2], &h_in[2], &c)?;
        enc.add2("h_out", &h_out[3], &h_in[3], &d)?;
        enc.add2("h_out", &h_out[4], &h_in[4], &e)?;

        Ok(Self { w, h_in, h_out, a })
    }
}

/// Reference forward computation in native arithmetic, truncated to
/// `nr_rounds` rounds. Uses the same round functions the circuit encodes.
pub fn sha1_forward(nr_rounds: usize, message: &[u32; 16]) -> [u32; 5] {
    let mut w = [0u32; 80];
    w[..16].copy_from_slice(message);
    for i in 16..nr_rounds {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = H_INIT;
    for (i, &wi) in w.iter().enumerate().take(nr_rounds) {
        let (f, k) = if i < 20 {
            ((b & c) | (!b & d), K[0])
        } else if i < 40 {
            (b ^ c ^ d, K[1])
        } else if i < 60 {
            ((b & c) | (b & d) | (c & d), K[2])
        } else {
            (b ^ c ^ d, K[3])
        };

        let t = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(wi);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = t;
    }

    [
        H_INIT[0].wrapping_add(a),
        H_INIT[1].wrapping_add(b),
        H_INIT[2].wrapping_add(c),
        H_INIT[3].wrapping_add(d),
        H_INIT[4].wrapping_add(e),
    ]
}
