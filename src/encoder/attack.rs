use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::warn;

use super::formula::Encoder;
use super::sha1::{sha1_forward, Sha1Circuit};
use super::Config;

/// The generator's two pseudo-random streams. Positions (the Fisher-Yates
/// shuffles) draw from the first; the reference message draws from the
/// second, which is seeded from a 32-bit draw of the first so a single
/// configured seed determines the whole instance.
pub struct Streams {
    pub positions: StdRng,
    pub message: StdRng,
}

impl Streams {
    pub fn from_seed(seed: u64) -> Self {
        let mut positions = StdRng::seed_from_u64(seed);
        let message = StdRng::seed_from_u64(u64::from(positions.next_u32()));
        Self { positions, message }
    }
}

fn reference_message(rng: &mut StdRng) -> [u32; 16] {
    let mut w = [0u32; 16];
    for x in w.iter_mut() {
        *x = rng.next_u32();
    }
    w
}

fn shuffled_positions(len: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..len).collect();
    positions.shuffle(rng);
    positions
}

fn pin_message_bit(enc: &mut Encoder, circuit: &Sha1Circuit, pos: usize, w: &[u32; 16], flip: bool) {
    let (r, s) = (pos / 32, pos % 32);
    let bit = (w[r] >> s) & 1 == 1;
    enc.constant(circuit.w[r][s], bit != flip);
}

fn pin_hash_bit(enc: &mut Encoder, circuit: &Sha1Circuit, pos: usize, h: &[u32; 5]) {
    let (r, s) = (pos / 32, pos % 32);
    enc.constant(circuit.h_out[r][s], (h[r] >> s) & 1 == 1);
}

/// Recover a message for a fixed hash: pin random message bits and random
/// hash bits of one circuit to a reference (message, hash) pair.
pub fn preimage(enc: &mut Encoder, config: &Config, streams: &mut Streams) -> Result<()> {
    let circuit = Sha1Circuit::build(enc, config.nr_rounds, "")?;

    let w = reference_message(&mut streams.message);
    let h = sha1_forward(config.nr_rounds, &w);

    enc.comment(&format!("Fix {} message bits", config.nr_message_bits));
    let message_bits = shuffled_positions(512, &mut streams.positions);
    for &pos in &message_bits[..config.nr_message_bits] {
        pin_message_bit(enc, &circuit, pos, &w, false);
    }

    enc.comment(&format!("Fix {} hash bits", config.nr_hash_bits));
    let hash_bits = shuffled_positions(160, &mut streams.positions);
    for &pos in &hash_bits[..config.nr_hash_bits] {
        pin_hash_bit(enc, &circuit, pos, &h);
    }

    Ok(())
}

/// Like a preimage, but the first selected message bit is pinned to the
/// complement of the reference so the solution differs from it.
pub fn second_preimage(enc: &mut Encoder, config: &Config, streams: &mut Streams) -> Result<()> {
    let circuit = Sha1Circuit::build(enc, config.nr_rounds, "")?;

    let w = reference_message(&mut streams.message);
    let h = sha1_forward(config.nr_rounds, &w);

    enc.comment(&format!("Fix {} message bits", config.nr_message_bits));
    let message_bits = shuffled_positions(512, &mut streams.positions);
    if config.nr_message_bits == 0 {
        warn!("second-preimage without fixed message bits does not force a distinct message");
    } else {
        pin_message_bit(enc, &circuit, message_bits[0], &w, true);
        for &pos in &message_bits[1..config.nr_message_bits] {
            pin_message_bit(enc, &circuit, pos, &w, false);
        }
    }

    enc.comment(&format!("Fix {} hash bits", config.nr_hash_bits));
    let hash_bits = shuffled_positions(160, &mut streams.positions);
    for &pos in &hash_bits[..config.nr_hash_bits] {
        pin_hash_bit(enc, &circuit, pos, &h);
    }

    Ok(())
}

/// Two messages, equal hashes: build two disjoint circuits, force one
/// message bit to differ and the selected hash bits to agree.
pub fn collision(enc: &mut Encoder, config: &Config, streams: &mut Streams) -> Result<()> {
    let first = Sha1Circuit::build(enc, config.nr_rounds, "0")?;
    let second = Sha1Circuit::build(enc, config.nr_rounds, "1")?;

    if config.nr_message_bits > 0 {
        warn!("collision attacks do not use fixed message bits");
    }

    enc.comment(&format!("Fix {} message bits", config.nr_message_bits));
    let message_bits = shuffled_positions(512, &mut streams.positions);
    {
        let (r, s) = (message_bits[0] / 32, message_bits[0] % 32);
        enc.neq(&[first.w[r][s]], &[second.w[r][s]]);
    }

    enc.comment(&format!("Fix {} hash bits", config.nr_hash_bits));
    let hash_bits = shuffled_positions(160, &mut streams.positions);
    for &pos in &hash_bits[..config.nr_hash_bits] {
        let (r, s) = (pos / 32, pos % 32);
        enc.eq(&[first.h_out[r][s]], &[second.h_out[r][s]]);
    }

    Ok(())
}
