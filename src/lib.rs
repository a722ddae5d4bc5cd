//! Generator of SAT (DIMACS CNF) and pseudo-boolean (OPB) instances that
//! encode preimage, second-preimage and collision attacks on SHA-1.
//!
//! The encoder builds the SHA-1 compression function as a boolean circuit
//! over a configurable number of rounds, emits clause or linear-constraint
//! sets for every gate, and pins randomly selected message and hash bits so
//! that satisfying assignments of the instance correspond to solutions of
//! the chosen attack.

pub mod encoder;
