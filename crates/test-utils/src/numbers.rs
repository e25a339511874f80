//! Deterministic number sequences for stand-in endpoints.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `count` pseudo-random integers seeded by `seed`, so equal requests get equal bodies.
pub fn seeded_numbers(seed: u64, count: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen::<i32>()).collect()
}

/// Render numbers one per line, each terminated by `\n`.
pub fn number_body(numbers: &[i32]) -> String {
    let mut body = String::with_capacity(numbers.len() * 12);
    for n in numbers {
        body.push_str(&n.to_string());
        body.push('\n');
    }
    body
}
