//! Shared test utilities for the throughput-bench workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-process HTTP stand-in for the endpoint variants
//! - Deterministic number bodies
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{Behavior, NumberServer};
//!
//! let server = NumberServer::start([("blocking", Behavior::short_by(1))]).await?;
//! ```

pub mod numbers;
pub mod server;

// Re-export commonly used items at the crate root
pub use numbers::*;
pub use server::{Behavior, NumberServer};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that `value` lies within `[low, high]`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_in_range;
///
/// assert_in_range!(elapsed_ms, 100, 2_000);
/// ```
#[macro_export]
macro_rules! assert_in_range {
    ($value:expr, $low:expr, $high:expr) => {{
        let value = $value;
        let (low, high) = ($low, $high);
        if value < low || value > high {
            panic!(
                "assertion failed: `{:?}` not within [{:?}, {:?}]",
                value, low, high
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_in_range_passes() {
        assert_in_range!(150u64, 100u64, 200u64);
        assert_in_range!(100u64, 100u64, 100u64);
    }

    #[test]
    #[should_panic(expected = "not within")]
    fn test_assert_in_range_fails() {
        assert_in_range!(99u64, 100u64, 200u64);
    }
}
