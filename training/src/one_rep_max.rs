//! Blended one-rep-max estimation.
//!
//! Each single-formula estimate drifts in some rep range, so for 2..=15 reps
//! the estimate is the mean of three models:
//! - Epley, linear in reps: `w * (1 + r / 30)`
//! - Brzycki, reciprocal in reps: `w * 36 / (37 - r)`
//! - Lombardi, a rep coefficient: `w * r^0.10`
//!
//! Above 15 reps the formulas are not trusted and the estimate is the weight
//! itself.

/// Highest rep count the formulas are applied to.
pub const MAX_RELIABLE_REPS: u32 = 15;

pub fn epley(weight: f64, reps: u32) -> f64 {
    weight * (1.0 + f64::from(reps) / 30.0)
}

pub fn brzycki(weight: f64, reps: u32) -> f64 {
    weight * 36.0 / (37.0 - f64::from(reps))
}

pub fn lombardi(weight: f64, reps: u32) -> f64 {
    weight * f64::from(reps).powf(0.10)
}

/// Estimate the one-rep max for `weight` lifted `reps` times.
///
/// Returns `0.0` for zero reps or a weight that is not a positive number.
pub fn estimate_one_rep_max(weight: f64, reps: u32) -> f64 {
    if reps == 0 || !weight.is_finite() || weight <= 0.0 {
        return 0.0;
    }
    if reps == 1 || reps > MAX_RELIABLE_REPS {
        return weight;
    }
    (epley(weight, reps) + brzycki(weight, reps) + lombardi(weight, reps)) / 3.0
}
