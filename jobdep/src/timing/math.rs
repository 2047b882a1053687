/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD and checked LCM over tick counts.
//!
//! Free functions so they can be tested without building a task set.

use super::HyperperiodError;

/// Greatest common divisor of two tick counts.  `gcd(0, n) == n`.
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut hi, mut lo) = (a.max(b), a.min(b));
    while lo > 0 {
        (hi, lo) = (lo, hi % lo);
    }
    hi
}

/// Least common multiple of two periods.
///
/// `Ok(0)` when either input is `0`.  Dividing by the GCD before the checked
/// multiplication keeps every intermediate value at or below the result, so
/// `Overflow { a, b }` means the LCM itself does not fit in `u64`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    match (a, b) {
        (0, _) | (_, 0) => Ok(0),
        _ => (a / gcd(a, b))
            .checked_mul(b)
            .ok_or(HyperperiodError::Overflow { a, b }),
    }
}

/// Reduce a slice of periods to their overall LCM.
///
/// An empty slice has no hyperperiod and is rejected with
/// [`HyperperiodError::EmptyTaskSet`] rather than folded to `0` or `1`.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    let (&first, rest) = periods
        .split_first()
        .ok_or(HyperperiodError::EmptyTaskSet)?;
    rest.iter().try_fold(first, |acc, &p| lcm(acc, p))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
