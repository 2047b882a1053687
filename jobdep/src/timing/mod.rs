//! Time utilities: hyperperiod calculation and tick formatting.
//!
//! The hyperperiod of a set of periodic tasks is the Least Common Multiple
//! (LCM) of all their periods.  It is the smallest window after which the
//! release pattern of the whole task set repeats, and therefore the natural
//! horizon for job generation.
//!
//! All times in this crate are integer *ticks*.  The physical length of one
//! tick is the *time base*, expressed in microseconds; it only matters when a
//! value is rendered for humans ([`format_time`]).
//!
//! | Failure | Result |
//! |---------|--------|
//! | empty task set | `Err(EmptyTaskSet)` (never `0` or `1`) |
//! | a task with `period == 0` | `Err(ZeroPeriod)` |
//! | LCM does not fit in `u64` | `Err(Overflow)` |
//! | LCM above the configured limit | `Err(TooLarge)` – caller decides |
//! | fixed or capped horizon above the limit | `Err(HorizonTooLarge)` |

pub mod math;

use tracing::{debug, info, warn};

use crate::task::Task;
use math::lcm_of_slice;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on the hyperperiod, in ticks (1 h at 1 µs per tick).
pub const DEFAULT_HYPERPERIOD_LIMIT: u64 = 3_600_000_000;

/// Default upper limit on the number of jobs one analysis run may generate.
pub const DEFAULT_JOB_LIMIT: u64 = 10_000_000;

/// Default duration of one tick, in microseconds.
pub const DEFAULT_TIME_BASE_US: u64 = 1;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// No task was supplied, so there is no period to combine.
    EmptyTaskSet,

    /// A task declares a zero period.
    ZeroPeriod { task: String },

    /// LCM calculation overflowed `u64`.
    ///
    /// Carries the two operands that caused the overflow.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },

    /// A fixed or capped horizon exceeded the configured limit.
    HorizonTooLarge { horizon: u64, limit: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::EmptyTaskSet => {
                write!(f, "cannot compute a hyperperiod of an empty task set")
            }
            HyperperiodError::ZeroPeriod { task } => {
                write!(f, "task '{task}' has a zero period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => write!(
                f,
                "hyperperiod {value} ticks exceeds limit {limit} ticks"
            ),
            HyperperiodError::HorizonTooLarge { horizon, limit } => write!(
                f,
                "horizon {horizon} ticks exceeds limit {limit} ticks"
            ),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod of one task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    /// Hyperperiod in ticks (LCM of all unique task periods).
    pub hyperperiod: u64,

    /// Unique periods present in the task set (sorted, deduplicated).
    pub unique_periods: Vec<u64>,

    /// Number of tasks that contributed to this hyperperiod.
    pub task_count: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Least common multiple of the periods of `tasks`.
///
/// ```rust
/// use jobdep::task::Task;
/// use jobdep::timing::hyperperiod;
///
/// let tasks = vec![Task::new("a", 1, 10, 10), Task::new("b", 1, 15, 15)];
/// assert_eq!(hyperperiod(&tasks).unwrap(), 30);
/// ```
pub fn hyperperiod<'a, I>(tasks: I) -> Result<u64, HyperperiodError>
where
    I: IntoIterator<Item = &'a Task>,
{
    calculate_hyperperiod(tasks, u64::MAX).map(|info| info.hyperperiod)
}

/// Calculate the hyperperiod of `tasks` and reject values above `limit`.
///
/// # Errors
/// * [`HyperperiodError::EmptyTaskSet`] – `tasks` yielded nothing.
/// * [`HyperperiodError::ZeroPeriod`] – a task has `period == 0`.
/// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
/// * [`HyperperiodError::TooLarge`] – result exceeds `limit`.
pub fn calculate_hyperperiod<'a, I>(
    tasks: I,
    limit: u64,
) -> Result<HyperperiodInfo, HyperperiodError>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut periods = Vec::new();
    for task in tasks {
        if task.period == 0 {
            return Err(HyperperiodError::ZeroPeriod {
                task: task.name.clone(),
            });
        }
        periods.push(task.period);
    }
    let task_count = periods.len();

    periods.sort_unstable();
    periods.dedup();

    let hyperperiod = lcm_of_slice(&periods)?;

    if hyperperiod > limit {
        warn!(hyperperiod, limit, "Hyperperiod exceeds configured limit");
        return Err(HyperperiodError::TooLarge {
            value: hyperperiod,
            limit,
        });
    }

    info!(
        task_count,
        unique_count = periods.len(),
        hyperperiod,
        "Calculated hyperperiod"
    );
    for p in &periods {
        debug!(period = p, "  unique period");
    }

    Ok(HyperperiodInfo {
        hyperperiod,
        unique_periods: periods,
        task_count,
    })
}

/// Render a tick count as milliseconds, given the tick length in µs.
///
/// Diagnostic output only; the exact textual form is not a stable format.
pub fn format_time(value: u64, time_base_us: u64) -> String {
    let ms = value as f64 * time_base_us as f64 / 1_000.0;
    format!("{ms} ms")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn periodic(name: &str, period: u64) -> Task {
        Task::new(name, 1, period, period)
    }

    // ── hyperperiod ───────────────────────────────────────────────────────────

    #[test]
    fn hyperperiod_of_10_and_15_is_30() {
        let tasks = vec![periodic("a", 10), periodic("b", 15)];
        assert_eq!(hyperperiod(&tasks).unwrap(), 30);
    }

    #[test]
    fn hyperperiod_of_single_task_is_its_period() {
        let tasks = vec![periodic("a", 7)];
        assert_eq!(hyperperiod(&tasks).unwrap(), 7);
    }

    #[test]
    fn hyperperiod_of_empty_set_is_rejected() {
        let tasks: Vec<Task> = vec![];
        assert_eq!(hyperperiod(&tasks), Err(HyperperiodError::EmptyTaskSet));
    }

    #[test]
    fn hyperperiod_rejects_zero_period() {
        let tasks = vec![periodic("a", 10), periodic("broken", 0)];
        assert_eq!(
            hyperperiod(&tasks),
            Err(HyperperiodError::ZeroPeriod {
                task: "broken".into()
            })
        );
    }

    // ── calculate_hyperperiod ─────────────────────────────────────────────────

    #[test]
    fn unique_periods_are_sorted_and_deduped() {
        let tasks = vec![
            periodic("a", 25),
            periodic("b", 10),
            periodic("c", 25),
            periodic("d", 15),
        ];
        let info = calculate_hyperperiod(&tasks, DEFAULT_HYPERPERIOD_LIMIT).unwrap();
        assert_eq!(info.unique_periods, vec![10, 15, 25]);
        assert_eq!(info.task_count, 4);
        assert_eq!(info.hyperperiod, 150);
    }

    #[test]
    fn hyperperiod_above_limit_is_too_large() {
        let tasks = vec![periodic("a", 7), periodic("b", 11)];
        assert_eq!(
            calculate_hyperperiod(&tasks, 50),
            Err(HyperperiodError::TooLarge {
                value: 77,
                limit: 50
            })
        );
    }

    #[test]
    fn hyperperiod_at_exactly_the_limit_is_accepted() {
        let tasks = vec![periodic("a", 7), periodic("b", 11)];
        let info = calculate_hyperperiod(&tasks, 77).unwrap();
        assert_eq!(info.hyperperiod, 77);
    }

    // ── format_time ───────────────────────────────────────────────────────────

    #[test]
    fn format_time_converts_microsecond_ticks_to_ms() {
        assert_eq!(format_time(15, 1), "0.015 ms");
        assert_eq!(format_time(15_000, 1), "15 ms");
    }

    #[test]
    fn format_time_honours_time_base() {
        // 1 tick = 1 ms
        assert_eq!(format_time(20, 1_000), "20 ms");
        assert_eq!(format_time(0, 1_000), "0 ms");
    }
}
