//! Busy-wait primitive.
//!
//! Every wait on the eQADC is "read a status register until a predicate holds".
//! [`poll_until`] is that loop, with the stop condition pulled out into a
//! [`PollBound`] so a host build can bound a wait that firmware leaves open.

use embassy_time::{Duration, Instant};

/// How long a busy-wait may spin before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollBound {
    /// Never give up. A wedged peripheral hangs the caller.
    #[default]
    Forever,
    /// Give up after this many status reads (at least one read is made).
    Attempts(u32),
    /// Give up once this much time has passed since the first read.
    Within(Duration),
}

/// A bounded busy-wait gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("condition not met after {attempts} status reads")]
pub struct PollTimeout {
    /// Status reads made before giving up.
    pub attempts: u32,
}

/// Take status snapshots until `done` accepts one, and return that snapshot.
///
/// `snapshot` is called once per iteration; the predicate never sees a stale
/// value. Under [`PollBound::Forever`] this only returns `Ok`.
pub fn poll_until<S>(
    bound: PollBound,
    mut snapshot: impl FnMut() -> S,
    mut done: impl FnMut(&S) -> bool,
) -> Result<S, PollTimeout> {
    // Only read the clock when a deadline is in play.
    let started = matches!(bound, PollBound::Within(_)).then(Instant::now);
    let mut attempts: u32 = 0;
    loop {
        let status = snapshot();
        attempts = attempts.saturating_add(1);
        if done(&status) {
            return Ok(status);
        }
        let expired = match bound {
            PollBound::Forever => false,
            PollBound::Attempts(max) => attempts >= max,
            PollBound::Within(limit) => started.is_some_and(|t| t.elapsed() >= limit),
        };
        if expired {
            #[cfg(feature = "defmt")]
            defmt::warn!("poll bound exhausted after {=u32} reads", attempts);
            #[cfg(feature = "tracing")]
            tracing::warn!(attempts, "poll bound exhausted");
            return Err(PollTimeout { attempts });
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn returns_first_snapshot_that_satisfies_predicate() {
        let mut n = 0u32;
        let got = poll_until(
            PollBound::Forever,
            || {
                n += 1;
                n
            },
            |&v| v == 5,
        );
        assert_eq!(got, Ok(5));
    }

    #[test]
    fn attempts_bound_counts_status_reads() {
        let mut reads = 0u32;
        let got = poll_until(
            PollBound::Attempts(3),
            || {
                reads += 1;
            },
            |()| false,
        );
        assert_eq!(got, Err(PollTimeout { attempts: 3 }));
        assert_eq!(reads, 3);
    }

    #[test]
    fn attempts_bound_of_zero_still_reads_once() {
        let got = poll_until(PollBound::Attempts(0), || 1u8, |&v| v == 1);
        assert_eq!(got, Ok(1));
        let got = poll_until(PollBound::Attempts(0), || 1u8, |&v| v == 2);
        assert_eq!(got, Err(PollTimeout { attempts: 1 }));
    }

    #[test]
    fn deadline_bound_gives_up() {
        let got = poll_until(
            PollBound::Within(Duration::from_millis(5)),
            || (),
            |()| false,
        );
        let err = got.unwrap_err();
        assert!(err.attempts >= 1);
    }

    #[test]
    fn deadline_bound_succeeds_when_condition_is_met() {
        let mut n = 0u8;
        let got = poll_until(
            PollBound::Within(Duration::from_secs(5)),
            || {
                n += 1;
                n
            },
            |&v| v >= 3,
        );
        assert_eq!(got, Ok(3));
    }

    #[test]
    fn default_bound_is_forever() {
        assert_eq!(PollBound::default(), PollBound::Forever);
    }
}
