use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::Cadence;

/// Parsed cron cadence wrapping a `cron::Schedule`.
pub struct CronCadence {
    schedule: Schedule,
}

impl CronCadence {
    pub fn parse(expr: &str) -> TasklineResult<Self> {
        let schedule = Schedule::from_str(expr).map_err(|e| TasklineError::InvalidCron {
            expr: expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { schedule })
    }

    /// First fire instant strictly after `after`, if the schedule ever fires
    /// again.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Whether a fire instant falls in the half-open window `(last, now]`.
    pub fn is_due(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.next_fire(last).is_some_and(|fire| fire <= now)
    }
}

/// Decide whether a cadence is due at `now`, given when it last fired.
///
/// An interval cadence that never fired is due immediately. A cron cadence
/// that never fired uses `now` minus one minute as its baseline, so it
/// catches a fire instant that just passed without replaying old history.
pub fn cadence_due(
    cadence: &Cadence,
    last_fire: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TasklineResult<bool> {
    match cadence {
        Cadence::Interval(interval) => Ok(match last_fire {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map_or(false, |elapsed| elapsed >= *interval),
        }),
        Cadence::Cron(expr) => {
            let cron = CronCadence::parse(expr)?;
            let baseline = last_fire.unwrap_or(now - Duration::minutes(1));
            Ok(cron.is_due(baseline, now))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn invalid_expression_is_rejected() {
        let result = CronCadence::parse("not a cron line");
        assert!(matches!(result, Err(TasklineError::InvalidCron { .. })));
    }

    #[test]
    fn cron_fires_when_instant_falls_in_window() {
        // Daily at noon.
        let cadence = CronCadence::parse("0 0 12 * * *").unwrap();
        assert!(cadence.is_due(at(11, 0), at(12, 0)));
        assert!(!cadence.is_due(at(11, 0), at(11, 30)));
        // Already fired today.
        assert!(!cadence.is_due(at(12, 0), at(13, 0)));
    }

    #[test]
    fn next_fire_is_strictly_after_baseline() {
        let cadence = CronCadence::parse("0 0 12 * * *").unwrap();
        let next = cadence.next_fire(at(12, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap());
    }

    #[test]
    fn interval_without_history_is_due_immediately() {
        let cadence = Cadence::every(std::time::Duration::from_secs(60));
        assert!(cadence_due(&cadence, None, at(9, 0)).unwrap());
    }

    #[test]
    fn interval_waits_for_elapsed_time() {
        let cadence = Cadence::every(std::time::Duration::from_secs(600));
        assert!(!cadence_due(&cadence, Some(at(9, 0)), at(9, 5)).unwrap());
        assert!(cadence_due(&cadence, Some(at(9, 0)), at(9, 10)).unwrap());
        // A clock that went backwards is not due.
        assert!(!cadence_due(&cadence, Some(at(9, 5)), at(9, 0)).unwrap());
    }

    #[test]
    fn cron_without_history_uses_recent_baseline() {
        let cadence = Cadence::cron("0 0 * * * *");
        // On the hour: a fire instant within the last minute counts.
        assert!(cadence_due(&cadence, None, at(12, 0)).unwrap());
        assert!(!cadence_due(&cadence, None, at(12, 30)).unwrap());
    }
}
