//! Anchored wakeup arithmetic — pure, no I/O, no clock access.

use chrono::{DateTime, Duration, Utc};

use phrasedrop_core::error::{PhrasedropError, Result};

/// Immutable wakeup schedule: an anchor instant plus a fixed period.
///
/// Every future wakeup is derived from "now", never from the last fire, so a
/// restart after downtime lands back on the anchored grid instead of
/// drifting.
#[derive(Debug, Clone, Copy)]
pub struct WakeupSchedule {
    anchor: DateTime<Utc>,
    period: Duration,
}

impl WakeupSchedule {
    /// A non-positive period is a caller contract violation, rejected here
    /// so `next_wakeup` stays total.
    pub fn new(anchor: DateTime<Utc>, period: Duration) -> Result<Self> {
        if period <= Duration::zero() {
            return Err(PhrasedropError::Config(format!(
                "schedule period must be positive, got {period}"
            )));
        }
        Ok(Self { anchor, period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The first grid instant strictly after `now`. Always in
    /// `(now, now + period]`; `now == anchor` yields `anchor + period`.
    pub fn next_wakeup(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let period_ns = nanos(self.period);
        let elapsed_ns = nanos(now - self.anchor);
        let left_ns = period_ns - elapsed_ns.rem_euclid(period_ns);
        now + Duration::seconds((left_ns / 1_000_000_000) as i64)
            + Duration::nanoseconds((left_ns % 1_000_000_000) as i64)
    }
}

/// Whole-duration nanoseconds. Wide enough that sub-millisecond periods do
/// not truncate to zero and century-scale spans do not overflow.
fn nanos(duration: Duration) -> i128 {
    i128::from(duration.num_seconds()) * 1_000_000_000 + i128::from(duration.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_now_at_anchor_waits_a_full_period() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        let schedule = WakeupSchedule::new(anchor, Duration::days(1)).unwrap();
        assert_eq!(schedule.next_wakeup(anchor), anchor + Duration::days(1));
    }

    #[test]
    fn test_mid_period_wakeup() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        let schedule = WakeupSchedule::new(anchor, Duration::days(1)).unwrap();
        let now = anchor + Duration::hours(6);
        assert_eq!(schedule.next_wakeup(now), now + Duration::hours(18));
    }

    #[test]
    fn test_far_future_stays_on_the_anchored_grid() {
        let anchor = at(2024, 1, 1, 10, 11, 12);
        let schedule = WakeupSchedule::new(anchor, Duration::minutes(24)).unwrap();
        let now = at(2025, 12, 12, 4, 0, 0);
        assert_eq!(schedule.next_wakeup(now), at(2025, 12, 12, 4, 11, 12));
    }

    #[test]
    fn test_result_is_bounded_by_one_period() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        let schedule = WakeupSchedule::new(anchor, Duration::minutes(7)).unwrap();
        for offset_minutes in [0, 1, 6, 7, 8, 1000, 99999] {
            let now = anchor + Duration::minutes(offset_minutes);
            let next = schedule.next_wakeup(now);
            assert!(next > now);
            assert!(next - now <= Duration::minutes(7));
        }
    }

    #[test]
    fn test_anchor_in_the_future_is_fine() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        let schedule = WakeupSchedule::new(anchor, Duration::hours(24)).unwrap();
        let now = anchor - Duration::hours(1);
        assert_eq!(schedule.next_wakeup(now), anchor);
    }

    #[test]
    fn test_sub_millisecond_period_does_not_panic() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        let schedule = WakeupSchedule::new(anchor, Duration::microseconds(500)).unwrap();
        let now = anchor + Duration::microseconds(125);
        let next = schedule.next_wakeup(now);
        assert_eq!(next, now + Duration::microseconds(375));
        assert!(next > now);
        assert!(next - now <= Duration::microseconds(500));
    }

    #[test]
    fn test_non_positive_period_is_rejected() {
        let anchor = at(2024, 1, 1, 10, 0, 0);
        assert!(WakeupSchedule::new(anchor, Duration::zero()).is_err());
        assert!(WakeupSchedule::new(anchor, Duration::seconds(-5)).is_err());
    }
}
