use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use tracing::debug;

use replyscout_common::file_config::{
    parse_time_of_day, parse_timezone, BehaviorConfig, DelayRange, ScheduleConfig,
};
use replyscout_common::ConfigError;

/// Daily time-of-day window, evaluated in an IANA timezone, during which the
/// pipeline may act. Also owns the randomized pacing rules.
///
/// An end of `00:00` means "until midnight". A start later than the end
/// describes a window that wraps past midnight.
#[derive(Debug, Clone)]
pub struct ActiveWindow {
    tz: Tz,
    start: NaiveTime,
    end: NaiveTime,
    break_after: u32,
    break_minutes: (u64, u64),
}

impl ActiveWindow {
    pub fn new(schedule: &ScheduleConfig, behavior: &BehaviorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            tz: parse_timezone(&schedule.timezone)?,
            start: parse_time_of_day("schedule.active_start", &schedule.active_start)?,
            end: parse_time_of_day("schedule.active_end", &schedule.active_end)?,
            break_after: behavior.break_after_replies,
            break_minutes: (behavior.break_min_minutes, behavior.break_max_minutes),
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn wraps_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Whether a local time of day falls inside the window.
    pub fn contains_time(&self, t: NaiveTime) -> bool {
        if self.wraps_midnight() {
            t >= self.start || t < self.end
        } else {
            t >= self.start && t < self.end
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        let active = self.contains_time(local.time());
        debug!(local = %local.format("%H:%M %Z"), active, "Active window check");
        active
    }

    /// Hour of day of `ts` in the configured timezone.
    pub fn local_hour(&self, ts: DateTime<Utc>) -> u32 {
        ts.with_timezone(&self.tz).hour()
    }

    fn window_length(&self) -> ChronoDuration {
        let span = self.end.signed_duration_since(self.start);
        if self.wraps_midnight() {
            span + ChronoDuration::days(1)
        } else {
            span
        }
    }

    /// Resolve a local wall-clock time to UTC. Times inside a DST gap move
    /// forward to the first valid instant.
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        if let Some(dt) = self.tz.from_local_datetime(&local).earliest() {
            return dt.with_timezone(&Utc);
        }
        let shifted = local + ChronoDuration::hours(1);
        match self.tz.from_local_datetime(&shifted).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        }
    }

    /// Current window if active, otherwise the next one, as UTC instants.
    pub fn next_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.with_timezone(&self.tz).date_naive();
        let length = self.window_length();

        let mut starts: Vec<DateTime<Utc>> = (-1..=2)
            .filter_map(|offset| today.checked_add_signed(ChronoDuration::days(offset)))
            .map(|date| self.to_utc(date.and_time(self.start)))
            .collect();
        starts.sort();

        if self.is_active(now) {
            if let Some(start) = starts.iter().rev().find(|s| **s <= now) {
                return (now, *start + length);
            }
        }

        let start = starts
            .into_iter()
            .find(|s| *s > now)
            .unwrap_or(now + ChronoDuration::days(1));
        (start, start + length)
    }

    /// Time until the window next opens. `None` while it is open.
    pub fn time_until_active(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_active(now) {
            return None;
        }
        let (start, _) = self.next_window(now);
        (start - now).to_std().ok()
    }

    /// Uniformly random pause within `range`.
    pub fn jittered_delay(range: DelayRange) -> Duration {
        let (lo, hi) = if range.min_ms <= range.max_ms {
            (range.min_ms, range.max_ms)
        } else {
            (range.max_ms, range.min_ms)
        };
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    /// True after every `break_after_replies`-th reply of a session.
    pub fn should_break(&self, replies_this_session: u32) -> bool {
        let k = self.break_after;
        k > 0 && replies_this_session >= k && replies_this_session % k == 0
    }

    pub fn break_duration(&self) -> Duration {
        let (lo, hi) = self.break_minutes;
        let minutes = rand::rng().random_range(lo.min(hi)..=hi.max(lo));
        Duration::from_secs(minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(tz: &str, start: &str, end: &str) -> ActiveWindow {
        let schedule = ScheduleConfig {
            timezone: tz.into(),
            active_start: start.into(),
            active_end: end.into(),
        };
        ActiveWindow::new(&schedule, &BehaviorConfig::default()).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn respects_timezone_and_dst() {
        let w = window("Europe/London", "07:00", "23:00");
        // Winter: London == UTC
        assert!(!w.is_active(utc("2026-01-15T06:30:00Z")));
        assert!(w.is_active(utc("2026-01-15T07:00:00Z")));
        // Summer: London == UTC+1, so 06:30Z is 07:30 local
        assert!(w.is_active(utc("2026-07-15T06:30:00Z")));
        assert!(!w.is_active(utc("2026-07-15T22:30:00Z")));
    }

    #[test]
    fn midnight_end_means_until_midnight() {
        let w = window("UTC", "07:00", "00:00");
        assert!(w.is_active(utc("2026-03-02T23:59:00Z")));
        assert!(!w.is_active(utc("2026-03-02T00:30:00Z")));
        assert!(!w.is_active(utc("2026-03-02T06:59:00Z")));
    }

    #[test]
    fn overnight_window_wraps() {
        let w = window("UTC", "22:00", "02:00");
        assert!(w.is_active(utc("2026-03-02T23:00:00Z")));
        assert!(w.is_active(utc("2026-03-02T01:59:00Z")));
        assert!(!w.is_active(utc("2026-03-02T12:00:00Z")));
    }

    #[test]
    fn time_until_active_points_at_next_start() {
        let w = window("UTC", "07:00", "23:00");
        assert_eq!(w.time_until_active(utc("2026-03-02T12:00:00Z")), None);
        assert_eq!(
            w.time_until_active(utc("2026-03-02T05:00:00Z")),
            Some(Duration::from_secs(2 * 3600))
        );
        // After close: tomorrow's start
        assert_eq!(
            w.time_until_active(utc("2026-03-02T23:30:00Z")),
            Some(Duration::from_secs(7 * 3600 + 30 * 60))
        );
    }

    #[test]
    fn next_window_bounds() {
        let w = window("UTC", "07:00", "23:00");
        let (start, end) = w.next_window(utc("2026-03-02T03:00:00Z"));
        assert_eq!(start, utc("2026-03-02T07:00:00Z"));
        assert_eq!(end, utc("2026-03-02T23:00:00Z"));

        let now = utc("2026-03-02T10:00:00Z");
        let (start, end) = w.next_window(now);
        assert_eq!(start, now);
        assert_eq!(end, utc("2026-03-02T23:00:00Z"));

        let overnight = window("UTC", "22:00", "02:00");
        let now = utc("2026-03-03T01:00:00Z");
        assert_eq!(overnight.next_window(now), (now, utc("2026-03-03T02:00:00Z")));
    }

    #[test]
    fn breaks_every_kth_reply() {
        let w = window("UTC", "07:00", "23:00");
        let breaks: Vec<u32> = (0..10).filter(|n| w.should_break(*n)).collect();
        assert_eq!(breaks, vec![3, 6, 9]);
    }

    #[test]
    fn break_and_jitter_stay_in_range() {
        let w = window("UTC", "07:00", "23:00");
        for _ in 0..50 {
            let d = w.break_duration();
            assert!(d >= Duration::from_secs(5 * 60) && d <= Duration::from_secs(10 * 60));
            let j = ActiveWindow::jittered_delay(DelayRange::new(100, 200));
            assert!(j >= Duration::from_millis(100) && j <= Duration::from_millis(200));
        }
        assert_eq!(ActiveWindow::jittered_delay(DelayRange::new(0, 0)), Duration::ZERO);
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        let schedule = ScheduleConfig {
            timezone: "Nowhere/City".into(),
            ..ScheduleConfig::default()
        };
        assert!(matches!(
            ActiveWindow::new(&schedule, &BehaviorConfig::default()),
            Err(ConfigError::Timezone(_))
        ));
    }
}
