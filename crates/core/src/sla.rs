use chrono::{DateTime, Duration, Utc};

/// Wall-clock seam. The orchestrator's level-advance logic takes a `Clock`
/// so due-date propagation is testable at fixed instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Due date for an SLA window: `from + hours`. Recomputed every time the
/// chain advances to a new level.
pub fn due_date(sla_hours: i64, from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::hours(sla_hours)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::{due_date, Clock, FixedClock};

    fn instant(raw: &str) -> DateTime<Utc> {
        raw.parse().expect("valid rfc3339 instant")
    }

    #[test]
    fn due_date_is_plain_hour_arithmetic() {
        let from = instant("2026-03-10T08:30:00Z");
        assert_eq!(due_date(48, from), instant("2026-03-12T08:30:00Z"));
        assert_eq!(due_date(0, from), from);
    }

    #[test]
    fn fixed_clock_reports_its_instant() {
        let clock = FixedClock(instant("2026-03-10T08:30:00Z"));
        assert_eq!(clock.now(), instant("2026-03-10T08:30:00Z"));
    }
}
