use time::{Duration, OffsetDateTime};

/// Absolute cut-off for an attempt. Remaining time is always recomputed from
/// this, never decremented, so missed ticks cannot accumulate drift.
pub fn deadline(started_at: OffsetDateTime, duration_minutes: i64) -> OffsetDateTime {
    started_at + Duration::minutes(duration_minutes)
}

pub fn remaining_seconds(
    started_at: OffsetDateTime,
    duration_minutes: i64,
    now: OffsetDateTime,
) -> i64 {
    let remaining = deadline(started_at, duration_minutes) - now;
    remaining.whole_seconds().max(0)
}

/// Manual submits are still accepted shortly after the deadline to absorb
/// network jitter at expiry.
pub fn within_submit_grace(
    started_at: OffsetDateTime,
    duration_minutes: i64,
    grace_seconds: i64,
    now: OffsetDateTime,
) -> bool {
    now <= deadline(started_at, duration_minutes) + Duration::seconds(grace_seconds)
}
