// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping between unix timestamps and the calendar dates metrics roll up to.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};

/// Assigns timestamps to calendar dates in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    /// Build a calendar for `offset_minutes` east of UTC.
    ///
    /// Offsets outside ±24h fall back to UTC; config validation rejects them earlier.
    pub fn new(offset_minutes: i32) -> Self {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(utc);
        Self { offset }
    }

    /// Calendar date containing the unix second `timestamp`.
    pub fn date_of(&self, timestamp: i64) -> NaiveDate {
        DateTime::<Utc>::from_timestamp(timestamp, 0)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .date_naive()
    }

    /// Today's date in this calendar.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// Unix second at which `date` starts.
    pub fn start_of(&self, date: NaiveDate) -> i64 {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        midnight.and_utc().timestamp() - i64::from(self.offset.local_minus_utc())
    }

    /// Half-open `[start, end)` unix range covering `from..=to`.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> (i64, i64) {
        let end = to.checked_add_days(Days::new(1)).unwrap_or(to);
        (self.start_of(from), self.start_of(end))
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self { offset: utc() }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-03-01T00:00:00Z
    const MARCH_1: i64 = 1_772_323_200;

    #[test]
    fn utc_midnight_boundaries() {
        let cal = Calendar::default();
        assert_eq!(cal.date_of(MARCH_1), date(2026, 3, 1));
        assert_eq!(cal.date_of(MARCH_1 - 1), date(2026, 2, 28));
        assert_eq!(cal.start_of(date(2026, 3, 1)), MARCH_1);
    }

    #[test]
    fn negative_offset_shifts_the_day() {
        // UTC-03:00: 02:00Z on March 1st is still February 28th locally.
        let cal = Calendar::new(-180);
        assert_eq!(cal.date_of(MARCH_1 + 2 * 3600), date(2026, 2, 28));
        assert_eq!(cal.date_of(MARCH_1 + 3 * 3600), date(2026, 3, 1));
        assert_eq!(cal.start_of(date(2026, 3, 1)), MARCH_1 + 3 * 3600);
    }

    #[test]
    fn range_covers_whole_days() {
        let cal = Calendar::default();
        let (from, to) = cal.range(date(2026, 3, 1), date(2026, 3, 2));
        assert_eq!(from, MARCH_1);
        assert_eq!(to, MARCH_1 + 2 * 86_400);
    }
}
