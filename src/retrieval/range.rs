use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Upper bound of a single upstream query window, in days
pub const MAX_CHUNK_DAYS: u32 = 180;

/// Lookback used when a request carries no dates
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Inclusive calendar-date window, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// `[today - days, today]`
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Build a range from optional bounds. A missing end is `today`; a
    /// missing start is `lookback_days` before the end.
    pub fn from_bounds(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        lookback_days: u32,
    ) -> AppResult<Self> {
        let end = end.unwrap_or(today);
        match start {
            Some(start) => Self::new(start, end),
            None => Ok(Self::last_days(end, lookback_days)),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant of the window (`00:00:00.000` UTC).
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last instant of the window (`23:59:59.999` UTC).
    pub fn end_instant(&self) -> DateTime<Utc> {
        let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.end.and_time(last_milli).and_utc()
    }

    /// Number of calendar days covered, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Split into consecutive windows of at most `max_days` days each. The
    /// chunks tile the range exactly: each starts the day after the previous
    /// one ends.
    pub fn chunks(&self, max_days: u32) -> Vec<DateRange> {
        let span = Days::new(max_days.max(1) as u64 - 1);
        let mut chunks = Vec::new();
        let mut chunk_start = self.start;

        loop {
            let chunk_end = chunk_start
                .checked_add_days(span)
                .map_or(self.end, |d| d.min(self.end));
            chunks.push(DateRange {
                start: chunk_start,
                end: chunk_end,
            });

            if chunk_end >= self.end {
                break;
            }
            match chunk_end.succ_opt() {
                Some(next) => chunk_start = next,
                None => break,
            }
        }

        chunks
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_tiles(range: &DateRange, chunks: &[DateRange], max_days: u32) {
        assert_eq!(chunks.first().unwrap().start(), range.start());
        assert_eq!(chunks.last().unwrap().end(), range.end());
        for chunk in chunks {
            assert!(chunk.num_days() <= max_days as i64);
            assert!(chunk.start() <= chunk.end());
        }
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end().succ_opt().unwrap(), pair[1].start());
        }
        let covered: i64 = chunks.iter().map(|c| c.num_days()).sum();
        assert_eq!(covered, range.num_days());
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_short_range_is_single_chunk() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        assert_eq!(range.chunks(MAX_CHUNK_DAYS), vec![range]);

        let single_day = DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        assert_eq!(single_day.chunks(MAX_CHUNK_DAYS), vec![single_day]);
    }

    #[test]
    fn test_chunks_tile_range_without_gaps() {
        let range = DateRange::new(date(2022, 3, 15), date(2024, 11, 2)).unwrap();
        let chunks = range.chunks(MAX_CHUNK_DAYS);

        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks[0].num_days(), 180);
        assert_eq!(chunks[0].end(), date(2022, 9, 10));
        assert_eq!(chunks[1].start(), date(2022, 9, 11));
        assert_tiles(&range, &chunks, MAX_CHUNK_DAYS);
    }

    #[test]
    fn test_exact_multiple_of_chunk_size() {
        let start = date(2024, 1, 1);
        let end = start.checked_add_days(Days::new(359)).unwrap();
        let range = DateRange::new(start, end).unwrap();
        let chunks = range.chunks(MAX_CHUNK_DAYS);

        assert_eq!(chunks.len(), 2);
        assert_tiles(&range, &chunks, MAX_CHUNK_DAYS);
    }

    #[test]
    fn test_tiling_for_many_sizes() {
        let range = DateRange::new(date(2020, 1, 1), date(2021, 2, 28)).unwrap();
        for max_days in [1, 2, 7, 30, 31, 179, 180, 181, 1000] {
            assert_tiles(&range, &range.chunks(max_days), max_days);
        }
    }

    #[test]
    fn test_default_window() {
        let range = DateRange::from_bounds(None, None, date(2024, 3, 10), DEFAULT_LOOKBACK_DAYS).unwrap();
        assert_eq!(range.start(), date(2024, 3, 3));
        assert_eq!(range.end(), date(2024, 3, 10));

        assert_eq!(range.start_instant().to_rfc3339(), "2024-03-03T00:00:00+00:00");
        assert_eq!(
            range.end_instant().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            "2024-03-10T23:59:59.999"
        );
    }

    #[test]
    fn test_partial_bounds() {
        let today = date(2024, 3, 10);

        let only_end = DateRange::from_bounds(None, Some(date(2024, 1, 31)), today, 7).unwrap();
        assert_eq!(only_end.start(), date(2024, 1, 24));

        let only_start = DateRange::from_bounds(Some(date(2024, 3, 1)), None, today, 7).unwrap();
        assert_eq!(only_start.end(), today);

        assert!(DateRange::from_bounds(Some(date(2024, 4, 1)), None, today, 7).is_err());
    }
}
