//! Feed-version service windows.
//!
//! A service window is the date range over which a feed version is
//! considered representative, plus a "best week" whose days stand in for
//! dates outside that range.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate};
use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::{FeedInfo, FeedVersionServiceLevel, FeedVersionServiceWindow};
use crate::finder::{Finder, FinderError};

/// A week whose service is below this share of the busiest week is not
/// representative.
const MIN_SERVICE_RATIO: (i64, i64) = (3, 4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Monday of the busiest week inside the window.
    pub best_week: NaiveDate,
}

impl ServiceWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// `date` itself when inside the window, otherwise the day of the best
    /// week with the same weekday.
    pub fn map_date(&self, date: NaiveDate) -> NaiveDate {
        if self.contains(date) {
            return date;
        }
        let dow = u64::from(date.weekday().num_days_from_monday());
        self.best_week + Days::new(dow)
    }

    /// A stored window record, when it carries enough to be used.
    pub fn from_record(record: &FeedVersionServiceWindow) -> Option<Self> {
        let start_date = record.feed_start_date.or(record.earliest_calendar_date)?;
        let end_date = record.feed_end_date.or(record.latest_calendar_date)?;
        let best_week = record.fallback_week?;
        Some(Self {
            start_date,
            end_date,
            best_week,
        })
    }
}

fn is_poor(total: i64, highest: i64) -> bool {
    total * MIN_SERVICE_RATIO.1 < highest * MIN_SERVICE_RATIO.0
}

/// Work out a service window from weekly service levels.
///
/// The feed's own declared start and end dates win when both are given.
/// Otherwise the window grows outward from the week containing `fetched`
/// (or the busiest week, if `fetched` is not covered or is a poor week)
/// for as long as neighbouring weeks keep representative service.
///
/// Returns `None` when there are no service levels to work from.
pub fn derive_service_window(
    fetched: NaiveDate,
    feed_info: Option<&FeedInfo>,
    levels: &[FeedVersionServiceLevel],
) -> Option<ServiceWindow> {
    let mut weeks: Vec<&FeedVersionServiceLevel> = levels.iter().collect();
    weeks.sort_by_key(|w| w.start_date);
    let first = *weeks.first()?;

    let declared = feed_info.and_then(|fi| Some((fi.feed_start_date?, fi.feed_end_date?)));
    let (start_date, end_date) = match declared {
        Some(range) => range,
        None => {
            let mut highest_idx = 0;
            let mut highest = -1;
            let mut chosen = None;
            for (i, w) in weeks.iter().enumerate() {
                if w.start_date <= fetched && fetched <= w.end_date {
                    chosen = Some(i);
                }
                if w.total_service() > highest {
                    highest = w.total_service();
                    highest_idx = i;
                }
            }
            let mut chosen = chosen.unwrap_or(highest_idx);
            if is_poor(weeks[chosen].total_service(), highest) {
                chosen = highest_idx;
            }

            let mut start = weeks[chosen].start_date;
            let mut end = weeks[chosen].end_date;
            for w in &weeks[chosen..] {
                if is_poor(w.total_service(), highest) {
                    break;
                }
                start = start.min(w.start_date);
                end = w.end_date;
            }
            for w in weeks[..chosen].iter().rev() {
                if is_poor(w.total_service(), highest) {
                    break;
                }
                end = end.max(w.end_date);
                start = w.start_date;
            }
            (start, end)
        }
    };

    let mut best_week = first.start_date;
    let mut best_service = first.total_service();
    for w in &weeks {
        let overlaps = w.start_date <= end_date && w.end_date >= start_date;
        if overlaps && w.total_service() > best_service {
            best_service = w.total_service();
            best_week = w.start_date;
        }
    }

    debug!(%start_date, %end_date, %best_week, "service window");
    Some(ServiceWindow {
        start_date,
        end_date,
        best_week,
    })
}

/// Process-wide cache of service windows by feed version id.
///
/// Entries never change once written, including "no window" results.
/// Lookup failures are not cached.
#[derive(Clone)]
pub struct ServiceWindowCache {
    windows: MokaCache<i64, Option<ServiceWindow>>,
}

impl ServiceWindowCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            windows: MokaCache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub async fn get(
        &self,
        finder: &Arc<dyn Finder>,
        feed_version_id: i64,
    ) -> Result<Option<ServiceWindow>, FinderError> {
        let finder = Arc::clone(finder);
        self.windows
            .try_get_with(feed_version_id, async move {
                finder.find_feed_version_service_window(feed_version_id).await
            })
            .await
            .map_err(|e| (*e).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn week(monday: NaiveDate, per_day: i64) -> FeedVersionServiceLevel {
        FeedVersionServiceLevel {
            start_date: monday,
            end_date: monday + Days::new(6),
            monday: per_day,
            tuesday: per_day,
            wednesday: per_day,
            thursday: per_day,
            friday: per_day,
            saturday: per_day,
            sunday: per_day,
            ..Default::default()
        }
    }

    /// Five consecutive weeks from 2018-06-04 with the given daily service.
    fn weeks(service: [i64; 5]) -> Vec<FeedVersionServiceLevel> {
        service
            .iter()
            .enumerate()
            .map(|(i, s)| week(d(2018, 6, 4) + Days::new(7 * i as u64), *s))
            .collect()
    }

    #[test]
    fn declared_feed_dates_win() {
        let info = FeedInfo {
            feed_start_date: Some(d(2018, 5, 26)),
            feed_end_date: Some(d(2019, 7, 1)),
            ..Default::default()
        };
        let w = derive_service_window(d(2018, 6, 10), Some(&info), &weeks([10, 10, 20, 10, 10]))
            .unwrap();
        assert_eq!(w.start_date, d(2018, 5, 26));
        assert_eq!(w.end_date, d(2019, 7, 1));
        assert_eq!(w.best_week, d(2018, 6, 18));
    }

    #[test]
    fn grows_from_fetched_week_until_poor_service() {
        // Fetched in week 1; weeks 0 and 4 are poor.
        let levels = weeks([1, 10, 10, 9, 2]);
        let w = derive_service_window(d(2018, 6, 13), None, &levels).unwrap();
        assert_eq!(w.start_date, d(2018, 6, 11));
        assert_eq!(w.end_date, d(2018, 7, 1));
        assert_eq!(w.best_week, d(2018, 6, 11));
    }

    #[test]
    fn falls_back_to_busiest_week_when_fetched_week_is_poor() {
        let levels = weeks([1, 1, 2, 10, 10]);
        let w = derive_service_window(d(2018, 6, 6), None, &levels).unwrap();
        assert_eq!(w.start_date, d(2018, 6, 25));
        assert_eq!(w.end_date, d(2018, 7, 8));
        assert_eq!(w.best_week, d(2018, 6, 25));
    }

    #[test]
    fn no_levels_no_window() {
        assert_eq!(derive_service_window(d(2018, 6, 6), None, &[]), None);
    }

    #[test]
    fn maps_outside_dates_onto_best_week() {
        let w = ServiceWindow {
            start_date: d(2018, 6, 4),
            end_date: d(2018, 7, 8),
            best_week: d(2018, 6, 18),
        };
        // Inside: unchanged.
        assert_eq!(w.map_date(d(2018, 6, 20)), d(2018, 6, 20));
        // 2019-01-04 is a Friday.
        assert_eq!(w.map_date(d(2019, 1, 4)), d(2018, 6, 22));
        // 2018-01-07 is a Sunday.
        assert_eq!(w.map_date(d(2018, 1, 7)), d(2018, 6, 24));
    }

    #[test]
    fn record_conversion_prefers_feed_dates() {
        let record = FeedVersionServiceWindow {
            feed_start_date: Some(d(2018, 6, 1)),
            earliest_calendar_date: Some(d(2018, 1, 1)),
            latest_calendar_date: Some(d(2018, 12, 31)),
            fallback_week: Some(d(2018, 6, 18)),
            ..Default::default()
        };
        let w = ServiceWindow::from_record(&record).unwrap();
        assert_eq!(w.start_date, d(2018, 6, 1));
        assert_eq!(w.end_date, d(2018, 12, 31));

        let without_week = FeedVersionServiceWindow {
            fallback_week: None,
            ..record
        };
        assert_eq!(ServiceWindow::from_record(&without_week), None);
    }
}
