//! A consistent view of the realtime state for one feed version.

use std::sync::Arc;

use gtfs_realtime::trip_update::StopTimeUpdate;
use gtfs_realtime::{Alert as GtfsAlert, TripUpdate, trip_descriptor};
use tracing::trace;

use super::source::Source;
use crate::domain::RtStopTimeUpdate;

/// The sources of one realtime feed, as they stood when the snapshot was
/// taken.
#[derive(Debug, Clone, Default)]
pub struct FeedSources {
    pub feed_onestop_id: String,
    pub trip_updates: Option<Arc<Source>>,
    pub alerts: Option<Arc<Source>>,
    pub vehicle_positions: Option<Arc<Source>>,
}

/// Realtime state for one feed version.
///
/// Holds shared references to the sources current at capture time, so a
/// resolver reads one coherent state even if newer messages arrive while
/// it runs.
#[derive(Debug, Clone, Default)]
pub struct RtSnapshot {
    feeds: Vec<FeedSources>,
}

impl RtSnapshot {
    pub fn new(feeds: Vec<FeedSources>) -> Self {
        Self { feeds }
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn feeds(&self) -> &[FeedSources] {
        &self.feeds
    }

    fn trip_sources(&self) -> impl Iterator<Item = &Source> {
        self.feeds.iter().filter_map(|f| f.trip_updates.as_deref())
    }

    /// The TripUpdate for a GTFS trip id, from the first feed that has one.
    pub fn find_trip(&self, gtfs_trip_id: &str) -> Option<&TripUpdate> {
        self.trip_sources().find_map(|s| s.trip(gtfs_trip_id))
    }

    /// Header timestamp of the feed that carries this trip's update.
    pub fn trip_timestamp(&self, gtfs_trip_id: &str) -> Option<u64> {
        self.trip_sources()
            .find(|s| s.trip(gtfs_trip_id).is_some())
            .and_then(|s| s.timestamp)
    }

    /// The StopTimeUpdate for one visit of a trip.
    ///
    /// An exact `stop_sequence` match wins. Failing that, a `stop_id`
    /// match is used only when the update lists that stop once. When
    /// nothing matches but an earlier stop on the trip reported a delay,
    /// the result carries that delay alone.
    pub fn find_stop_time_update(
        &self,
        gtfs_trip_id: &str,
        stop_sequence: i32,
        gtfs_stop_id: Option<&str>,
    ) -> Option<RtStopTimeUpdate> {
        let mut propagated = None;
        for source in self.trip_sources() {
            let Some(tu) = source.trip(gtfs_trip_id) else {
                continue;
            };
            match match_stop_time_update(tu, stop_sequence, gtfs_stop_id) {
                Some(found) if found.stop_time_update.is_some() => {
                    trace!(trip_id = gtfs_trip_id, stop_sequence, "found stop time update");
                    return Some(found);
                }
                Some(delay_only) if propagated.is_none() => propagated = Some(delay_only),
                _ => {}
            }
        }
        trace!(trip_id = gtfs_trip_id, stop_sequence, "no stop time update");
        propagated
    }

    /// ADDED trips that stop at a GTFS stop id.
    pub fn added_trips_for_stop(&self, gtfs_stop_id: &str) -> Vec<&TripUpdate> {
        let added = trip_descriptor::ScheduleRelationship::Added as i32;
        self.trip_sources()
            .flat_map(|s| s.trips())
            .filter(|tu| tu.trip.schedule_relationship == Some(added))
            .filter(|tu| {
                tu.stop_time_update
                    .iter()
                    .any(|u| u.stop_id.as_deref() == Some(gtfs_stop_id))
            })
            .collect()
    }

    /// Every alert in the snapshot, with the onestop id of its feed.
    pub fn alerts(&self) -> impl Iterator<Item = (&str, &GtfsAlert)> {
        self.feeds.iter().flat_map(|f| {
            f.alerts
                .iter()
                .flat_map(|s| s.alerts())
                .map(move |a| (f.feed_onestop_id.as_str(), a))
        })
    }
}

fn matches_stop(u: &StopTimeUpdate, stop_id: &str) -> bool {
    u.stop_id.as_deref() == Some(stop_id)
}

fn reported_delay(u: &StopTimeUpdate) -> Option<i32> {
    let departure = u.departure.as_ref().and_then(|e| e.delay);
    departure.or_else(|| u.arrival.as_ref().and_then(|e| e.delay))
}

/// Match one visit within a single TripUpdate.
pub fn match_stop_time_update(
    tu: &TripUpdate,
    stop_sequence: i32,
    gtfs_stop_id: Option<&str>,
) -> Option<RtStopTimeUpdate> {
    let updates = &tu.stop_time_update;
    let by_sequence = updates
        .iter()
        .position(|u| u.stop_sequence.is_some_and(|s| i64::from(s) == i64::from(stop_sequence)));
    let index = by_sequence.or_else(|| {
        let sid = gtfs_stop_id?;
        let visits = updates.iter().filter(|u| matches_stop(u, sid)).count();
        if visits != 1 {
            return None;
        }
        updates.iter().position(|u| matches_stop(u, sid))
    });

    match index {
        Some(i) => Some(RtStopTimeUpdate {
            stop_time_update: Some(updates[i].clone()),
            last_delay: updates[..i].iter().filter_map(reported_delay).last(),
        }),
        None => {
            let last_delay = updates
                .iter()
                .filter(|u| {
                    u.stop_sequence
                        .is_some_and(|s| i64::from(s) < i64::from(stop_sequence))
                })
                .filter_map(reported_delay)
                .last()?;
            Some(RtStopTimeUpdate {
                stop_time_update: None,
                last_delay: Some(last_delay),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use gtfs_realtime::TripDescriptor;
    use gtfs_realtime::trip_update::StopTimeEvent as GtfsEvent;

    use super::*;

    fn stu(seq: Option<u32>, stop_id: &str, delay: Option<i32>) -> StopTimeUpdate {
        StopTimeUpdate {
            stop_sequence: seq,
            stop_id: Some(stop_id.to_string()),
            arrival: delay.map(|d| GtfsEvent {
                delay: Some(d),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn trip(updates: Vec<StopTimeUpdate>) -> TripUpdate {
        TripUpdate {
            trip: TripDescriptor {
                trip_id: Some("t1".to_string()),
                ..Default::default()
            },
            stop_time_update: updates,
            ..Default::default()
        }
    }

    #[test]
    fn sequence_match_wins() {
        let tu = trip(vec![stu(Some(1), "A", Some(10)), stu(Some(2), "B", Some(20))]);
        let found = match_stop_time_update(&tu, 2, Some("A")).unwrap();
        assert_eq!(found.stop_time_update.unwrap().stop_id.as_deref(), Some("B"));
        assert_eq!(found.last_delay, Some(10));
    }

    #[test]
    fn unique_stop_id_attaches() {
        let tu = trip(vec![stu(None, "A", None), stu(None, "FTVL", Some(30))]);
        let found = match_stop_time_update(&tu, 7, Some("FTVL")).unwrap();
        let update = found.stop_time_update.unwrap();
        assert_eq!(update.arrival.unwrap().delay, Some(30));
    }

    #[test]
    fn repeated_stop_id_does_not_attach() {
        let tu = trip(vec![
            stu(None, "LOOP", Some(30)),
            stu(None, "B", None),
            stu(None, "LOOP", Some(60)),
        ]);
        assert_eq!(match_stop_time_update(&tu, 7, Some("LOOP")), None);
    }

    #[test]
    fn later_stop_inherits_last_delay() {
        let tu = trip(vec![stu(Some(1), "A", Some(45)), stu(Some(2), "B", Some(90))]);
        let found = match_stop_time_update(&tu, 5, Some("E")).unwrap();
        assert!(found.stop_time_update.is_none());
        assert_eq!(found.last_delay, Some(90));

        // Nothing earlier reported a delay.
        assert_eq!(match_stop_time_update(&tu, 0, Some("E")), None);
    }

    #[test]
    fn snapshot_prefers_a_real_match_over_a_propagated_delay() {
        let first = trip(vec![stu(Some(1), "A", Some(45))]);
        let second = trip(vec![stu(Some(5), "E", Some(120))]);
        let source = |tu: TripUpdate| {
            Arc::new(Source::from_message(gtfs_realtime::FeedMessage {
                entity: vec![gtfs_realtime::FeedEntity {
                    id: "x".to_string(),
                    trip_update: Some(tu),
                    ..Default::default()
                }],
                ..Default::default()
            }))
        };
        let snapshot = RtSnapshot::new(vec![
            FeedSources {
                feed_onestop_id: "a".to_string(),
                trip_updates: Some(source(first)),
                ..Default::default()
            },
            FeedSources {
                feed_onestop_id: "b".to_string(),
                trip_updates: Some(source(second)),
                ..Default::default()
            },
        ]);
        let found = snapshot.find_stop_time_update("t1", 5, Some("E")).unwrap();
        assert!(found.stop_time_update.is_some());
        assert_eq!(snapshot.find_trip("t1").map(|t| t.stop_time_update.len()), Some(1));
    }
}
