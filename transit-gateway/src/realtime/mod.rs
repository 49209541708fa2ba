//! Realtime overlays.
//!
//! GTFS-RT messages are decoded into immutable [`Source`]s and stored by
//! topic key. Readers take an [`RtSnapshot`] for a feed version and run
//! every match against it, so one field evaluation never sees two
//! different generations of realtime data.

mod convert;
mod event;
mod local;
mod lookup;
mod merge;
mod snapshot;
mod source;
mod topic;

pub use convert::{is_skipped, make_alert, make_vehicle_position, trip_schedule_relationship};
pub use event::{build_stop_time_event, wide_time_of};
pub use local::{
    LocalRtFinder, alerts_for_agency, alerts_for_route, alerts_for_stop, alerts_for_trip,
    select_alerts,
};
pub use lookup::LookupCache;
pub use merge::{added_stop_times, merge_stop_times};
pub use snapshot::{FeedSources, RtSnapshot, match_stop_time_update};
pub use source::Source;
pub use topic::{TopicKind, parse_topic_key, topic_key};
