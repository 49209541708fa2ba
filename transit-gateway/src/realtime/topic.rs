//! Topic keys for realtime messages.

use std::fmt;

/// The kind of GTFS-RT message stored under a topic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    TripUpdates,
    Alerts,
    VehiclePositions,
}

impl TopicKind {
    pub const ALL: [TopicKind; 3] = [Self::TripUpdates, Self::Alerts, Self::VehiclePositions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TripUpdates => "realtime_trip_updates",
            Self::Alerts => "realtime_alerts",
            Self::VehiclePositions => "realtime_vehicle_positions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "realtime_trip_updates" => Some(Self::TripUpdates),
            "realtime_alerts" => Some(Self::Alerts),
            "realtime_vehicle_positions" => Some(Self::VehiclePositions),
            _ => None,
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `rtdata:{feed}:{kind}`
pub fn topic_key(feed_onestop_id: &str, kind: TopicKind) -> String {
    format!("rtdata:{feed_onestop_id}:{kind}")
}

/// Split a topic key into its feed onestop id and kind.
pub fn parse_topic_key(key: &str) -> Option<(&str, TopicKind)> {
    let rest = key.strip_prefix("rtdata:")?;
    let (feed, kind) = rest.rsplit_once(':')?;
    if feed.is_empty() {
        return None;
    }
    Some((feed, TopicKind::parse(kind)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(
            topic_key("BA~rt", TopicKind::TripUpdates),
            "rtdata:BA~rt:realtime_trip_updates"
        );
        assert_eq!(
            parse_topic_key("rtdata:f-9q9-bart:realtime_alerts"),
            Some(("f-9q9-bart", TopicKind::Alerts))
        );
    }

    #[test]
    fn rejects_foreign_keys() {
        assert_eq!(parse_topic_key("BA~rt"), None);
        assert_eq!(parse_topic_key("rtdata::realtime_alerts"), None);
        assert_eq!(parse_topic_key("rtdata:BA:realtime_shapes"), None);
    }
}
