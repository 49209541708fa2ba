//! A decoded GTFS-RT message, indexed for lookup.

use std::collections::HashMap;

use gtfs_realtime::{Alert as GtfsAlert, FeedMessage, TripUpdate, VehiclePosition as GtfsVehicle};
use prost::Message;

use crate::finder::FinderError;

/// One feed message with its entities split out by type.
///
/// Sources are immutable once built; a new message replaces the whole
/// source.
#[derive(Debug, Clone, Default)]
pub struct Source {
    /// Header timestamp, Unix seconds.
    pub timestamp: Option<u64>,
    trips: HashMap<String, TripUpdate>,
    alerts: Vec<GtfsAlert>,
    vehicles: Vec<GtfsVehicle>,
}

impl Source {
    pub fn decode(data: &[u8]) -> Result<Self, FinderError> {
        let message = FeedMessage::decode(data)
            .map_err(|e| FinderError::InvalidQuery(format!("invalid GTFS-RT message: {e}")))?;
        Ok(Self::from_message(message))
    }

    pub fn from_message(message: FeedMessage) -> Self {
        let mut source = Self {
            timestamp: message.header.timestamp,
            ..Default::default()
        };
        for entity in message.entity {
            if entity.is_deleted.unwrap_or(false) {
                continue;
            }
            if let Some(tu) = entity.trip_update {
                if let Some(trip_id) = tu.trip.trip_id.clone().filter(|id| !id.is_empty()) {
                    source.trips.insert(trip_id, tu);
                }
            }
            if let Some(alert) = entity.alert {
                source.alerts.push(alert);
            }
            if let Some(vehicle) = entity.vehicle {
                source.vehicles.push(vehicle);
            }
        }
        source
    }

    pub fn trip(&self, trip_id: &str) -> Option<&TripUpdate> {
        if trip_id.is_empty() {
            return None;
        }
        self.trips.get(trip_id)
    }

    pub fn trips(&self) -> impl Iterator<Item = &TripUpdate> {
        self.trips.values()
    }

    pub fn alerts(&self) -> &[GtfsAlert] {
        &self.alerts
    }

    pub fn vehicles(&self) -> &[GtfsVehicle] {
        &self.vehicles
    }
}
