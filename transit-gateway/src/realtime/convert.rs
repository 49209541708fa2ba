//! Conversion of GTFS-RT messages into gateway records.

use chrono::DateTime;
use geo::Point;
use gtfs_realtime::trip_update::stop_time_update;
use gtfs_realtime::{
    Alert as GtfsAlert, TranslatedString, VehiclePosition as GtfsVehicle, alert, trip_descriptor,
    vehicle_position,
};

use crate::domain::{
    Alert, RtStopTimeUpdate, RtTimeRange, RtTranslation, RtVehicleDescriptor, ScheduleRelationship,
    VehiclePosition,
};

fn translations(s: Option<&TranslatedString>) -> Vec<RtTranslation> {
    s.map(|s| {
        s.translation
            .iter()
            .map(|t| RtTranslation {
                text: t.text.clone(),
                language: t.language.clone(),
            })
            .collect()
    })
    .unwrap_or_default()
}

pub fn make_alert(a: &GtfsAlert) -> Alert {
    Alert {
        cause: a
            .cause
            .and_then(|v| alert::Cause::try_from(v).ok())
            .map(|c| c.as_str_name().to_string()),
        effect: a
            .effect
            .and_then(|v| alert::Effect::try_from(v).ok())
            .map(|e| e.as_str_name().to_string()),
        severity_level: a
            .severity_level
            .and_then(|v| alert::SeverityLevel::try_from(v).ok())
            .map(|s| s.as_str_name().to_string()),
        active_period: a
            .active_period
            .iter()
            .map(|p| RtTimeRange {
                start: p.start.and_then(|v| i64::try_from(v).ok()),
                end: p.end.and_then(|v| i64::try_from(v).ok()),
            })
            .collect(),
        header_text: translations(a.header_text.as_ref()),
        description_text: translations(a.description_text.as_ref()),
        tts_header_text: translations(a.tts_header_text.as_ref()),
        tts_description_text: translations(a.tts_description_text.as_ref()),
        url: translations(a.url.as_ref()),
    }
}

pub fn make_vehicle_position(feed_onestop_id: &str, v: &GtfsVehicle) -> VehiclePosition {
    let trip = v.trip.as_ref();
    VehiclePosition {
        feed_onestop_id: feed_onestop_id.to_string(),
        vehicle: v.vehicle.as_ref().map(|d| RtVehicleDescriptor {
            id: d.id.clone(),
            label: d.label.clone(),
            license_plate: d.license_plate.clone(),
        }),
        position: v
            .position
            .as_ref()
            .map(|p| Point::new(f64::from(p.longitude), f64::from(p.latitude))),
        bearing: v.position.as_ref().and_then(|p| p.bearing),
        speed: v.position.as_ref().and_then(|p| p.speed),
        current_stop_sequence: v.current_stop_sequence,
        stop_id: v.stop_id.clone(),
        current_status: v
            .current_status
            .and_then(|s| vehicle_position::VehicleStopStatus::try_from(s).ok())
            .map(|s| s.as_str_name().to_string()),
        congestion_level: v
            .congestion_level
            .and_then(|c| vehicle_position::CongestionLevel::try_from(c).ok())
            .map(|c| c.as_str_name().to_string()),
        timestamp: v
            .timestamp
            .and_then(|t| i64::try_from(t).ok())
            .and_then(|t| DateTime::from_timestamp(t, 0)),
        trip_id: trip.and_then(|t| t.trip_id.clone()),
        route_id: trip.and_then(|t| t.route_id.clone()),
    }
}

/// Trip-level relationship. Absent and unrecognized values map to `None`.
pub fn trip_schedule_relationship(value: Option<i32>) -> Option<ScheduleRelationship> {
    use trip_descriptor::ScheduleRelationship as Rt;
    match Rt::try_from(value?).ok()? {
        Rt::Scheduled => Some(ScheduleRelationship::Scheduled),
        Rt::Added => Some(ScheduleRelationship::Added),
        Rt::Unscheduled => Some(ScheduleRelationship::Unscheduled),
        Rt::Canceled => Some(ScheduleRelationship::Canceled),
        _ => None,
    }
}

/// True when the update marks the stop as skipped.
pub fn is_skipped(update: &RtStopTimeUpdate) -> bool {
    let skipped = stop_time_update::ScheduleRelationship::Skipped as i32;
    update
        .stop_time_update
        .as_ref()
        .is_some_and(|u| u.schedule_relationship == Some(skipped))
}
