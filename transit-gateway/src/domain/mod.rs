//! Domain types for the transit gateway.
//!
//! Records mirror the warehouse rows the finders return. Relations between
//! entities are internal integer ids, never embedded values, so a resolver
//! only follows a reference when the client asks for it.

mod agency;
mod census;
mod cursor;
mod error;
mod feed;
mod filter;
mod gbfs;
mod geom;
mod input;
mod realtime;
mod route;
mod stop;
mod time;
mod trip;

pub use agency::{Agency, AgencyPlace, Operator, Place, PlaceAggregationLevel};
pub use census::{
    CensusDataset, CensusEntityKind, CensusField, CensusGeography, CensusSource, CensusTable,
    CensusValue,
};
pub use cursor::{Cursor, CursorError, MAX_CURSOR_ID};
pub use error::DomainError;
pub use feed::{
    Feed, FeedAuthorization, FeedFetch, FeedInfo, FeedLicense, FeedSpec, FeedState, FeedUrls,
    FeedVersion, FeedVersionGtfsImport, FeedVersionServiceLevel, FeedVersionServiceWindow,
};
pub use filter::{
    AgencyFilter, AgencyPlaceFilter, CalendarDateFilter, CensusDatasetFilter,
    CensusGeographyFilter, CensusSourceFilter, FeedFetchFilter, FeedFilter, FeedVersionFilter,
    FeedVersionServiceLevelFilter, OperatorFilter, PathwayFilter, PlaceFilter, RelativeDate,
    RouteFilter, StopFilter, StopTimeFilter, TripFilter, TripStopTimeFilter,
    VehiclePositionFilter,
};
pub use gbfs::{GbfsBikeRequest, GbfsDockRequest, GbfsFreeBikeStatus, GbfsStationInformation};
pub use geom::{BoundingBox, PointRadius};
pub use input::{
    DeleteResult, FeedVersionDeleteResult, FeedVersionFetchResult, FeedVersionImportResult,
    FeedVersionUnimportResult, LevelSetInput, PathwaySetInput, StopSetInput, ValidationResult,
};
pub use realtime::{
    Alert, RtStopTimeUpdate, RtTimeRange, RtTranslation, RtVehicleDescriptor,
    ScheduleRelationship, StopTimeEvent, VehiclePosition,
};
pub use route::{
    Route, RouteGeometry, RouteHeadway, RouteStop, RouteStopBuffer, RouteStopPattern,
};
pub use stop::{Level, Pathway, Stop, StopExternalReference};
pub use time::{SECONDS_PER_DAY, TimeError, WideTime, service_midnight};
pub use trip::{ADDED_TRIP_ID, Calendar, CalendarDate, Frequency, Shape, StopTime, Trip};
