//! Test corpus and wiring shared by the resolver tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use geo::Point;
use gtfs_realtime::{FeedEntity, FeedMessage};

use crate::config::GatewayConfig;
use crate::domain::*;
use crate::finder::{FinderData, MemoryActions, MemoryFinder, MemoryJobQueue, StaticChecker};
use crate::realtime::{LocalRtFinder, TopicKind, topic_key};
use crate::request::{MemoryMeter, RequestContext, Services, User};
use crate::service_time::{MockClock, ServiceWindowCache};

pub const BART_AGENCY: &str = "o-9q9-bart";
pub const RT_FEED: &str = "BA~rt";
pub const FV: i64 = 1;

pub const TWELFTH: i64 = 1;
pub const FTVL: i64 = 2;
pub const MCAR_S: i64 = 3;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(s: &str) -> Option<WideTime> {
    Some(WideTime::parse(s).unwrap())
}

fn stop(id: i64, stop_id: &str, zone: &str, lon: f64, lat: f64) -> Stop {
    Stop {
        id,
        feed_version_id: FV,
        feed_onestop_id: "BA".into(),
        onestop_id: format!("s-{}", stop_id.to_lowercase()),
        stop_id: stop_id.into(),
        stop_name: stop_id.into(),
        stop_timezone: zone.into(),
        geometry: Point::new(lon, lat),
        ..Default::default()
    }
}

pub fn trip(id: i64, trip_id: &str, service_id: i64) -> Trip {
    Trip {
        id,
        feed_version_id: FV,
        trip_id: trip_id.into(),
        route_id: 1,
        service_id,
        ..Default::default()
    }
}

/// Three stop times for one trip: 12TH, FTVL, MCAR_S.
pub fn calls(trip_id: i64, times: [&str; 3]) -> Vec<StopTime> {
    [TWELFTH, FTVL, MCAR_S]
        .into_iter()
        .zip(times)
        .enumerate()
        .map(|(i, (stop_id, time))| StopTime {
            feed_version_id: FV,
            trip_id,
            stop_id,
            stop_sequence: i as i32 + 1,
            arrival_time: t(time),
            departure_time: t(time),
            ..Default::default()
        })
        .collect()
}

/// A slice of BART on Wednesday 2018-05-30.
pub fn bart() -> FinderData {
    let trips = vec![
        (trip(1, "1031527WKDY", 1), ["15:50:00", "16:00:00", "16:10:00"]),
        (trip(2, "2211533WKDY", 1), ["15:52:00", "16:02:00", "16:12:00"]),
        (trip(3, "3610403WKDY", 1), ["15:54:30", "16:04:30", "16:14:30"]),
        (trip(4, "4410403WKDY", 1), ["16:00:00", "16:10:00", "16:20:00"]),
        (trip(5, "5510403WKDY", 1), ["23:54:00", "24:04:00", "24:14:00"]),
        (trip(6, "6610403WKDY", 1), ["24:27:00", "24:37:00", "24:47:00"]),
        (trip(7, "7710403WKDY", 1), ["21:10:00", "21:20:00", "21:30:00"]),
        (trip(8, "8810403SAT", 2), ["15:51:00", "16:01:00", "16:11:00"]),
    ];
    let stop_times = trips
        .iter()
        .flat_map(|(trip, times)| calls(trip.id, *times))
        .collect();
    let calendar = |id: i64, service_id: &str, weekday: bool| Calendar {
        id,
        feed_version_id: FV,
        service_id: service_id.into(),
        monday: weekday,
        tuesday: weekday,
        wednesday: weekday,
        thursday: weekday,
        friday: weekday,
        saturday: !weekday,
        start_date: d(2018, 1, 1),
        end_date: d(2019, 12, 31),
        ..Default::default()
    };
    let agency = |id: i64, onestop_id: &str, agency_id: &str| Agency {
        id,
        feed_version_id: FV,
        feed_onestop_id: "BA".into(),
        onestop_id: onestop_id.into(),
        agency_id: agency_id.into(),
        agency_name: agency_id.into(),
        agency_timezone: "America/Los_Angeles".into(),
        ..Default::default()
    };
    let place = |agency_id: i64, adm1_iso: &str, adm1_name: &str| AgencyPlace {
        agency_id,
        adm0_name: Some("United States of America".into()),
        adm0_iso: Some("US".into()),
        adm1_iso: Some(adm1_iso.into()),
        adm1_name: Some(adm1_name.into()),
        rank: 1.0,
        ..Default::default()
    };
    FinderData {
        feeds: vec![
            Feed {
                id: 1,
                onestop_id: "BA".into(),
                associated_feeds: vec![RT_FEED.into()],
                ..Default::default()
            },
            Feed {
                id: 2,
                onestop_id: RT_FEED.into(),
                spec: FeedSpec::GtfsRt,
                ..Default::default()
            },
        ],
        feed_states: vec![FeedState {
            id: 1,
            feed_id: 1,
            feed_version_id: Some(FV),
            public: true,
        }],
        feed_versions: vec![FeedVersion {
            id: FV,
            feed_id: 1,
            sha1: "e535eb2b3b9ac3ef15d82c56575e914575e732e0".into(),
            fetched_at: Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap(),
            ..Default::default()
        }],
        feed_version_service_windows: vec![FeedVersionServiceWindow {
            id: 1,
            feed_version_id: FV,
            feed_start_date: Some(d(2018, 1, 1)),
            feed_end_date: Some(d(2019, 12, 31)),
            fallback_week: Some(d(2018, 5, 28)),
            ..Default::default()
        }],
        agencies: vec![agency(1, BART_AGENCY, "BART"), agency(2, "o-9qs-rtc", "RTC")],
        agency_places: vec![
            place(1, "US-CA", "California"),
            place(2, "US-NV", "Nevada"),
        ],
        routes: vec![Route {
            id: 1,
            feed_version_id: FV,
            feed_onestop_id: "BA".into(),
            onestop_id: "r-9q9-orange".into(),
            route_id: "01".into(),
            agency_id: 1,
            route_long_name: "Richmond - Berryessa".into(),
            route_type: 1,
            ..Default::default()
        }],
        route_stops: [TWELFTH, FTVL, MCAR_S]
            .into_iter()
            .map(|stop_id| RouteStop {
                id: stop_id,
                feed_version_id: FV,
                route_id: 1,
                stop_id,
                agency_id: 1,
            })
            .collect(),
        stops: vec![
            stop(TWELFTH, "12TH", "America/Los_Angeles", -122.271604, 37.803664),
            stop(FTVL, "FTVL", "", -122.224175, 37.774836),
            stop(MCAR_S, "MCAR_S", "America/Los_Angeles", -122.267227, 37.828415),
        ],
        trips: trips.into_iter().map(|(trip, _)| trip).collect(),
        stop_times,
        calendars: vec![calendar(1, "WKDY", true), calendar(2, "SAT", false)],
        calendar_dates: vec![
            CalendarDate {
                id: 1,
                service_id: 1,
                date: d(2018, 7, 4),
                exception_type: 2,
            },
            CalendarDate {
                id: 2,
                service_id: 2,
                date: d(2018, 7, 4),
                exception_type: 1,
            },
        ],
        ..Default::default()
    }
}

/// `routes` routes of `trips` trips, each calling at `calls` distinct stops.
pub fn grid(routes: i64, trips: i64, calls: i64) -> FinderData {
    let mut data = FinderData {
        feed_versions: vec![FeedVersion {
            id: FV,
            feed_id: 1,
            ..Default::default()
        }],
        ..Default::default()
    };
    for r in 1..=routes {
        data.routes.push(Route {
            id: r,
            feed_version_id: FV,
            route_id: format!("r{r}"),
            ..Default::default()
        });
        for n in 0..trips {
            let trip_id = (r - 1) * trips + n + 1;
            data.trips.push(Trip {
                id: trip_id,
                feed_version_id: FV,
                trip_id: format!("t{trip_id}"),
                route_id: r,
                ..Default::default()
            });
            for c in 0..calls {
                let stop_id = (trip_id - 1) * calls + c + 1;
                data.stops.push(Stop {
                    id: stop_id,
                    feed_version_id: FV,
                    stop_id: format!("s{stop_id}"),
                    ..Default::default()
                });
                data.stop_times.push(StopTime {
                    feed_version_id: FV,
                    trip_id,
                    stop_id,
                    stop_sequence: c as i32 + 1,
                    ..Default::default()
                });
            }
        }
    }
    data
}

pub struct Fixture {
    pub finder: Arc<MemoryFinder>,
    pub rt: Arc<LocalRtFinder>,
    pub clock: MockClock,
    pub jobs: Arc<MemoryJobQueue>,
    pub services: Services,
}

impl Fixture {
    /// BART, with the clock at 15:50 local on 2018-05-30.
    pub fn new() -> Self {
        Self::with_data(bart())
    }

    pub fn with_data(data: FinderData) -> Self {
        let finder = Arc::new(MemoryFinder::new(data));
        let rt = Arc::new(LocalRtFinder::new(finder.clone()));
        let clock = MockClock::new(Utc.with_ymd_and_hms(2018, 5, 30, 22, 50, 0).unwrap());
        let jobs = Arc::new(MemoryJobQueue::new());
        let config = GatewayConfig::default().with_loader_wait(Duration::from_millis(10));
        let services = Services {
            finder: finder.clone(),
            rt: rt.clone(),
            gbfs: finder.clone(),
            checker: Arc::new(StaticChecker::new().with_roles("ian", &["admin"])),
            actions: Arc::new(MemoryActions::new(finder.clone())),
            jobs: jobs.clone(),
            clock: Arc::new(clock.clone()),
            service_windows: ServiceWindowCache::new(config.service_window_cache_capacity),
            config: Arc::new(config),
        };
        Self {
            finder,
            rt,
            clock,
            jobs,
            services,
        }
    }

    pub fn context(&self, user: User) -> RequestContext {
        self.services.request(user, Arc::new(MemoryMeter::new()))
    }

    /// Install realtime entities for the BART realtime feed.
    pub async fn publish(&self, kind: TopicKind, entity: Vec<FeedEntity>) {
        let message = FeedMessage {
            entity,
            ..Default::default()
        };
        self.rt.add_message(&topic_key(RT_FEED, kind), message).await;
    }
}
