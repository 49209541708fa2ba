//! Row predicates for the in-memory warehouse.
//!
//! Each `where` filter is answered against a [`FinderData`] snapshot. Joins
//! are linear scans; the data set is expected to be small.

use chrono::{Datelike, NaiveDate, Weekday};
use geo::{Contains, HaversineDistance, Point};

use super::memory::FinderData;
use crate::domain::*;

fn eq_opt(want: &Option<String>, have: &str) -> bool {
    want.as_deref().is_none_or(|w| w == have)
}

/// Case-insensitive substring search over a set of fields.
fn search_hit<'a>(search: &Option<String>, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let Some(needle) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    fields
        .into_iter()
        .any(|f| f.to_lowercase().contains(&needle))
}

fn geo_hit(
    near: Option<&PointRadius>,
    bbox: Option<&BoundingBox>,
    points: &[Point<f64>],
) -> bool {
    near.is_none_or(|n| points.iter().any(|p| n.contains(p)))
        && bbox.is_none_or(|b| points.iter().any(|p| b.contains(p)))
}

impl FinderData {
    pub(crate) fn feed_version(&self, id: i64) -> Option<&FeedVersion> {
        self.feed_versions.iter().find(|fv| fv.id == id)
    }

    pub(crate) fn feed(&self, id: i64) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub(crate) fn feed_by_onestop_id(&self, onestop_id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.onestop_id == onestop_id)
    }

    pub(crate) fn stop(&self, id: i64) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == id)
    }

    pub(crate) fn route(&self, id: i64) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub(crate) fn trip(&self, id: i64) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == id)
    }

    /// Onestop id of the feed a version belongs to.
    pub(crate) fn feed_onestop_id_of_version(&self, feed_version_id: i64) -> Option<&str> {
        let fv = self.feed_version(feed_version_id)?;
        self.feed(fv.feed_id).map(|f| f.onestop_id.as_str())
    }

    /// The active feed version of a feed.
    pub(crate) fn active_feed_version(&self, feed_id: i64) -> Option<i64> {
        self.feed_states
            .iter()
            .find(|s| s.feed_id == feed_id)
            .and_then(|s| s.feed_version_id)
    }

    /// True when the calendar runs on `date`, after calendar_dates
    /// exceptions.
    pub(crate) fn calendar_active(&self, service_id: i64, date: NaiveDate) -> bool {
        let exception = self
            .calendar_dates
            .iter()
            .find(|cd| cd.service_id == service_id && cd.date == date);
        if let Some(cd) = exception {
            return cd.exception_type == 1;
        }
        let Some(cal) = self.calendars.iter().find(|c| c.id == service_id) else {
            return false;
        };
        if date < cal.start_date || date > cal.end_date {
            return false;
        }
        match date.weekday() {
            Weekday::Mon => cal.monday,
            Weekday::Tue => cal.tuesday,
            Weekday::Wed => cal.wednesday,
            Weekday::Thu => cal.thursday,
            Weekday::Fri => cal.friday,
            Weekday::Sat => cal.saturday,
            Weekday::Sun => cal.sunday,
        }
    }

    pub(crate) fn route_stop_points(&self, route_id: i64) -> Vec<Point<f64>> {
        self.route_stops
            .iter()
            .filter(|rs| rs.route_id == route_id)
            .filter_map(|rs| self.stop(rs.stop_id))
            .map(|s| s.geometry)
            .collect()
    }

    pub(crate) fn agency_stop_points(&self, agency_id: i64) -> Vec<Point<f64>> {
        self.route_stops
            .iter()
            .filter(|rs| rs.agency_id == agency_id)
            .filter_map(|rs| self.stop(rs.stop_id))
            .map(|s| s.geometry)
            .collect()
    }

    fn stop_agency_ids(&self, stop_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.route_stops
            .iter()
            .filter(move |rs| rs.stop_id == stop_id)
            .map(|rs| rs.agency_id)
    }

    fn agency_places_of(&self, agency_id: i64) -> impl Iterator<Item = &AgencyPlace> + '_ {
        self.agency_places
            .iter()
            .filter(move |p| p.agency_id == agency_id)
    }

    pub(crate) fn agency_matches(&self, a: &Agency, f: &AgencyFilter) -> bool {
        if !(eq_opt(&f.onestop_id, &a.onestop_id)
            && eq_opt(&f.feed_version_sha1, &a.feed_version_sha1)
            && eq_opt(&f.feed_onestop_id, &a.feed_onestop_id)
            && eq_opt(&f.agency_id, &a.agency_id)
            && eq_opt(&f.agency_name, &a.agency_name)
            && search_hit(&f.search, [a.agency_name.as_str(), a.agency_id.as_str()]))
        {
            return false;
        }
        if (f.near.is_some() || f.bbox.is_some())
            && !geo_hit(f.near.as_ref(), f.bbox.as_ref(), &self.agency_stop_points(a.id))
        {
            return false;
        }
        let wants_place = f.adm0_iso.is_some()
            || f.adm1_iso.is_some()
            || f.adm0_name.is_some()
            || f.adm1_name.is_some()
            || f.city_name.is_some();
        if !wants_place {
            return true;
        }
        self.agency_places_of(a.id).any(|p| {
            let same = |want: &Option<String>, have: &Option<String>| {
                want.is_none() || want.as_deref() == have.as_deref()
            };
            same(&f.adm0_iso, &p.adm0_iso)
                && same(&f.adm1_iso, &p.adm1_iso)
                && same(&f.adm0_name, &p.adm0_name)
                && same(&f.adm1_name, &p.adm1_name)
                && same(&f.city_name, &p.city_name)
        })
    }

    pub(crate) fn route_matches(&self, r: &Route, f: &RouteFilter) -> bool {
        eq_opt(&f.onestop_id, &r.onestop_id)
            && (f.onestop_ids.is_empty() || f.onestop_ids.contains(&r.onestop_id))
            && eq_opt(&f.feed_version_sha1, &r.feed_version_sha1)
            && eq_opt(&f.feed_onestop_id, &r.feed_onestop_id)
            && eq_opt(&f.route_id, &r.route_id)
            && f.route_type.is_none_or(|t| t == r.route_type)
            && search_hit(
                &f.search,
                [
                    r.route_short_name.as_str(),
                    r.route_long_name.as_str(),
                    r.route_id.as_str(),
                ],
            )
            && (f.agency_ids.is_empty() || f.agency_ids.contains(&r.agency_id))
            && (f.near.is_none() && f.bbox.is_none()
                || geo_hit(f.near.as_ref(), f.bbox.as_ref(), &self.route_stop_points(r.id)))
    }

    pub(crate) fn stop_matches(&self, s: &Stop, f: &StopFilter) -> bool {
        eq_opt(&f.onestop_id, &s.onestop_id)
            && (f.onestop_ids.is_empty() || f.onestop_ids.contains(&s.onestop_id))
            && eq_opt(&f.feed_version_sha1, &s.feed_version_sha1)
            && eq_opt(&f.feed_onestop_id, &s.feed_onestop_id)
            && eq_opt(&f.stop_id, &s.stop_id)
            && f.stop_code.as_deref().is_none_or(|c| s.stop_code.as_deref() == Some(c))
            && f.location_type.is_none_or(|t| t == s.location_type)
            && search_hit(&f.search, [s.stop_name.as_str(), s.stop_id.as_str()])
            && geo_hit(f.near.as_ref(), f.bbox.as_ref(), &[s.geometry])
            && (f.agency_ids.is_empty()
                || self.stop_agency_ids(s.id).any(|a| f.agency_ids.contains(&a)))
    }

    pub(crate) fn trip_matches(&self, t: &Trip, f: &TripFilter) -> bool {
        if !(eq_opt(&f.trip_id, &t.trip_id)
            && f.stop_pattern_id.is_none_or(|p| p == t.stop_pattern_id)
            && (f.route_ids.is_empty() || f.route_ids.contains(&t.route_id))
            && f.service_date.is_none_or(|d| self.calendar_active(t.service_id, d)))
        {
            return false;
        }
        if !f.route_onestop_ids.is_empty() {
            let hit = self
                .route(t.route_id)
                .is_some_and(|r| f.route_onestop_ids.contains(&r.onestop_id));
            if !hit {
                return false;
            }
        }
        if f.feed_version_sha1.is_some() {
            let sha1 = self.feed_version(t.feed_version_id).map(|fv| fv.sha1.as_str());
            if f.feed_version_sha1.as_deref() != sha1 {
                return false;
            }
        }
        if f.feed_onestop_id.is_some()
            && f.feed_onestop_id.as_deref() != self.feed_onestop_id_of_version(t.feed_version_id)
        {
            return false;
        }
        true
    }

    pub(crate) fn feed_matches(&self, feed: &Feed, f: &FeedFilter) -> bool {
        let urls = &feed.urls;
        let all_urls = urls
            .static_current
            .iter()
            .chain(&urls.static_historic)
            .chain(&urls.realtime_trip_updates)
            .chain(&urls.realtime_alerts)
            .chain(&urls.realtime_vehicle_positions)
            .chain(&urls.gbfs_auto_discovery);
        let latest_fetch = self
            .feed_fetches
            .iter()
            .filter(|ff| ff.feed_id == feed.id)
            .max_by_key(|ff| ff.fetched_at);
        eq_opt(&f.onestop_id, &feed.onestop_id)
            && (f.spec.is_empty() || f.spec.contains(&feed.spec))
            && search_hit(
                &f.search,
                [feed.onestop_id.as_str(), feed.name.as_deref().unwrap_or("")],
            )
            && f.fetch_error.is_none_or(|want| {
                latest_fetch.is_some_and(|ff| ff.fetch_error.is_some() == want)
            })
            && f.tags.iter().all(|(k, v)| feed.tags.get(k) == Some(v))
            && f.source_url.as_ref().is_none_or(|u| {
                let mut all_urls = all_urls;
                all_urls.any(|have| have == u)
            })
    }

    pub(crate) fn feed_version_matches(&self, fv: &FeedVersion, f: &FeedVersionFilter) -> bool {
        eq_opt(&f.sha1, &fv.sha1)
            && (f.feed_onestop_id.is_none()
                || f.feed_onestop_id.as_deref() == self.feed(fv.feed_id).map(|x| x.onestop_id.as_str()))
            && (f.feed_ids.is_empty() || f.feed_ids.contains(&fv.feed_id))
            && f.file.as_deref().is_none_or(|file| fv.file.as_deref() == Some(file))
            && f.covers.is_none_or(|d| {
                fv.earliest_calendar_date.is_some_and(|e| e <= d)
                    && fv.latest_calendar_date.is_some_and(|l| d <= l)
            })
    }

    pub(crate) fn operator_matches(&self, o: &Operator, f: &OperatorFilter) -> bool {
        let feed = o.feed_id.and_then(|id| self.feed(id));
        let agency = o
            .agency_id
            .and_then(|id| self.agencies.iter().find(|a| a.id == id));
        if !(eq_opt(&f.onestop_id, &o.onestop_id)
            && (f.feed_onestop_id.is_none()
                || f.feed_onestop_id.as_deref() == feed.map(|x| x.onestop_id.as_str()))
            && (f.agency_id.is_none()
                || f.agency_id.as_deref() == agency.map(|a| a.agency_id.as_str()))
            && search_hit(
                &f.search,
                [
                    o.onestop_id.as_str(),
                    o.name.as_deref().unwrap_or(""),
                    o.short_name.as_deref().unwrap_or(""),
                ],
            )
            && f.tags.iter().all(|(k, v)| o.tags.get(k) == Some(v)))
        {
            return false;
        }
        let wants_place = f.adm0_iso.is_some()
            || f.adm1_iso.is_some()
            || f.adm0_name.is_some()
            || f.adm1_name.is_some()
            || f.city_name.is_some();
        if !wants_place {
            return true;
        }
        let Some(agency) = agency else {
            return false;
        };
        let place_filter = AgencyFilter {
            adm0_iso: f.adm0_iso.clone(),
            adm1_iso: f.adm1_iso.clone(),
            adm0_name: f.adm0_name.clone(),
            adm1_name: f.adm1_name.clone(),
            city_name: f.city_name.clone(),
            ..Default::default()
        };
        self.agency_matches(agency, &place_filter)
    }

    /// Points standing in for a census lookup's entity.
    pub(crate) fn census_entity_points(&self, kind: CensusEntityKind, id: i64) -> Vec<Point<f64>> {
        match kind {
            CensusEntityKind::Stop => self.stop(id).map(|s| vec![s.geometry]).unwrap_or_default(),
            CensusEntityKind::Route => self.route_stop_points(id),
            CensusEntityKind::Agency => self.agency_stop_points(id),
        }
    }

    pub(crate) fn census_geography_matches(
        &self,
        g: &CensusGeography,
        points: &[Point<f64>],
        f: Option<&CensusGeographyFilter>,
    ) -> bool {
        let Some(geometry) = &g.geometry else {
            return false;
        };
        if let Some(f) = f {
            if !(eq_opt(&f.layer, &g.layer_name)
                && search_hit(&f.search, [g.name.as_deref().unwrap_or(""), g.geoid.as_str()]))
            {
                return false;
            }
        }
        let radius = f.and_then(|f| f.radius).unwrap_or(0.0);
        points.iter().any(|p| {
            geometry.contains(p)
                || radius > 0.0
                    && geometry
                        .0
                        .iter()
                        .flat_map(|poly| poly.exterior().points())
                        .any(|v| v.haversine_distance(p) <= radius)
        })
    }

    /// Departure (else arrival) seconds of a stop time.
    fn stop_time_seconds(st: &StopTime) -> Option<i32> {
        st.departure_time.or(st.arrival_time).map(|t| t.seconds())
    }

    pub(crate) fn stop_time_matches(&self, st: &StopTime, f: &StopTimeFilter) -> bool {
        let start = f.start_time.or(f.start.map(|t| t.seconds()));
        let end = f.end_time.or(f.end.map(|t| t.seconds()));
        if start.is_some() || end.is_some() {
            let Some(t) = Self::stop_time_seconds(st) else {
                return false;
            };
            if start.is_some_and(|s| t < s) || end.is_some_and(|e| t >= e) {
                return false;
            }
        }
        let needs_trip = f.service_date.is_some()
            || !f.route_onestop_ids.is_empty()
            || f.exclude_first == Some(true)
            || f.exclude_last == Some(true);
        if !needs_trip {
            return true;
        }
        let Some(trip) = self.trip(st.trip_id) else {
            return false;
        };
        if f.service_date
            .is_some_and(|d| !self.calendar_active(trip.service_id, d))
        {
            return false;
        }
        if !f.route_onestop_ids.is_empty()
            && !self
                .route(trip.route_id)
                .is_some_and(|r| f.route_onestop_ids.contains(&r.onestop_id))
        {
            return false;
        }
        if f.exclude_first == Some(true) || f.exclude_last == Some(true) {
            let seqs = self
                .stop_times
                .iter()
                .filter(|o| o.trip_id == st.trip_id)
                .map(|o| o.stop_sequence);
            let (first, last) = seqs.fold((i32::MAX, i32::MIN), |(lo, hi), s| {
                (lo.min(s), hi.max(s))
            });
            if f.exclude_first == Some(true) && st.stop_sequence == first {
                return false;
            }
            if f.exclude_last == Some(true) && st.stop_sequence == last {
                return false;
            }
        }
        true
    }

    pub(crate) fn trip_stop_time_matches(st: &StopTime, f: &TripStopTimeFilter) -> bool {
        let Some(t) = Self::stop_time_seconds(st) else {
            return f.start.is_none() && f.end.is_none();
        };
        f.start.is_none_or(|s| t >= s.seconds()) && f.end.is_none_or(|e| t <= e.seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekday_calendar() -> FinderData {
        FinderData {
            calendars: vec![Calendar {
                id: 1,
                service_id: "WKDY".into(),
                monday: true,
                tuesday: true,
                wednesday: true,
                thursday: true,
                friday: true,
                start_date: d(2018, 1, 1),
                end_date: d(2018, 12, 31),
                ..Default::default()
            }],
            calendar_dates: vec![
                CalendarDate {
                    id: 1,
                    service_id: 1,
                    date: d(2018, 7, 4),
                    exception_type: 2,
                },
                CalendarDate {
                    id: 2,
                    service_id: 1,
                    date: d(2018, 7, 7),
                    exception_type: 1,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn calendar_weekdays_and_exceptions() {
        let data = weekday_calendar();
        assert!(data.calendar_active(1, d(2018, 5, 30)));
        assert!(!data.calendar_active(1, d(2018, 6, 2)));
        assert!(!data.calendar_active(1, d(2018, 7, 4)));
        assert!(data.calendar_active(1, d(2018, 7, 7)));
        assert!(!data.calendar_active(1, d(2019, 1, 2)));
        assert!(!data.calendar_active(99, d(2018, 5, 30)));
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(search_hit(&Some("ashby".into()), ["Ashby Station"]));
        assert!(search_hit(&Some("  ".into()), ["anything"]));
        assert!(!search_hit(&Some("fruitvale".into()), ["Ashby Station"]));
    }

    #[test]
    fn stop_time_window_is_half_open() {
        let data = FinderData::default();
        let st = StopTime {
            departure_time: Some(WideTime::from_seconds(3600).unwrap()),
            ..Default::default()
        };
        let window = |start, end| StopTimeFilter {
            start_time: Some(start),
            end_time: Some(end),
            ..Default::default()
        };
        assert!(data.stop_time_matches(&st, &window(3600, 3601)));
        assert!(!data.stop_time_matches(&st, &window(0, 3600)));
        assert!(!data.stop_time_matches(&StopTime::default(), &window(0, 3600)));
    }
}
