//! Time handling around stop-time queries.
//!
//! Every stop-time question is asked in the stop's own timezone: "now"
//! comes from the request [`Clock`], dates are resolved locally, and a
//! calendar date is expanded into the service days that can serve it.

mod clock;
mod relative;
mod split;
mod window;
mod zone;

pub use clock::{Clock, MockClock, RealClock};
pub use relative::{parse_relative_date, resolve_relative_date};
pub use split::{
    DEFAULT_LOOKBEHIND, LocalNow, MAX_WIDE_TIME, normalize_stop_time_filter, split_service_days,
};
pub use window::{ServiceWindow, ServiceWindowCache, derive_service_window};
pub use zone::{local_now, parse_timezone};
