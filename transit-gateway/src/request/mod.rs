//! Request scaffolding: context, caller identity, metering and argument
//! normalization.

mod auth;
mod context;
mod error;
mod input;
mod meter;

pub use auth::{ROLE_ADMIN, ROLE_ANON, ROLE_USER, User};
pub use context::{RequestContext, Services};
pub use error::{FieldResult, ResolverError};
pub use input::{
    check_bbox, check_cursor, check_float, check_limit, check_point_radius, check_radius,
    parse_cursor,
};
pub use meter::{ApiMeter, MemoryMeter, MeterEvent};
