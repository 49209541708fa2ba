//! Per-request batching and caching of finder lookups.
//!
//! Resolvers never call by-id or by-parameter finder methods directly;
//! they go through a [`Loaders`] set so that sibling resolutions over the
//! same request coalesce into a handful of batch calls.

mod batch;
mod cancel;
mod group;
mod params;
mod set;

pub use batch::{BatchResult, Loader, LoaderError, LoaderOptions};
pub use cancel::{CancelGuard, CancelSignal};
pub use group::{DEFAULT_GROUP_LIMIT, group_limit, param_group_query};
pub use params::{FilterKey, Param};
pub use set::{LoaderSettings, Loaders};
