//! Transit data query gateway.
//!
//! Answers nested selections over a GTFS warehouse. Every child field is
//! fetched through per-request batching loaders, and stop-time results are
//! overlaid with GTFS-RT trip updates, alerts and vehicle positions.

pub mod config;
pub mod domain;
pub mod finder;
pub mod loader;
pub mod realtime;
pub mod request;
pub mod resolvers;
pub mod service_time;
pub mod web;
