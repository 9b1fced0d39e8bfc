//! Bus trip planner server.
//!
//! Finds stops near a location, measures rides along bus routes, and ranks
//! the buses that connect two places. Distances come from a road-routing
//! service, with great-circle distance as the fallback.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod distance;
pub mod domain;
pub mod journey;
pub mod retry;
pub mod store;
pub mod trip;
pub mod web;
