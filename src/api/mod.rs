//! HTTP layer: provider callbacks, intake, keyword reads, health and metrics.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
