//! HTTP API - routes, the analyze handler and status endpoints

pub mod handlers;
pub mod routes;
pub mod status;
