//! Sighting map server
//!
//! Serves the scanner's sightings, stops, gyms and scanned cells as JSON,
//! plus a distance-sorted proximity listing for mobile clients.

pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod proximity;
pub mod server;
