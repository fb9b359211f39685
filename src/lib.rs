// Library exports for Nexio
// The binary, integration tests and the client all go through these modules.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod storage;
