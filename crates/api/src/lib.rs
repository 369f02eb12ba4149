//! Static fixture server: serves a directory over HTTP for browser and
//! client tests.

pub mod app;
pub mod config;
pub mod server;

pub use config::FixtureConfig;
pub use server::FixtureServer;
