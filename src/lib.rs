pub mod config;
pub mod logging;
pub mod probe;
pub mod services;
pub mod snapshot;
pub mod store;
pub mod version;
pub mod web;
