//! Library half of the `hustle` driver: exposed so integration tests can
//! drive [`engine::Engine`] directly, without going through the CLI
//! subprocess, for scenarios the CLI itself has no surface for (bulk
//! loading a table ahead of a query).

pub mod cli;
pub mod context;
pub mod engine;
pub mod output;
pub mod schema_spec;
