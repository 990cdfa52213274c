//! Mirror a remote staffing base into SQLite and answer two questions about
//! it: which facilities still have an open staffing need, and which
//! candidates fit each facility's latest need.

pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod outreach;
pub mod replica;
pub mod settings;
pub mod source;
pub mod sync;
pub mod telemetry;

pub use errors::ReplicaError;
pub use replica::Replica;

#[cfg(test)]
mod tests;
