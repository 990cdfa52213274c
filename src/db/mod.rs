pub mod candidates;
pub mod connection;
pub mod needs;
pub mod records;

pub use connection::{init_db, Database};
