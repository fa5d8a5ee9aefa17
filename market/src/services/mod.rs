//! Pipeline services
//!
//! Triggers and the scheduler feed the queue; the ingestion service drains it
//! into storage; the query service reads it back out.

pub mod config_client;
pub mod ingestion;
pub mod persistence;
pub mod query;
pub mod retry;
pub mod scheduler;
pub mod trigger;

pub use config_client::*;
pub use ingestion::*;
pub use persistence::*;
pub use query::*;
pub use retry::*;
pub use scheduler::*;
pub use trigger::*;
