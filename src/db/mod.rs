//! SQLite attempt store. One worker thread owns the connection; the async
//! repository methods live on [`Database`] and are split by table.

pub mod connection;
pub mod helpers;
mod migrations;
pub mod repositories;


pub use connection::Database;
pub use repositories::attempts::AttemptCounts;
