//! Connection management
//!
//! The connections this process holds open, and their outbound channels.

mod connection;
mod manager;

pub use connection::Connection;
pub use manager::ConnectionManager;
