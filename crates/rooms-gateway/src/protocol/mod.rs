//! Gateway protocol
//!
//! JSON frames exchanged over the WebSocket, tagged by `op`.

mod frames;

pub use frames::{ClientFrame, ServerFrame};
