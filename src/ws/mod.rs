//! Observer WebSocket transport

pub mod dispatch;
pub mod handler;
pub mod protocol;
pub mod registry;

pub use handler::ws_handler;
