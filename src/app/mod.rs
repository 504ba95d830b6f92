// Application layer: the HTTP surface in front of the menu engine.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, AppState};
