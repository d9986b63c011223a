//! HTTP surface: the natural-language query endpoint plus plain task CRUD

pub mod server;

pub use server::{router, start_server, AppState};
