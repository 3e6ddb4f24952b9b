// Public API for the word service binary, integration tests and embedding clients

pub mod api;
pub mod offline;
pub mod protocol;
pub mod session;
pub mod store;
pub mod types;
pub mod words;
