//! Streaming reads over generated archives

pub mod reader;
