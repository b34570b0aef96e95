//! Engine calls against generated archives

pub mod files;
