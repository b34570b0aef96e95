//! # mpq-native - MPQ decoding engine
//!
//! A pure Rust decoder for MPQ (Mo'PaQ) archives exposing a status-code
//! call surface: archives are addressed by integer handles, every call
//! returns an `i32` status and results are written to out-parameters.
//!
//! The engine owns everything below the file level:
//!
//! - Header location, including archives embedded at an offset in a host file
//! - Hash and block table decryption and name lookup
//! - Sector offset tables, per-sector decryption and decompression
//! - File names from the `(listfile)`
//!
//! ## Example
//!
//! ```no_run
//! use mpq_native::{AUTO_DETECT_OFFSET, ArchiveField, Engine, status};
//! use std::path::Path;
//!
//! let mut engine = Engine::new();
//! assert_eq!(engine.init(), status::OK);
//!
//! let mut handle = 0;
//! let code = engine.archive_open(Path::new("patch.mpq"), AUTO_DETECT_OFFSET, &mut handle);
//! if code == status::OK {
//!     let mut files = 0;
//!     engine.archive_info(handle, ArchiveField::Files, &mut files);
//!     engine.archive_close(handle);
//! }
//! engine.shutdown();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod archive;
pub mod compression;
pub mod config;
pub mod crypto;
mod engine;
pub mod error;
pub mod header;
mod info;
pub mod listfile;
pub mod status;
pub mod tables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::EngineConfig;
pub use engine::{AUTO_DETECT_OFFSET, ArchiveHandle, Engine};
pub use error::{Error, Result};
pub use info::{ArchiveField, BlockField, FileField};
