//! # mpq-stream - streaming reads from MPQ archives
//!
//! Random and sequential access to files packed in MPQ archives without
//! loading whole archives into memory. Decoding is done by a
//! [`NativeEngine`], by default the bundled [`mpq_native::Engine`]; this
//! crate turns its status-code call surface into typed values with owned
//! handles.
//!
//! - [`Library`] initializes the engine once and shuts it down at the end
//! - [`Archive`] opens an archive, possibly embedded at an offset, and
//!   resolves files by name or index
//! - [`FileEntry`] holds a file's metadata and reads it whole
//! - [`BlockReader`] streams a file block by block, with seeking
//!
//! ## Example
//!
//! ```no_run
//! use mpq_stream::{Archive, Library, Offset};
//! use std::io::{Read, Seek, SeekFrom};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let library = Library::init()?;
//! let archive = Archive::open(&library, "patch.mpq", Offset::Detect)?;
//!
//! let entry = archive.lookup("Interface\\FrameXML\\UIParent.lua")?;
//! println!("{}: {} bytes", entry.name(), entry.info().unpacked_size);
//!
//! let mut stream = entry.open_stream()?;
//! stream.seek(SeekFrom::Start(128))?;
//! let mut header = [0u8; 64];
//! stream.read_exact(&mut header)?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod archive;
pub mod entry;
pub mod error;
pub mod handle;
pub mod library;
pub mod native;
pub mod reader;

pub use archive::{Archive, ArchiveInfo, Lookup, Offset};
pub use entry::{FileEntry, FileFlags, FileInfo};
pub use error::{Error, IoOp, Precondition, Result, check};
pub use handle::ResourceHandle;
pub use library::Library;
pub use native::NativeEngine;
pub use reader::BlockReader;

pub use mpq_native::{ArchiveField, ArchiveHandle, BlockField, Engine, EngineConfig, FileField};
