//! # mapped-file: growable memory-mapped files for Rust
//!
//! This crate maps a file into memory and lets you treat it like an ordinary
//! file: sequential reads and writes through a cursor, positional reads and
//! writes, and seeking. Writes past the end grow the file and the mapping
//! together, always in whole pages and never beyond the target architecture's
//! mapping limit.
//!
//! ## Features
//!
//! - **File-like API**: `read`/`write`/`seek` plus `read_at`/`write_at`, and
//!   `std::io::{Read, Write, Seek}` implementations
//! - **Transparent growth**: remaps in place (or relocates) on Linux via
//!   `mremap`, remaps by swap elsewhere
//! - **Thread-safe**: one reader/writer lock guards the mapping and cursor
//! - **Checked copies**: ranges no longer backed by the file at the time of
//!   the copy are refused with an error instead of faulting
//!
//! ## Quick Start
//!
//! ```no_run
//! use mapped_file::{MappedFile, OpenMode, Whence};
//!
//! let file = MappedFile::create("data.bin", 0, OpenMode::read_write().create(true), 0o644)?;
//! file.write(b"Hello, mmap!")?;
//! file.seek(0, Whence::Start)?;
//!
//! let mut buf = [0u8; 12];
//! file.read(&mut buf)?;
//! file.sync()?;
//! file.close()?;
//! # Ok::<(), mapped_file::MappedFileError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types for all operations
//! - [`arch`]: Per-architecture mapping limits
//! - [`utils`]: Page size and alignment helpers
//! - [`options`]: Open modes and mapping flags
//! - [`mmap`]: Core `MappedFile` lifecycle and resize engine
//!
//! ## Feature Flags
//!
//! - `advise` (default): Enables [`MappedFile::advise`]

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

pub mod arch;
pub mod errors;
pub mod utils;
pub mod options;
pub mod mmap;
mod region;
mod io;
mod flush;
#[cfg(feature = "advise")]
mod advise;

pub use errors::{MappedFileError, Result};
pub use mmap::{MappedFile, MappedFileBuilder, DEFAULT_PERMISSIONS};
pub use options::{Access, MapFlags, OpenMode, Sharing, SizePolicy};
pub use io::Whence;
#[cfg(feature = "advise")]
pub use advise::Advice;
