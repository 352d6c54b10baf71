//! Open-mode and mapping configuration.

use std::fs::OpenOptions;

use crate::errors::{MappedFileError, Result};

/// Descriptor access requested at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only handle; writes and resizes fail.
    ReadOnly,
    /// Write-only handle; reads fail.
    WriteOnly,
    /// Read-write handle.
    ReadWrite,
}

/// File-open intent, fixed for the lifetime of a handle.
///
/// # Examples
///
/// ```
/// use mapped_file::OpenMode;
///
/// let mode = OpenMode::read_write().create(true).append(true);
/// assert!(mode.is_writable());
/// assert!(mode.is_append());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    access: Access,
    append: bool,
    create: bool,
    create_new: bool,
    truncate: bool,
    sync: bool,
}

impl OpenMode {
    /// Mode with the given access and no other flags.
    #[must_use]
    pub const fn new(access: Access) -> Self {
        Self {
            access,
            append: false,
            create: false,
            create_new: false,
            truncate: false,
            sync: false,
        }
    }

    /// Read-only mode.
    #[must_use]
    pub const fn read_only() -> Self {
        Self::new(Access::ReadOnly)
    }

    /// Write-only mode.
    #[must_use]
    pub const fn write_only() -> Self {
        Self::new(Access::WriteOnly)
    }

    /// Read-write mode.
    #[must_use]
    pub const fn read_write() -> Self {
        Self::new(Access::ReadWrite)
    }

    /// Every sequential write lands at the current end of the file.
    #[must_use]
    pub const fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Create the file if it does not exist.
    #[must_use]
    pub const fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Create the file, failing if it already exists.
    #[must_use]
    pub const fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    /// Truncate the file to zero length on open.
    #[must_use]
    pub const fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Open for synchronous I/O; every write is flushed before it returns.
    #[must_use]
    pub const fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Parse raw POSIX `O_*` open flags.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` if the access bits are not
    /// one of `O_RDONLY`, `O_WRONLY`, or `O_RDWR`.
    #[cfg(unix)]
    pub fn from_flags(flags: i32) -> Result<Self> {
        let access = match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Access::ReadOnly,
            libc::O_WRONLY => Access::WriteOnly,
            libc::O_RDWR => Access::ReadWrite,
            _ => return Err(MappedFileError::InvalidOperation("invalid access mode in open flags")),
        };
        let has = |flag: i32| flags & flag == flag;
        Ok(Self::new(access)
            .append(has(libc::O_APPEND))
            .create(has(libc::O_CREAT))
            .create_new(has(libc::O_CREAT | libc::O_EXCL))
            .truncate(has(libc::O_TRUNC))
            .sync(has(libc::O_SYNC)))
    }

    /// Access requested at open time.
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Whether reads are permitted.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.access != Access::WriteOnly
    }

    /// Whether writes and resizes are permitted.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.access != Access::ReadOnly
    }

    /// Whether sequential writes are forced to the end of the file.
    #[must_use]
    pub fn is_append(&self) -> bool {
        self.append
    }

    /// Whether writes are flushed before returning.
    #[must_use]
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    pub(crate) fn to_open_options(self, permissions: u32) -> OpenOptions {
        let mut opts = OpenOptions::new();
        // A writable shared mapping needs a readable descriptor, so write-only
        // handles still open read-write underneath.
        opts.read(true)
            .write(self.is_writable())
            .create(self.create)
            .create_new(self.create_new)
            .truncate(self.truncate);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(permissions);
            if self.sync {
                opts.custom_flags(libc::O_SYNC);
            }
        }
        #[cfg(not(unix))]
        let _ = permissions;
        opts
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::read_only()
    }
}

/// Whether changes are written through to the file or kept private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sharing {
    /// Changes are visible to other mappings and reach the file.
    #[default]
    Shared,
    /// Copy-on-write: changes stay in this mapping. Private mappings cover
    /// the file's exact length, never change it, and cannot be resized.
    Private,
}

/// Mapping flags applied every time a region is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapFlags {
    /// Shared or private mapping.
    pub sharing: Sharing,
    /// Prefault page tables when mapping (`MAP_POPULATE`).
    pub populate: bool,
    /// Lock the mapped pages in RAM (`mlock`). Usually needs privileges or a
    /// raised `RLIMIT_MEMLOCK`.
    pub lock: bool,
}

/// What to do when a requested size exceeds the architecture maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePolicy {
    /// Fail the operation with `MappedFileError::Map`.
    #[default]
    Reject,
    /// Clamp to the largest page-aligned size below the maximum. Writes that
    /// no longer fit report `MappedFileError::ShortWrite`.
    Clamp,
}
