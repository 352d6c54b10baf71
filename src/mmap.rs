//! Growable memory-mapped file handle: lifecycle and resize engine.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;

use crate::errors::{MappedFileError, Result};
use crate::options::{MapFlags, OpenMode, Sharing, SizePolicy};
use crate::region::MappedRegion;
use crate::utils::{align_up, aligned_mapping_size, page_size};
use crate::arch::MAX_MAPPING_SIZE;

/// Default permission bits for files created without an explicit mode.
pub const DEFAULT_PERMISSIONS: u32 = 0o644;

pub(crate) struct Inner {
    pub(crate) path: PathBuf,
    pub(crate) mode: OpenMode,
    pub(crate) flags: MapFlags,
    pub(crate) size_policy: SizePolicy,
    pub(crate) state: RwLock<State>,
}

/// Everything that changes after open, guarded by one lock.
pub(crate) struct State {
    pub(crate) file: Option<File>,
    pub(crate) region: Option<MappedRegion>,
    pub(crate) cursor: u64,
}

impl State {
    pub(crate) fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(MappedFileError::Closed)
    }

    /// Current mapped length; zero while unmapped.
    pub(crate) fn len(&self) -> u64 {
        self.region.as_ref().map_or(0, MappedRegion::len)
    }

    /// Refuse to touch `[offset, offset + len)` when the file no longer backs
    /// it, which happens if someone truncates the file behind our back.
    ///
    /// The length is sampled with `fstat` before the copy. A truncation that
    /// lands between this check and the copy still raises SIGBUS.
    pub(crate) fn ensure_backed(&self, offset: u64, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let on_disk = self.file()?.metadata()?.len();
        let backed = align_up(on_disk, page_size() as u64).unwrap_or(u64::MAX);
        let end = offset.saturating_add(len as u64).min(self.len());
        if end > backed {
            return Err(MappedFileError::PageFault {
                offset,
                len: len as u64,
            });
        }
        Ok(())
    }
}

/// Memory-mapped file that grows and shrinks with its contents.
///
/// A handle owns one open file and at most one mapping over it. Sequential
/// I/O goes through a shared cursor; positional I/O leaves the cursor alone.
/// Writes past the end grow the file and the mapping to the page-aligned
/// ceiling of the required length.
///
/// # Examples
///
/// ```no_run
/// use mapped_file::{MappedFile, OpenMode};
///
/// let file = MappedFile::create("data.bin", 0, OpenMode::read_write().create(true), 0o644)?;
/// file.write(b"Hello World!")?;
/// file.sync()?;
/// file.close()?;
///
/// let file = MappedFile::open("data.bin", OpenMode::read_only(), 0o644)?;
/// let mut buf = [0u8; 12];
/// file.read(&mut buf)?;
/// assert_eq!(&buf, b"Hello World!");
/// # Ok::<(), mapped_file::MappedFileError>(())
/// ```
///
/// Cloning this struct is cheap; it clones an Arc to the inner state, and all
/// clones share the cursor and the mapping.
#[derive(Clone)]
pub struct MappedFile {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("MappedFile")
            .field("path", &self.inner.path)
            .field("mode", &self.inner.mode)
            .field("len", &state.len())
            .field("cursor", &state.cursor)
            .field("closed", &state.file.is_none())
            .finish()
    }
}

impl MappedFile {
    /// Open (or create, per `mode`) the file and map its current contents.
    /// An empty file starts unmapped until the first write.
    ///
    /// Shared writable handles extend a file whose length is not page-aligned
    /// to the next page boundary; read-only and private handles map the exact
    /// length and leave the file untouched.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Io` if the file cannot be opened or sized.
    /// Returns `MappedFileError::Map` if the mapping cannot be established.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, permissions: u32) -> Result<Self> {
        Self::builder(path).mode(mode).permissions(permissions).open()
    }

    /// Open (or create, per `mode`) the file, size it to `size` rounded up to
    /// whole pages (zero becomes one page), and map it.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` if `mode` is read-only.
    /// Returns `MappedFileError::Io` if the file cannot be opened or sized.
    /// Returns `MappedFileError::Map` if the size exceeds the architecture
    /// maximum or the mapping cannot be established.
    pub fn create<P: AsRef<Path>>(path: P, size: u64, mode: OpenMode, permissions: u32) -> Result<Self> {
        Self::builder(path)
            .mode(mode)
            .permissions(permissions)
            .size(size)
            .open()
    }

    /// Create a builder for advanced construction options.
    pub fn builder<P: AsRef<Path>>(path: P) -> MappedFileBuilder {
        MappedFileBuilder {
            path: path.as_ref().to_path_buf(),
            mode: OpenMode::read_write().create(true),
            permissions: DEFAULT_PERMISSIONS,
            size: None,
            flags: MapFlags::default(),
            size_policy: SizePolicy::default(),
        }
    }

    /// Unmap the region and close the file. Every later call on this handle,
    /// or on any clone of it, fails with `MappedFileError::Closed`.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if already closed.
    /// Returns `MappedFileError::Io` if closing the descriptor fails.
    pub fn close(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        let file = state.file.take().ok_or(MappedFileError::Closed)?;
        state.region = None;
        state.cursor = 0;
        log::debug!("closing {}", self.inner.path.display());
        close_file(file)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.read().file.is_none()
    }

    /// Name of the file as given at open time.
    #[must_use]
    pub fn name(&self) -> &Path {
        &self.inner.path
    }

    /// Open mode fixed at construction.
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.inner.mode
    }

    /// Current mapped length in bytes; zero while unmapped.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if the handle is closed.
    pub fn size(&self) -> Result<u64> {
        let state = self.inner.state.read();
        state.file()?;
        Ok(state.len())
    }

    /// Current cursor position used by sequential reads and writes.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if the handle is closed.
    pub fn offset(&self) -> Result<u64> {
        let state = self.inner.state.read();
        state.file()?;
        Ok(state.cursor)
    }

    /// Change the size of the file and its mapping. The cursor is not moved,
    /// even when it ends up past the new end.
    ///
    /// Zero unmaps the region and empties the file. Any other size is
    /// rounded up to whole pages.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` for read-only or private
    /// handles.
    /// Returns `MappedFileError::Map` if the size exceeds the architecture
    /// maximum or the remap fails; the old mapping is left intact.
    /// Returns `MappedFileError::Io` if the file cannot be resized.
    pub fn truncate(&self, size: u64) -> Result<()> {
        let mut state = self.inner.state.write();
        self.resize_locked(&mut state, size)
    }

    /// Resize engine. Callers hold the exclusive lock.
    pub(crate) fn resize_locked(&self, state: &mut State, requested: u64) -> Result<()> {
        let State { file, region, .. } = state;
        let file = file.as_ref().ok_or(MappedFileError::Closed)?;
        if !self.inner.mode.is_writable() {
            return Err(MappedFileError::InvalidOperation("resize requires write access"));
        }
        if self.inner.flags.sharing == Sharing::Private {
            return Err(MappedFileError::InvalidOperation("private mappings cannot be resized"));
        }

        if requested == 0 {
            // Shrink the file first: if that fails nothing has changed yet.
            file.set_len(0)?;
            if region.take().is_some() {
                log::debug!("unmapped {} on truncate to zero", self.inner.path.display());
            }
            return Ok(());
        }

        let target = aligned_mapping_size(requested, self.inner.size_policy)?;
        if let Some(existing) = region.as_mut() {
            return existing.resize(file, target);
        }

        let previous = file.metadata()?.len();
        file.set_len(target)?;
        match MappedRegion::map(file, target, true, self.inner.flags) {
            Ok(fresh) => {
                *region = Some(fresh);
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = file.set_len(previous) {
                    log::warn!("failed to restore file length {previous}: {rollback}");
                }
                Err(err)
            }
        }
    }
}

/// Builder for [`MappedFile`] with open, mapping, and size options.
#[derive(Debug, Clone)]
pub struct MappedFileBuilder {
    path: PathBuf,
    mode: OpenMode,
    permissions: u32,
    size: Option<u64>,
    flags: MapFlags,
    size_policy: SizePolicy,
}

impl MappedFileBuilder {
    /// Set the open mode (default: read-write, create).
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set permission bits used when the file is created (default: 0o644).
    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Size the file to `size` (page-aligned) and map it immediately, instead
    /// of mapping the existing contents.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the mapping flags.
    pub fn map_flags(mut self, flags: MapFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the policy for sizes above the architecture maximum.
    pub fn size_policy(mut self, policy: SizePolicy) -> Self {
        self.size_policy = policy;
        self
    }

    /// Open the file and establish the initial mapping.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` if a size is requested on
    /// a read-only mode or with a private mapping, or if a writable private
    /// mapping is requested over an empty file.
    /// Returns `MappedFileError::Io` if the file cannot be opened or sized.
    /// Returns `MappedFileError::Map` if the mapping cannot be established.
    pub fn open(self) -> Result<MappedFile> {
        let writable = self.mode.is_writable();
        let private = self.flags.sharing == Sharing::Private;
        if self.size.is_some() && !writable {
            return Err(MappedFileError::InvalidOperation("creating a mapping requires write access"));
        }
        if self.size.is_some() && private {
            return Err(MappedFileError::InvalidOperation("private mappings cannot be resized"));
        }
        // Any early return below drops `file`, closing the descriptor.
        let file = self.mode.to_open_options(self.permissions).open(&self.path)?;

        // Only shared writable handles may change the file's length. Private
        // and read-only handles map exactly what is on disk.
        let sizes_file = writable && !private;
        let target = match self.size {
            Some(requested) => Some(aligned_mapping_size(requested, self.size_policy)?),
            None => {
                let on_disk = file.metadata()?.len();
                if on_disk == 0 {
                    if writable && private {
                        return Err(MappedFileError::InvalidOperation(
                            "private mapping of an empty file can never be written",
                        ));
                    }
                    None
                } else if sizes_file {
                    Some(aligned_mapping_size(on_disk, self.size_policy)?)
                } else if on_disk > MAX_MAPPING_SIZE {
                    return Err(MappedFileError::Map(format!(
                        "file size {on_disk} exceeds maximum mapping size {MAX_MAPPING_SIZE}"
                    )));
                } else {
                    Some(on_disk)
                }
            }
        };

        let region = match target {
            Some(len) => {
                if sizes_file && file.metadata()?.len() != len {
                    file.set_len(len)?;
                }
                Some(MappedRegion::map(&file, len, writable, self.flags)?)
            }
            None => None,
        };

        log::debug!(
            "opened {} ({} bytes mapped, mode={:?})",
            self.path.display(),
            region.as_ref().map_or(0, MappedRegion::len),
            self.mode
        );

        let inner = Inner {
            path: self.path,
            mode: self.mode,
            flags: self.flags,
            size_policy: self.size_policy,
            state: RwLock::new(State {
                file: Some(file),
                region,
                cursor: 0,
            }),
        };
        Ok(MappedFile { inner: Arc::new(inner) })
    }
}

#[cfg(unix)]
fn close_file(file: File) -> Result<()> {
    use std::os::unix::io::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `fd` was just released by `into_raw_fd`, so we are its only owner.
    if unsafe { libc::close(fd) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(unix))]
fn close_file(file: File) -> Result<()> {
    drop(file);
    Ok(())
}
