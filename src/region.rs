//! Bounded view over a live mapping.
//!
//! `MappedRegion` owns the memmap2 mapping and only hands out copies of its
//! bytes, so no slice into the mapping can outlive a resize. When the mapping
//! moves, the whole region is rebuilt from the new address and length.

use std::fs::File;
use std::io;

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::errors::{MappedFileError, Result};
use crate::options::{MapFlags, Sharing};
use crate::utils::clipped_range;

enum MapVariant {
    Ro(Mmap),
    Rw(MmapMut),
}

pub(crate) struct MappedRegion {
    map: MapVariant,
    flags: MapFlags,
}

fn map_failure(op: &'static str) -> impl FnOnce(io::Error) -> MappedFileError {
    move |err| MappedFileError::Map(format!("{op}: {err}"))
}

fn to_usize(len: u64) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| MappedFileError::Map(format!("length {len} does not fit the address space")))
}

impl MappedRegion {
    /// Map `len` bytes of `file` from offset zero.
    pub(crate) fn map(file: &File, len: u64, writable: bool, flags: MapFlags) -> Result<Self> {
        let mut opts = MmapOptions::new();
        opts.len(to_usize(len)?);
        if flags.populate {
            opts.populate();
        }
        // SAFETY: the file stays open for as long as the mapping lives, and the
        // owning handle keeps the file length equal to the mapping length.
        // External truncation is detected before every copy.
        let map = unsafe {
            if writable {
                let map = match flags.sharing {
                    Sharing::Shared => opts.map_mut(file),
                    Sharing::Private => opts.map_copy(file),
                };
                MapVariant::Rw(map.map_err(map_failure("mmap"))?)
            } else {
                MapVariant::Ro(opts.map(file).map_err(map_failure("mmap"))?)
            }
        };
        let region = Self { map, flags };
        if flags.lock {
            region.lock()?;
        }
        log::debug!("mapped {len} bytes (writable={writable}, flags={flags:?})");
        Ok(region)
    }

    pub(crate) fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn bytes(&self) -> &[u8] {
        match &self.map {
            MapVariant::Ro(m) => m,
            MapVariant::Rw(m) => m,
        }
    }

    /// Copy bytes starting at `offset` into `buf`. Returns the number copied,
    /// which is short when the mapping ends first.
    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize {
        match clipped_range(offset, buf.len(), self.len()) {
            Some((start, end)) => {
                let n = end - start;
                buf[..n].copy_from_slice(&self.bytes()[start..end]);
                n
            }
            None => 0,
        }
    }

    /// Copy `data` into the mapping at `offset`. Returns the number copied,
    /// which is short when the mapping ends first.
    pub(crate) fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        let total = self.len();
        let MapVariant::Rw(map) = &mut self.map else {
            return Err(MappedFileError::InvalidOperation("write to a read-only mapping"));
        };
        match clipped_range(offset, data.len(), total) {
            Some((start, end)) => {
                let n = end - start;
                map[start..end].copy_from_slice(&data[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    /// Synchronously flush every dirty page.
    pub(crate) fn flush(&self) -> Result<()> {
        log::trace!("msync {} bytes", self.len());
        match &self.map {
            MapVariant::Ro(_) => Ok(()),
            MapVariant::Rw(m) => m.flush().map_err(map_failure("msync")),
        }
    }

    /// Synchronously flush the pages covering `[offset, offset + len)`.
    pub(crate) fn flush_range(&self, offset: u64, len: usize) -> Result<()> {
        match (&self.map, clipped_range(offset, len, self.len())) {
            (MapVariant::Rw(m), Some((start, end))) if end > start => {
                m.flush_range(start, end - start).map_err(map_failure("msync"))
            }
            _ => Ok(()),
        }
    }

    #[cfg(all(unix, feature = "advise"))]
    pub(crate) fn advise(&self, advice: i32) -> Result<()> {
        let bytes = self.bytes();
        log::trace!("madvise({advice}) over {} bytes", bytes.len());
        // SAFETY: the address and length describe exactly the live mapping.
        let rc = unsafe { libc::madvise(bytes.as_ptr() as *mut libc::c_void, bytes.len(), advice) };
        if rc != 0 {
            return Err(MappedFileError::Map(format!(
                "madvise: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    #[cfg(unix)]
    fn lock(&self) -> Result<()> {
        let bytes = self.bytes();
        // SAFETY: the address and length describe exactly the live mapping.
        let rc = unsafe { libc::mlock(bytes.as_ptr().cast::<libc::c_void>(), bytes.len()) };
        if rc != 0 {
            return Err(MappedFileError::Map(format!(
                "mlock: {}. This operation typically requires elevated privileges.",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn lock(&self) -> Result<()> {
        Err(MappedFileError::InvalidOperation("page locking is not supported on this platform"))
    }

    /// Resize the mapping and the backing file together to `target` bytes.
    ///
    /// On error the mapping, and as far as the platform allows the file
    /// length, are left as they were.
    pub(crate) fn resize(&mut self, file: &File, target: u64) -> Result<()> {
        let old = self.len();
        if target == old {
            return Ok(());
        }
        if target > old {
            // The file has to reach the new length before the extra pages can
            // be backed.
            file.set_len(target)?;
            if let Err(err) = self.relocate(file, target) {
                if let Err(rollback) = file.set_len(old) {
                    log::warn!("failed to restore file length {old} after remap error: {rollback}");
                }
                return Err(err);
            }
        } else {
            self.relocate(file, target)?;
            if let Err(err) = file.set_len(target) {
                if let Err(rollback) = self.relocate(file, old) {
                    log::warn!("failed to restore mapping length {old} after truncate error: {rollback}");
                }
                return Err(err.into());
            }
        }
        log::debug!("resized mapping {old} -> {target} bytes");
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn relocate(&mut self, _file: &File, new_len: u64) -> Result<()> {
        use memmap2::RemapOptions;

        let new_len = to_usize(new_len)?;
        // SAFETY: callers hold the exclusive lock and no slice into the
        // mapping escapes this type, so moving it cannot leave a dangling
        // view. mremap leaves the old mapping untouched when it fails.
        let remapped = unsafe {
            match &mut self.map {
                MapVariant::Ro(m) => m.remap(new_len, RemapOptions::new().may_move(true)),
                MapVariant::Rw(m) => m.remap(new_len, RemapOptions::new().may_move(true)),
            }
        };
        remapped.map_err(map_failure("mremap"))?;
        if self.flags.lock {
            if let Err(err) = self.lock() {
                log::warn!("remapped region could not be locked: {err}");
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn relocate(&mut self, file: &File, new_len: u64) -> Result<()> {
        // No remap primitive: map the new length first so a failure leaves the
        // current mapping in place, then swap.
        let writable = matches!(self.map, MapVariant::Rw(_));
        let fresh = Self::map(file, new_len, writable, self.flags)?;
        *self = fresh;
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        log::debug!("unmapping {} bytes", self.len());
    }
}
