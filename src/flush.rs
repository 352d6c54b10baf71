//! Flushing dirty pages back to the file.

use crate::errors::Result;
use crate::mmap::MappedFile;

impl MappedFile {
    /// Synchronously write every dirty page of the mapping back to the file.
    /// A no-op while unmapped or for read-only mappings.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if the handle is closed.
    /// Returns `MappedFileError::Map` if `msync` fails.
    pub fn sync(&self) -> Result<()> {
        let state = self.inner.state.read();
        state.file()?;
        match &state.region {
            Some(region) => region.flush(),
            None => Ok(()),
        }
    }

    /// Synchronously write back the pages covering `[offset, offset + len)`.
    /// The range is clipped to the mapping.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if the handle is closed.
    /// Returns `MappedFileError::Map` if `msync` fails.
    pub fn sync_range(&self, offset: u64, len: usize) -> Result<()> {
        let state = self.inner.state.read();
        state.file()?;
        match &state.region {
            Some(region) => region.flush_range(offset, len),
            None => Ok(()),
        }
    }
}
