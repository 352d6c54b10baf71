//! Sequential and positional I/O over the mapped bytes.

use std::io;

use crate::errors::{MappedFileError, Result};
use crate::mmap::{MappedFile, State};

/// Reference point for [`MappedFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Relative to the start of the file.
    Start,
    /// Relative to the current cursor.
    Current,
    /// Relative to the end of the mapping.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = MappedFileError;

    /// Accepts the classic `SEEK_SET`, `SEEK_CUR`, `SEEK_END` values.
    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            _ => Err(MappedFileError::InvalidOperation("invalid whence value")),
        }
    }
}

impl MappedFile {
    /// Read into `buf` from the cursor and advance it by the bytes copied.
    /// Near the end the read is short; at or past the end it fails with
    /// `EndOfFile { read: 0 }`. Never grows the file.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::EndOfFile` when the cursor is at or past the end.
    /// Returns `MappedFileError::InvalidOperation` on write-only handles.
    /// Returns `MappedFileError::PageFault` if the file was shrunk externally.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_readable()?;
        let mut state = self.inner.state.write();
        state.file()?;
        let cursor = state.cursor;
        if cursor >= state.len() {
            return Err(MappedFileError::EndOfFile { read: 0 });
        }
        let n = read_locked(&state, cursor, buf)?;
        state.cursor += n as u64;
        Ok(n)
    }

    /// Read into `buf` starting at `offset` without touching the cursor.
    /// When fewer than `buf.len()` bytes remain, the available bytes are still
    /// copied and `EndOfFile { read }` reports how many.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::EndOfFile` if the read comes up short.
    /// Returns `MappedFileError::InvalidOperation` on write-only handles.
    /// Returns `MappedFileError::PageFault` if the file was shrunk externally.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_readable()?;
        let state = self.inner.state.read();
        state.file()?;
        if offset >= state.len() {
            return Err(MappedFileError::EndOfFile { read: 0 });
        }
        let n = read_locked(&state, offset, buf)?;
        if n < buf.len() {
            return Err(MappedFileError::EndOfFile { read: n });
        }
        Ok(n)
    }

    /// Write `data` at the cursor (or at the end in append mode), growing the
    /// file when needed, and advance the cursor by the bytes written.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` on read-only handles.
    /// Returns `MappedFileError::OutOfRange` if the cursor sits past the end
    /// after a shrinking `truncate`.
    /// Returns `MappedFileError::ShortWrite` if the grown mapping could not
    /// hold all of `data`; the cursor still advances by what was written.
    /// Returns `MappedFileError::Map` or `MappedFileError::Io` if growing fails.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.ensure_writable()?;
        let mut state = self.inner.state.write();
        state.file()?;
        if self.inner.mode.is_append() {
            state.cursor = state.len();
        }
        let cursor = state.cursor;
        if cursor > state.len() {
            return Err(MappedFileError::OutOfRange {
                position: cursor,
                size: state.len(),
            });
        }
        let written = self.write_locked(&mut state, cursor, data)?;
        state.cursor += written as u64;
        short_write(written, data.len())
    }

    /// Write `data` at `offset` without touching the cursor, growing the file
    /// to cover `offset + data.len()` when needed.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::InvalidOperation` on append-mode or read-only
    /// handles; nothing is written.
    /// Returns `MappedFileError::ShortWrite` if the grown mapping could not
    /// hold all of `data`.
    /// Returns `MappedFileError::Map` or `MappedFileError::Io` if growing fails.
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize> {
        if self.inner.mode.is_append() {
            return Err(MappedFileError::InvalidOperation(
                "positional write on a handle opened in append mode",
            ));
        }
        self.ensure_writable()?;
        let mut state = self.inner.state.write();
        state.file()?;
        let written = self.write_locked(&mut state, offset, data)?;
        short_write(written, data.len())
    }

    /// Move the cursor to `offset` relative to `whence` and return the new
    /// absolute position. Seeking past the end is not allowed; only writes
    /// grow the file.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::NegativePosition` if the result is below zero.
    /// Returns `MappedFileError::OutOfRange` if the result is past the end.
    pub fn seek(&self, offset: i64, whence: Whence) -> Result<u64> {
        let mut state = self.inner.state.write();
        state.file()?;
        let len = state.len();
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => i128::from(state.cursor),
            Whence::End => i128::from(len),
        };
        let absolute = base + i128::from(offset);
        if absolute < 0 {
            return Err(MappedFileError::NegativePosition(absolute));
        }
        let position = u64::try_from(absolute).unwrap_or(u64::MAX);
        if position > len {
            return Err(MappedFileError::OutOfRange { position, size: len });
        }
        state.cursor = position;
        Ok(position)
    }

    fn ensure_readable(&self) -> Result<()> {
        if !self.inner.mode.is_readable() {
            return Err(MappedFileError::InvalidOperation("handle not opened for reading"));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if !self.inner.mode.is_writable() {
            return Err(MappedFileError::InvalidOperation("handle not opened for writing"));
        }
        Ok(())
    }

    /// Grow if `[offset, offset + data.len())` runs past the end, then copy.
    /// Returns the bytes written, which is short only when the size policy
    /// clamped the growth.
    fn write_locked(&self, state: &mut State, offset: u64, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| MappedFileError::Map(format!("write end overflows at offset {offset}")))?;
        if end > state.len() {
            self.resize_locked(state, end)?;
        }
        state.ensure_backed(offset, data.len())?;
        let sync = self.inner.mode.is_sync();
        let Some(region) = state.region.as_mut() else {
            return Ok(0);
        };
        let written = region.write_at(offset, data)?;
        if sync {
            region.flush_range(offset, written)?;
        }
        Ok(written)
    }
}

fn read_locked(state: &State, offset: u64, buf: &mut [u8]) -> Result<usize> {
    state.ensure_backed(offset, buf.len())?;
    Ok(state
        .region
        .as_ref()
        .map_or(0, |region| region.read_at(offset, buf)))
}

fn short_write(written: usize, requested: usize) -> Result<usize> {
    if written < requested {
        return Err(MappedFileError::ShortWrite { written, requested });
    }
    Ok(written)
}

impl io::Read for &MappedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match MappedFile::read(*self, buf) {
            Ok(n) | Err(MappedFileError::EndOfFile { read: n }) => Ok(n),
            Err(err) => Err(err.into()),
        }
    }
}

impl io::Write for &MappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match MappedFile::write(*self, buf) {
            Ok(n) => Ok(n),
            Err(MappedFileError::ShortWrite { written, .. }) if written > 0 => Ok(written),
            Err(err) => Err(err.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync().map_err(Into::into)
    }
}

impl io::Seek for &MappedFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => {
                let offset = i64::try_from(n).map_err(|_| {
                    io::Error::from(MappedFileError::OutOfRange {
                        position: n,
                        size: self.size().unwrap_or(0),
                    })
                })?;
                (offset, Whence::Start)
            }
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        MappedFile::seek(*self, offset, whence).map_err(Into::into)
    }
}

impl io::Read for MappedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl io::Write for MappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}

impl io::Seek for MappedFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        io::Seek::seek(&mut &*self, pos)
    }
}
