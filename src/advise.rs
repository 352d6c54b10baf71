//! Access-pattern hints for the mapped pages.

use crate::errors::Result;
use crate::mmap::MappedFile;

/// Memory access pattern advice, passed to `madvise` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// Normal access pattern (default).
    Normal,
    /// Random access pattern.
    Random,
    /// Sequential access pattern.
    Sequential,
    /// Will need these pages soon.
    WillNeed,
    /// Won't need these pages soon.
    DontNeed,
    /// Pages can be freed lazily.
    #[cfg(target_os = "linux")]
    Free,
    /// Free the pages and their backing store.
    #[cfg(target_os = "linux")]
    Remove,
    /// Do not inherit the mapping across fork.
    #[cfg(target_os = "linux")]
    DontFork,
    /// Inherit the mapping across fork.
    #[cfg(target_os = "linux")]
    DoFork,
    /// Enable samepage merging.
    #[cfg(target_os = "linux")]
    Mergeable,
    /// Disable samepage merging.
    #[cfg(target_os = "linux")]
    Unmergeable,
    /// Prefer transparent huge pages.
    #[cfg(target_os = "linux")]
    HugePage,
    /// Avoid transparent huge pages.
    #[cfg(target_os = "linux")]
    NoHugePage,
    /// Leave the pages out of core dumps.
    #[cfg(target_os = "linux")]
    DontDump,
    /// Include the pages in core dumps.
    #[cfg(target_os = "linux")]
    DoDump,
}

#[cfg(unix)]
impl Advice {
    fn to_raw(self) -> i32 {
        match self {
            Advice::Normal => libc::MADV_NORMAL,
            Advice::Random => libc::MADV_RANDOM,
            Advice::Sequential => libc::MADV_SEQUENTIAL,
            Advice::WillNeed => libc::MADV_WILLNEED,
            Advice::DontNeed => libc::MADV_DONTNEED,
            #[cfg(target_os = "linux")]
            Advice::Free => libc::MADV_FREE,
            #[cfg(target_os = "linux")]
            Advice::Remove => libc::MADV_REMOVE,
            #[cfg(target_os = "linux")]
            Advice::DontFork => libc::MADV_DONTFORK,
            #[cfg(target_os = "linux")]
            Advice::DoFork => libc::MADV_DOFORK,
            #[cfg(target_os = "linux")]
            Advice::Mergeable => libc::MADV_MERGEABLE,
            #[cfg(target_os = "linux")]
            Advice::Unmergeable => libc::MADV_UNMERGEABLE,
            #[cfg(target_os = "linux")]
            Advice::HugePage => libc::MADV_HUGEPAGE,
            #[cfg(target_os = "linux")]
            Advice::NoHugePage => libc::MADV_NOHUGEPAGE,
            #[cfg(target_os = "linux")]
            Advice::DontDump => libc::MADV_DONTDUMP,
            #[cfg(target_os = "linux")]
            Advice::DoDump => libc::MADV_DODUMP,
        }
    }
}

impl MappedFile {
    /// Advise the OS about expected access patterns for the whole mapping.
    ///
    /// The advice is a hint and may be ignored by the OS. A no-op while
    /// unmapped, and on platforms without `madvise`.
    ///
    /// # Errors
    ///
    /// Returns `MappedFileError::Closed` if the handle is closed.
    /// Returns `MappedFileError::Map` if `madvise` rejects the hint.
    pub fn advise(&self, advice: Advice) -> Result<()> {
        let state = self.inner.state.read();
        state.file()?;
        let Some(region) = &state.region else {
            return Ok(());
        };
        #[cfg(unix)]
        {
            region.advise(advice.to_raw())
        }
        #[cfg(not(unix))]
        {
            let _ = (region, advice);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenMode;
    use tempfile::tempdir;

    #[test]
    fn test_advise_operations() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("advise_ops");
        let file = MappedFile::create(&path, 8192, OpenMode::read_write().create(true), 0o644)
            .expect("create");

        file.advise(Advice::Sequential).expect("sequential advice");
        file.advise(Advice::Random).expect("random advice");
        file.advise(Advice::Normal).expect("normal advice");
        file.advise(Advice::WillNeed).expect("will need advice");
        file.advise(Advice::DontNeed).expect("dont need advice");

        file.close().expect("close");
        assert!(file.advise(Advice::Normal).is_err());
    }

    #[test]
    fn test_advise_unmapped_is_noop() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("advise_empty");
        let file = MappedFile::open(&path, OpenMode::read_write().create(true), 0o644).expect("open");
        assert_eq!(file.size().expect("size"), 0);
        file.advise(Advice::Sequential).expect("unmapped advice");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_linux_only_advice() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("advise_linux");
        let file = MappedFile::create(&path, 4096, OpenMode::read_write().create(true), 0o644)
            .expect("create");
        file.advise(Advice::DontDump).expect("dont dump");
        file.advise(Advice::DoDump).expect("do dump");
    }
}
