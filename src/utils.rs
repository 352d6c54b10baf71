//! Utility helpers for page size, alignment, and clipped range calculations.

use std::sync::OnceLock;

use crate::arch::MAX_MAPPING_SIZE;
use crate::errors::{MappedFileError, Result};
use crate::options::SizePolicy;

/// Get the system page size in bytes. Queried once per process.
#[must_use]
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "windows")] {
                windows_page_size()
            } else {
                unix_page_size()
            }
        }
    })
}

#[cfg(target_os = "windows")]
fn windows_page_size() -> usize {
    use std::mem::MaybeUninit;
    #[allow(non_snake_case)]
    #[repr(C)]
    struct SYSTEM_INFO {
        wProcessorArchitecture: u16,
        wReserved: u16,
        dwPageSize: u32,
        lpMinimumApplicationAddress: *mut core::ffi::c_void,
        lpMaximumApplicationAddress: *mut core::ffi::c_void,
        dwActiveProcessorMask: usize,
        dwNumberOfProcessors: u32,
        dwProcessorType: u32,
        dwAllocationGranularity: u32,
        wProcessorLevel: u16,
        wProcessorRevision: u16,
    }
    extern "system" {
        fn GetSystemInfo(lpSystemInfo: *mut SYSTEM_INFO);
    }
    let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo cannot fail and fills every field of the struct,
    // whose layout matches the Win32 definition.
    let info = unsafe {
        GetSystemInfo(info.as_mut_ptr());
        info.assume_init()
    };
    info.dwPageSize as usize
}

#[cfg(not(target_os = "windows"))]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unix_page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE is safe to call.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        4096
    } else {
        page_size as usize
    }
}

/// Align a value up to the nearest multiple of `alignment`.
/// Returns `None` on overflow.
#[must_use]
pub fn align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment == 0 {
        return Some(value);
    }
    if alignment.is_power_of_two() {
        let mask = alignment - 1;
        value.checked_add(mask).map(|v| v & !mask)
    } else {
        value.div_ceil(alignment).checked_mul(alignment)
    }
}

/// Align a value down to the nearest multiple of `alignment`.
#[must_use]
pub fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value - value % alignment
}

/// Compute the mapping length for a requested size.
///
/// The result is a multiple of the page size; zero becomes one full page.
/// Sizes above [`MAX_MAPPING_SIZE`] fail under [`SizePolicy::Reject`] and are
/// clamped to the largest page-aligned size below the ceiling under
/// [`SizePolicy::Clamp`].
///
/// # Errors
///
/// Returns `MappedFileError::Map` if the size exceeds the architecture maximum
/// and the policy is `Reject`.
pub fn aligned_mapping_size(requested: u64, policy: SizePolicy) -> Result<u64> {
    let page = page_size() as u64;
    let ceiling = align_down(MAX_MAPPING_SIZE, page);
    let aligned = if requested == 0 {
        Some(page)
    } else {
        align_up(requested, page)
    };
    match aligned {
        Some(size) if size <= ceiling => Ok(size),
        _ => match policy {
            SizePolicy::Clamp => Ok(ceiling),
            SizePolicy::Reject => Err(MappedFileError::Map(format!(
                "requested size {requested} exceeds maximum mapping size {MAX_MAPPING_SIZE}"
            ))),
        },
    }
}

/// Clip `[offset, offset + len)` to `[0, total)` and return it as a usize
/// range. Returns `None` when `offset` is at or past `total`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clipped_range(offset: u64, len: usize, total: u64) -> Option<(usize, usize)> {
    if offset >= total {
        return None;
    }
    let end = offset.saturating_add(len as u64).min(total);
    // Both ends are bounded by total, which is the length of a live mapping
    // and therefore fits in usize.
    Some((offset as usize, end as usize))
}
