//! Per-architecture mapping limits.
//!
//! Exactly one profile is compiled in, chosen by `target_arch`. The values are
//! the largest single mapping the kernel address space of that architecture
//! can reasonably hold; the resize engine treats them as opaque ceilings.

/// Compile-time description of the target architecture's mapping limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchProfile {
    /// Short architecture name.
    pub name: &'static str,
    /// Largest size, in bytes, a single mapping may have.
    pub max_mapping_size: u64,
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "x86_64", max_mapping_size: (1 << 47) - 1 };
    } else if #[cfg(target_arch = "x86")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "x86", max_mapping_size: (1 << 31) - 1 };
    } else if #[cfg(target_arch = "aarch64")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "aarch64", max_mapping_size: (1 << 48) - 1 };
    } else if #[cfg(target_arch = "arm")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "arm", max_mapping_size: (1 << 31) - 1 };
    } else if #[cfg(target_arch = "mips64")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "mips64", max_mapping_size: (1 << 47) - 1 };
    } else if #[cfg(target_arch = "mips")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "mips", max_mapping_size: 1 << 31 };
    } else if #[cfg(target_arch = "riscv64")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "riscv64", max_mapping_size: (1 << 47) - 1 };
    } else if #[cfg(target_arch = "riscv32")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "riscv32", max_mapping_size: 1 << 31 };
    } else if #[cfg(target_pointer_width = "64")] {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "generic64", max_mapping_size: (1 << 47) - 1 };
    } else {
        /// Active architecture profile.
        pub const PROFILE: ArchProfile = ArchProfile { name: "generic32", max_mapping_size: (1 << 31) - 1 };
    }
}

/// Largest size, in bytes, a single mapping may have on this target.
pub const MAX_MAPPING_SIZE: u64 = PROFILE.max_mapping_size;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_fits_the_address_space() {
        assert!(MAX_MAPPING_SIZE > 0);
        assert!(usize::try_from(MAX_MAPPING_SIZE).is_ok());
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn x86_64_profile() {
        assert_eq!(PROFILE.name, "x86_64");
        assert_eq!(MAX_MAPPING_SIZE, 0x7FFF_FFFF_FFFF);
    }
}
