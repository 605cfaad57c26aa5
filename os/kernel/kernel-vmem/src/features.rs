use bitflags::bitflags;

bitflags! {
    /// Capabilities of a paging format, as reported by
    /// [`mm_supported_features`](crate::mm_supported_features).
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// 2 MiB leaves.
        const LARGE_PAGES = 1 << 0;
        /// 1 GiB leaves.
        const HUGE_PAGES = 1 << 1;
        /// Mappings can be made non-executable.
        const NO_EXECUTE = 1 << 2;
        /// Memory types other than normal write-back can be encoded.
        const MEMORY_TYPES = 1 << 3;
        /// Shareability other than inner-shareable can be encoded.
        const SHAREABILITY = 1 << 4;
        /// Page-table frames must be mapped read-only everywhere (paravirtualized hosts).
        const READ_ONLY_TABLES = 1 << 5;
    }
}
