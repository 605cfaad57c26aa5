use kernel_alloc::FrameAllocError;

/// Errors reported by page-table operations.
///
/// Every walker operation reports failure through this type; the only
/// panicking path is handing a codec an attribute set it cannot encode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagingError {
    #[error("out of physical memory")]
    OutOfMemory,
    #[error("misaligned address or length, or invalid attributes")]
    InvalidArgument,
    #[error("a mapping already exists at the target address")]
    AlreadyMapped,
    #[error("no mapping exists at the target address")]
    NotMapped,
    #[error("not supported by the paging format or out of reach of the direct map")]
    Unsupported,
}

impl From<FrameAllocError> for PagingError {
    fn from(e: FrameAllocError) -> Self {
        match e {
            FrameAllocError::OutOfMemory | FrameAllocError::RegionTooSmall => Self::OutOfMemory,
            // Memory the allocator cannot reach through its direct map.
            FrameAllocError::OutOfRange(_) => Self::Unsupported,
            FrameAllocError::NotAllocated(_) | FrameAllocError::InvalidArgument => {
                Self::InvalidArgument
            }
        }
    }
}
