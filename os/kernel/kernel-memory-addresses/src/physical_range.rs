use crate::{PageSize, PhysicalAddress};
use core::fmt;

/// Half-open span `[start, end)` of physical memory.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysicalRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl PhysicalRange {
    /// An empty range at address zero.
    pub const EMPTY: Self = Self {
        start: PhysicalAddress::zero(),
        end: PhysicalAddress::zero(),
    };

    /// `[start, end)`; `end` is clamped so the range is never inverted.
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        if end.as_u64() < start.as_u64() {
            Self { start, end: start }
        } else {
            Self { start, end }
        }
    }

    /// `[start, start + len)`, or `None` if the end would overflow.
    #[inline]
    #[must_use]
    pub const fn from_len(start: PhysicalAddress, len: u64) -> Option<Self> {
        match start.checked_add(len) {
            Some(end) => Some(Self { start, end }),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.as_u64() - self.start.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        pa.as_u64() >= self.start.as_u64() && pa.as_u64() < self.end.as_u64()
    }

    /// Whether `[pa, pa + len)` lies entirely inside this range.
    #[inline]
    #[must_use]
    pub const fn contains_range(&self, pa: PhysicalAddress, len: u64) -> bool {
        match pa.checked_add(len) {
            Some(end) => {
                pa.as_u64() >= self.start.as_u64() && end.as_u64() <= self.end.as_u64()
            }
            None => false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start.as_u64() < other.end.as_u64() && other.start.as_u64() < self.end.as_u64()
    }

    /// Shrink to the largest `S`-aligned sub-range. May become empty.
    #[inline]
    #[must_use]
    pub const fn shrink_to<S: PageSize>(&self) -> Self {
        let start = match self.start.align_up::<S>() {
            Some(s) => s,
            None => return Self::EMPTY,
        };
        Self::new(start, self.end.align_down::<S>())
    }

    /// Smallest range covering both `self` and `other`.
    #[inline]
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}
