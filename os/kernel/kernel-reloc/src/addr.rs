use core::fmt;

/// A byte address within the planner's address space.
///
/// A thin, `repr(transparent)` wrapper around `u64` that keeps address
/// arithmetic from being confused with plain byte counts at call sites.
/// Unlike the plain `addr_t` of the original C implementation, every
/// addition used to derive a region boundary goes through
/// [`Addr::checked_add`] and is turned into a [`crate::error::PlannerError::AddressOverflow`]
/// rather than silently wrapping.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Addr(u64);

impl Addr {
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<u64> {
        self.0.checked_sub(rhs.0)
    }

    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> u64 {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr(0x{:08x})", self.0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u64> for Addr {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<Addr> for u64 {
    #[inline]
    fn from(a: Addr) -> Self {
        a.as_u64()
    }
}

/// A half-open byte range `[start, start + len)`, `len > 0`.
///
/// Plain data; the invariant `len > 0` is upheld by callers (the planner
/// never constructs a zero-length range) rather than enforced by a
/// fallible constructor, matching how [`crate::move_list::MoveEntry`] is used
/// throughout the planner.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Range {
    pub start: Addr,
    pub len: u64,
}

impl Range {
    #[inline]
    #[must_use]
    pub const fn new(start: Addr, len: u64) -> Self {
        Self { start, len }
    }

    /// The exclusive end of the range, or `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn end(self) -> Option<Addr> {
        self.start.checked_add(self.len)
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, addr: Addr) -> bool {
        addr.as_u64() >= self.start.as_u64() && addr.as_u64() < self.start.as_u64() + self.len
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[0x{:08x}, +0x{:08x})",
            self.start.as_u64(),
            self.len
        )
    }
}
