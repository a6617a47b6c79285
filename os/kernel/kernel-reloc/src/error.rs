use crate::addr::Addr;

/// Errors that can terminate [`crate::planner::compute_movelist`].
///
/// The original C planner (`syslinux_compute_movelist`) reports every
/// failure identically through a single `goto bail` and relies on a
/// `longjmp` for out-of-memory. Since safe Rust's global allocator aborts
/// on allocation failure rather than returning an error this crate can
/// act on, only the two genuinely-recoverable infeasibility causes are
/// represented here, kept distinct because a typed enum costs nothing and
/// gives callers a sharper diagnostic than the original's undifferentiated
/// "stuck".
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PlannerError {
    /// An address computation (typically `start + len` while deriving a
    /// region boundary) would overflow the address representation.
    #[error("address arithmetic overflowed")]
    AddressOverflow,

    /// The critical byte of a blocked move has no free region anywhere
    /// in the address space to receive an eviction.
    #[error("no free region available to evict the occupant of {critical_byte}")]
    NoFreeRegion { critical_byte: Addr },

    /// The critical byte of a blocked move is not covered by any
    /// remaining pending entry, so nothing can be evicted to unblock it.
    #[error("no pending entry covers the critical byte {critical_byte}")]
    NoOccupant { critical_byte: Addr },

    /// A full scan of the pending list committed or dropped nothing while
    /// entries remain. Structurally this should never happen (every
    /// reached entry is resolved or returns one of the errors above), but
    /// it is kept as the documented failure detector from the design.
    #[error("a full pass made no progress with pending relocations remaining")]
    NoProgress,
}
