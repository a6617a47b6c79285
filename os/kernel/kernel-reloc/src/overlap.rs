//! Pure classification of how a pending move's source and destination overlap.

use crate::addr::Addr;
use crate::move_list::MoveEntry;

/// Which end of the need-window copying proceeds from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    /// Copy starting at the need-window's base, moving toward higher addresses.
    Forward,
    /// Copy starting at the need-window's end, moving toward lower addresses.
    Reverse,
}

/// The sub-range of a move's destination whose occupancy actually matters,
/// plus the byte that must be freed (directly or by eviction) before any
/// of it can be claimed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NeedWindow {
    pub need_base: Addr,
    pub need_len: u64,
    pub critical_byte: Addr,
    pub direction: Direction,
}

/// Classify the overlap between `entry.src` and `entry.dst`.
///
/// Callers must have already handled the trivial `src == dst` case; this
/// function assumes a genuine relocation is requested.
#[must_use]
pub fn classify(entry: MoveEntry) -> NeedWindow {
    let dst = entry.dst.as_u64();
    let src = entry.src.as_u64();
    let len = entry.len;

    debug_assert_ne!(src, dst, "classify() assumes src != dst (trivial moves are dropped earlier)");

    if src < dst && dst - src < len {
        // Shift-up: the tail of the source already sits where part of the
        // destination needs to be; only the portion past it is "needed".
        let need_len = dst - src;
        let need_base = dst + (len - need_len);
        NeedWindow {
            need_base: Addr::new(need_base),
            need_len,
            critical_byte: Addr::new(dst + len - 1),
            direction: Direction::Reverse,
        }
    } else if src > dst && src - dst < len {
        // Shift-down: the head of the source already sits where part of
        // the destination needs to be.
        NeedWindow {
            need_base: Addr::new(dst),
            need_len: src - dst,
            critical_byte: Addr::new(dst),
            direction: Direction::Forward,
        }
    } else {
        // Disjoint (or overlap-free by distance): the whole destination is needed.
        NeedWindow {
            need_base: Addr::new(dst),
            need_len: len,
            critical_byte: Addr::new(dst),
            direction: Direction::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(dst: u64, src: u64, len: u64) -> MoveEntry {
        MoveEntry::new(Addr::new(dst), Addr::new(src), len)
    }

    #[test]
    fn disjoint_forward() {
        let w = classify(e(0x2000, 0x1000, 0x1000));
        assert_eq!(w.need_base, Addr::new(0x2000));
        assert_eq!(w.need_len, 0x1000);
        assert_eq!(w.critical_byte, Addr::new(0x2000));
        assert_eq!(w.direction, Direction::Forward);
    }

    #[test]
    fn shift_up_overlap() {
        // dst=0x1800, src=0x1000, len=0x1000: src < dst, dst-src=0x800 < len.
        let w = classify(e(0x1800, 0x1000, 0x1000));
        assert_eq!(w.need_len, 0x800);
        assert_eq!(w.need_base, Addr::new(0x1800 + (0x1000 - 0x800)));
        assert_eq!(w.critical_byte, Addr::new(0x1800 + 0x1000 - 1));
        assert_eq!(w.direction, Direction::Reverse);
    }

    #[test]
    fn shift_down_overlap() {
        // dst=0x1000, src=0x1800, len=0x1000: src > dst, src-dst=0x800 < len.
        let w = classify(e(0x1000, 0x1800, 0x1000));
        assert_eq!(w.need_base, Addr::new(0x1000));
        assert_eq!(w.need_len, 0x800);
        assert_eq!(w.critical_byte, Addr::new(0x1000));
        assert_eq!(w.direction, Direction::Forward);
    }

    #[test]
    fn disjoint_when_gap_at_least_len() {
        let w = classify(e(0x1000, 0x1800, 0x800));
        assert_eq!(w.need_len, 0x800);
        assert_eq!(w.direction, Direction::Forward);
    }
}
