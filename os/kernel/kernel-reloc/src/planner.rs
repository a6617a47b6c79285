//! The main relocation-scheduling loop: `compute_movelist`.
//!
//! Mirrors `syslinux_compute_movelist` in spirit: mark every requested
//! destination as claimable and every requested source as occupied up
//! front, then repeatedly either place a pending move directly into
//! already-free destination space or, if the critical byte of its
//! need-window is blocked, evict whatever currently sits there to scratch
//! space before falling through to the same placement logic.
//!
//! Unlike the source, there is no `goto bail` and no process-wide jump
//! buffer: every step that can fail returns a [`PlannerError`], propagated
//! with `?`, and every intermediate allocation is reclaimed by ordinary
//! `Drop` on the way out.

use crate::addr::{Addr, Range};
use crate::address_map::{AddressMap, RegionKind};
use crate::error::PlannerError;
use crate::move_list::{MoveEntry, MoveList, Slot};
use crate::overlap::{classify, Direction, NeedWindow};
use alloc::vec::Vec;
use log::{debug, trace, warn};

/// Schedule a non-overlapping sequence of copies that realizes every
/// relocation in `ifrags`, using `memmap` to find scratch space for
/// evictions.
///
/// `ifrags` and `memmap` are read-only: the planner works against a deep
/// copy of the pending moves and a private working copy of the map,
/// neither of which is visible to the caller. The returned `Vec` lists
/// copies in the order they must execute; applying them in that order,
/// each a non-aliased `memmove`, leaves every requested `(dst, src, len)`
/// satisfied exactly, possibly via additional eviction copies that do not
/// correspond to any input entry.
pub fn compute_movelist(
    ifrags: &[MoveEntry],
    memmap: &AddressMap,
) -> Result<Vec<MoveEntry>, PlannerError> {
    let mut frags = MoveList::new();
    for f in ifrags {
        frags.push_back(*f);
    }

    let mut map = memmap.remap(|kind| {
        if kind == RegionKind::Zeroed {
            RegionKind::Free
        } else {
            kind
        }
    });
    // A move's destination is claimable RAM the moment planning starts (the
    // caller's memmap only describes *scratch* space, not the targets the
    // moves themselves are aiming at). Mark destinations free first, then
    // sources allocated, so that a destination which coincides with another
    // entry's source (the swap case) ends up allocated as it must.
    for f in ifrags {
        map.add(f.dst, f.len, RegionKind::Free)?;
    }
    for f in ifrags {
        map.add(f.src, f.len, RegionKind::Allocated)?;
    }

    let mut moves = Vec::new();

    loop {
        debug_assert_invariants(&map, &frags);

        let mut slot = Slot::Head;
        let mut progress = false;

        while let Some(f) = frags.entry(slot) {
            if f.dst == f.src {
                trace!("dropping trivial move at {}", f.src);
                slot = frags.delete(slot);
                progress = true;
                continue;
            }

            let window = classify(f);
            trace!(
                "need [{}, +{:#x}) critical={} dir={:?} for {:#x} @ {} -> {}",
                window.need_base, window.need_len, window.critical_byte, window.direction,
                f.len, f.src, f.dst,
            );

            if let Some(copy_len) = direct_claim(&mut map, &window)? {
                debug!("direct claim of {:#x} bytes at critical byte {}", copy_len, window.critical_byte);
                slot = commit(&mut frags, &mut map, &mut moves, slot, f, copy_len, window.direction)?;
            } else {
                let evicted_len = evict(&mut frags, &mut map, &mut moves, slot, &window)?;
                slot = commit(&mut frags, &mut map, &mut moves, slot, f, evicted_len, Direction::Forward)?;
            }
            progress = true;
        }

        if frags.is_empty() {
            return Ok(moves);
        }
        if !progress {
            warn!("a full pass made no progress with pending relocations remaining");
            return Err(PlannerError::NoProgress);
        }
    }
}

/// Attempt to place (part of) the need-window directly into free space
/// covering its critical byte, without evicting anything.
///
/// Returns `Ok(None)` when the critical byte has no free neighbor at all;
/// `Ok(Some(0))` never occurs (a zero-length claim is treated as no claim).
fn direct_claim(map: &mut AddressMap, window: &NeedWindow) -> Result<Option<u64>, PlannerError> {
    let Some(span) = map.is_free_zone(window.critical_byte, 1) else {
        return Ok(None);
    };
    let region_end = span
        .start
        .checked_add(span.len)
        .ok_or(PlannerError::AddressOverflow)?;

    let avail = match window.direction {
        Direction::Forward => region_end.saturating_sub(window.need_base),
        Direction::Reverse => {
            let window_end = window
                .need_base
                .checked_add(window.need_len)
                .ok_or(PlannerError::AddressOverflow)?;
            window_end.saturating_sub(span.start)
        }
    };

    let copy_len = window.need_len.min(avail);
    if copy_len == 0 {
        return Ok(None);
    }

    let claim_start = match window.direction {
        Direction::Forward => window.need_base,
        Direction::Reverse => Addr::new(window.need_base.as_u64() + window.need_len - copy_len),
    };
    map.add(claim_start, copy_len, RegionKind::Allocated)?;
    Ok(Some(copy_len))
}

/// Find a pending entry after `f_slot` whose source covers the critical
/// byte, relocate it to scratch space, and report how many bytes of the
/// critical byte's neighborhood are now free for the caller to claim.
fn evict(
    frags: &mut MoveList,
    map: &mut AddressMap,
    moves: &mut Vec<MoveEntry>,
    f_slot: Slot,
    window: &NeedWindow,
) -> Result<u64, PlannerError> {
    let critical_byte = window.critical_byte;

    let mut op = frags
        .after(f_slot)
        .expect("f_slot names a live node while its entry is being processed");
    let o = loop {
        match frags.entry(op) {
            Some(o) if Range::new(o.src, o.len).contains(critical_byte) => break o,
            Some(_) => {
                op = frags
                    .after(op)
                    .expect("entry(op) returned Some, so the node at op is live");
            }
            None => return Err(PlannerError::NoOccupant { critical_byte }),
        }
    };

    let (target_start, evicted_src, evicted_len) = if map.is_free_zone(o.dst, o.len).is_some() {
        (o.dst, o.src, o.len)
    } else if let Some(span) = map.smallest_fit_for(o.len) {
        (span.start, o.src, o.len)
    } else if let Some(span) = map.largest_free() {
        let flen = span.len;
        match window.direction {
            Direction::Forward => {
                let covered = critical_byte
                    .checked_sub(o.src)
                    .expect("critical byte lies within o's source range");
                let evicted_len = flen.min(o.len - covered);
                (span.start, critical_byte, evicted_len)
            }
            Direction::Reverse => {
                let past_critical = critical_byte.as_u64() + 1;
                let src_floor = past_critical.saturating_sub(flen).max(o.src.as_u64());
                let evicted_len = past_critical - src_floor;
                (span.start, Addr::new(src_floor), evicted_len)
            }
        }
    } else {
        return Err(PlannerError::NoFreeRegion { critical_byte });
    };

    map.add(target_start, evicted_len, RegionKind::Allocated)?;

    let op_evicted = if evicted_len < o.len {
        frags.split_at(op, evicted_src, evicted_len)
    } else {
        op
    };

    debug!(
        "evicting {:#x} bytes from {} to {} to unblock critical byte {}",
        evicted_len, evicted_src, target_start, critical_byte
    );
    moves.push(MoveEntry::new(target_start, evicted_src, evicted_len));
    frags.set_src(op_evicted, target_start);

    // The evicted span may reach beyond what the need-window actually
    // wants; whatever it freed up outside that window is genuinely free
    // now (its former occupant moved away), not merely reserved for the
    // upcoming commit, so it must be reclassified rather than left
    // Allocated to an entry that no longer lives there.
    let evict_end = evicted_src.as_u64() + evicted_len;
    let need_end = window.need_base.as_u64() + window.need_len;
    let overlap_start = evicted_src.as_u64().max(window.need_base.as_u64());
    let overlap_end = evict_end.min(need_end).max(overlap_start);

    if evicted_src.as_u64() < overlap_start {
        map.add(evicted_src, overlap_start - evicted_src.as_u64(), RegionKind::Free)?;
    }
    if evict_end > overlap_end {
        map.add(Addr::new(overlap_end), evict_end - overlap_end, RegionKind::Free)?;
    }

    Ok(evicted_len)
}

/// Commit `copy_len` bytes of `f` (trimming it first if that is less than
/// all of it), emit the copy, and update the map and pending list to
/// reflect it. Returns the slot from which the outer scan should continue.
///
/// A forward trim never leaves a prefix behind (it splits at `f.src`
/// itself), so the committed entry keeps `slot`'s identity and deleting it
/// naturally advances to whatever remains. A reverse trim splits off a
/// *prefix* that keeps living at `slot` — the untouched remainder of `f`,
/// still due for its own commit later — so in that case the scan must
/// resume at the unchanged `slot` rather than at whatever `split_at`
/// returned, or the prefix would be skipped entirely.
fn commit(
    frags: &mut MoveList,
    map: &mut AddressMap,
    moves: &mut Vec<MoveEntry>,
    slot: Slot,
    mut f: MoveEntry,
    copy_len: u64,
    direction: Direction,
) -> Result<Slot, PlannerError> {
    let mut fp = slot;
    if copy_len < f.len {
        fp = match direction {
            Direction::Forward => frags.split_at(slot, f.src, copy_len),
            Direction::Reverse => {
                let start = Addr::new(f.src.as_u64() + (f.len - copy_len));
                frags.split_at(slot, start, copy_len)
            }
        };
        f = frags
            .entry(fp)
            .expect("split_at returns a slot naming the freshly split middle entry");
    }

    debug!("committing {:#x} bytes: {} -> {}", f.len, f.src, f.dst);
    moves.push(f);
    map.add(f.dst, f.len, RegionKind::Allocated)?;
    debug_assert_eq!(
        map.kind_at(f.dst),
        RegionKind::Allocated,
        "committed destination must be allocated immediately after emission"
    );

    let vacated = vacated_source(f.dst, f.src, f.len);
    map.add(vacated.start, vacated.len, RegionKind::Free)?;

    let successor = frags.delete(fp);
    if fp == slot {
        Ok(successor)
    } else {
        // `fp` named a freshly split-off entry distinct from `slot`;
        // `slot` still names the prefix left behind, due for its own pass.
        Ok(slot)
    }
}

/// Debug-only sanity checks corresponding to the loop invariants: the map
/// stays coalesced, and every still-pending entry's source range remains
/// allocated (checked at both ends, cheaper than walking every byte).
/// Compiled out entirely in release builds.
fn debug_assert_invariants(map: &AddressMap, frags: &MoveList) {
    debug_assert!(map.is_coalesced(), "address map must remain coalesced between planning steps");

    #[cfg(debug_assertions)]
    for f in frags.iter() {
        let last = Addr::new(f.src.as_u64() + f.len - 1);
        debug_assert_eq!(
            map.kind_at(f.src),
            RegionKind::Allocated,
            "pending entry's source range must stay allocated until consumed"
        );
        debug_assert_eq!(
            map.kind_at(last),
            RegionKind::Allocated,
            "pending entry's source range must stay allocated until consumed"
        );
    }
}

/// The portion of `[src, src+len)` that the copy to `dst` does not itself
/// overlap, and which therefore becomes free once the copy completes.
fn vacated_source(dst: Addr, src: Addr, len: u64) -> Range {
    let (d, s) = (dst.as_u64(), src.as_u64());
    if d > s {
        Range::new(src, len.min(d - s))
    } else if s >= d + len {
        Range::new(src, len)
    } else {
        Range::new(Addr::new(d + len), s - d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(dst: u64, src: u64, len: u64) -> MoveEntry {
        MoveEntry::new(Addr::new(dst), Addr::new(src), len)
    }

    fn map_with_free(start: u64, len: u64) -> AddressMap {
        let mut map = AddressMap::new();
        map.add(Addr::new(start), len, RegionKind::Free).unwrap();
        map
    }

    /// Applies a schedule to an abstract byte-provenance model: each byte
    /// address maps to the address its *original* content came from.
    /// After applying every emitted copy, every input entry's source bytes
    /// must have ended up at its destination.
    struct ByteModel {
        provenance: alloc::collections::BTreeMap<u64, u64>,
    }

    impl ByteModel {
        fn new(initial_addrs: impl Iterator<Item = u64>) -> Self {
            Self {
                provenance: initial_addrs.map(|a| (a, a)).collect(),
            }
        }

        fn apply(&mut self, m: MoveEntry) {
            let mut moved = alloc::vec::Vec::with_capacity(m.len as usize);
            for i in 0..m.len {
                let from = m.src.as_u64() + i;
                moved.push(self.provenance.get(&from).copied().unwrap_or(from));
            }
            for i in 0..m.len {
                self.provenance.insert(m.dst.as_u64() + i, moved[i as usize]);
            }
        }

        fn origin_at(&self, addr: u64) -> u64 {
            self.provenance.get(&addr).copied().unwrap_or(addr)
        }
    }

    fn assert_realizes(ifrags: &[MoveEntry], moves: &[MoveEntry]) {
        let all_addrs = ifrags
            .iter()
            .flat_map(|f| (f.src.as_u64()..f.src.as_u64() + f.len).chain(f.dst.as_u64()..f.dst.as_u64() + f.len));
        let mut model = ByteModel::new(all_addrs);
        for m in moves {
            model.apply(*m);
        }
        for f in ifrags {
            for i in 0..f.len {
                assert_eq!(
                    model.origin_at(f.dst.as_u64() + i),
                    f.src.as_u64() + i,
                    "byte originally at {:#x} should have ended up at {:#x}",
                    f.src.as_u64() + i,
                    f.dst.as_u64() + i
                );
            }
        }
    }

    #[test]
    fn empty_input_succeeds_with_no_output() {
        let out = compute_movelist(&[], &AddressMap::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn every_trivial_move_drops_to_empty_output() {
        let ifrags = [e(0x1000, 0x1000, 0x100), e(0x2000, 0x2000, 0x10)];
        let out = compute_movelist(&ifrags, &AddressMap::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn scenario_1_disjoint_forward() {
        let ifrags = [e(0x2000, 0x1000, 0x1000)];
        let map = map_with_free(0x2000, 0x1000);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out, alloc::vec![e(0x2000, 0x1000, 0x1000)]);
        assert_realizes(&ifrags, &out);
    }

    #[test]
    fn scenario_2_disjoint_reverse_gap() {
        let ifrags = [e(0x1000, 0x2000, 0x1000)];
        let map = map_with_free(0x3000, 0x1000);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out, alloc::vec![e(0x1000, 0x2000, 0x1000)]);
        assert_realizes(&ifrags, &out);
    }

    #[test]
    fn scenario_3_shift_up_overlap() {
        let ifrags = [e(0x1800, 0x1000, 0x1000)];
        let map = map_with_free(0x2000, 0x800);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out.len(), 2);
        assert_realizes(&ifrags, &out);
    }

    #[test]
    fn scenario_4_shift_down_overlap() {
        let ifrags = [e(0x1000, 0x1800, 0x1000)];
        let map = map_with_free(0x2800, 0x800);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out.len(), 2);
        assert_realizes(&ifrags, &out);
    }

    #[test]
    fn scenario_5_swap_with_scratch_evicts_and_realizes() {
        let ifrags = [e(0x2000, 0x1000, 0x1000), e(0x1000, 0x2000, 0x1000)];
        let map = map_with_free(0x3000, 0x1000);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out.len(), 3);
        assert_realizes(&ifrags, &out);
    }

    #[test]
    fn scenario_6_swap_with_no_free_space_is_infeasible() {
        let ifrags = [e(0x2000, 0x1000, 0x1000), e(0x1000, 0x2000, 0x1000)];
        let map = AddressMap::new();
        let err = compute_movelist(&ifrags, &map).unwrap_err();
        assert!(matches!(
            err,
            PlannerError::NoFreeRegion { .. } | PlannerError::NoOccupant { .. }
        ));
    }

    #[test]
    fn pure_permutation_without_trivial_moves_is_infeasible() {
        let ifrags = [
            e(0x1000, 0x2000, 0x1000),
            e(0x2000, 0x3000, 0x1000),
            e(0x3000, 0x1000, 0x1000),
        ];
        let map = AddressMap::new();
        assert!(compute_movelist(&ifrags, &map).is_err());
    }

    #[test]
    fn zeroed_scratch_is_usable_as_free_space() {
        let ifrags = [e(0x2000, 0x1000, 0x1000)];
        let mut map = AddressMap::new();
        map.add(Addr::new(0x2000), 0x1000, RegionKind::Zeroed).unwrap();
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(out, alloc::vec![e(0x2000, 0x1000, 0x1000)]);
    }

    #[test]
    fn is_deterministic_across_repeated_runs() {
        let ifrags = [e(0x2000, 0x1000, 0x1000), e(0x1000, 0x2000, 0x1000)];
        let map = map_with_free(0x3000, 0x1000);
        let a = compute_movelist(&ifrags, &map).unwrap();
        let b = compute_movelist(&ifrags, &map).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multi_fragment_relocation_realizes_every_request() {
        let ifrags = [
            e(0x5000, 0x1000, 0x2000),
            e(0x1000, 0x3000, 0x1000),
            e(0x3000, 0x5000, 0x1000),
        ];
        let map = map_with_free(0x8000, 0x2000);
        let out = compute_movelist(&ifrags, &map).unwrap();
        assert_realizes(&ifrags, &out);
    }
}
