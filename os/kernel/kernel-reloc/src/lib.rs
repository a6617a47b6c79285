//! # Boot-Time Memory Shuffle Planner
//!
//! A pure, in-memory algorithm that schedules byte-range relocations for a
//! boot-time loader. Given a set of desired `(dst, src, len)` moves and a
//! description of which parts of the address space are currently free,
//! [`planner::compute_movelist`] produces an ordered sequence of
//! non-overlapping copies whose execution leaves every requested source
//! range at its requested destination.
//!
//! ## Why order matters
//!
//! Copies happen in place, in a single address space, with tight free
//! space. A naively-ordered copy can clobber a byte another pending move
//! still needs to read as a source. This crate exists to find an order
//! (and, where plain reordering cannot help, to schedule **eviction**
//! copies into scratch space) that makes every relocation succeed, or to
//! report that no such order exists.
//!
//! ## Modules
//!
//! * [`addr`] — the `Addr`/`Range` newtypes address arithmetic is built on.
//! * [`address_map`] — [`address_map::AddressMap`], the ordered, coalesced
//!   classification of the address space the planner reasons about.
//! * [`move_list`] — [`move_list::MoveList`], the singly linked pending/
//!   output list, addressed through [`move_list::Slot`] cursors so it can
//!   be split and pruned mid-scan.
//! * [`overlap`] — [`overlap::classify`], the pure function that turns a
//!   `(dst, src, len)` triple into a need-window and critical byte.
//! * [`planner`] — [`planner::compute_movelist`], the scheduling loop
//!   itself.
//! * [`error`] — [`error::PlannerError`], the two ways planning can fail.
//!
//! This crate has no I/O and no concurrency; see `reloc-sim` (in this
//! workspace's `tools/`) for a host-side binary that drives it from the
//! textual hex-triple test format.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod addr;
pub mod address_map;
pub mod error;
pub mod move_list;
pub mod overlap;
pub mod planner;

pub use addr::{Addr, Range};
pub use address_map::{AddressMap, FreeSpan, Region, RegionKind};
pub use error::PlannerError;
pub use move_list::{MoveEntry, MoveList, Slot};
pub use overlap::{classify, Direction, NeedWindow};
pub use planner::compute_movelist;
