//! The variable model (C2): source-level variables, each tracked per block
//! through a timeline of definitions, and the dense `DefId` each SSA
//! definition is numbered with.
//!
//! Grounded on `ir-variable.hpp`: a variable is a stable identity distinct
//! from any single definition of it; instructions reference a `Variable`
//! when assigning and a resolved `DefId` when using.

use ssagen_entity::entity_impl;

/// A source-level variable, stable across every block that reads or writes
/// it. Does not itself carry a type: the type of a variable at a given
/// program point is the meet of whatever has been assigned to it so far,
/// tracked by the timeline machinery in `ssagen-frontend`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(u32);
entity_impl!(Variable, "v");

/// A single SSA definition's dense identity: minted once per assignment
/// (including synthetic φ-assignments), never reused, monotonically
/// increasing within a function. A path with no reaching definition at all
/// mints no `DefId` — it is represented directly as the `Uninit` sentinel
/// rather than as a distinguished kind of definition (see
/// `ssagen_frontend::resolve::ResolvedDef`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(u32);
entity_impl!(DefId, "d");
