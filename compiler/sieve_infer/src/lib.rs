//! Constraint solving to assign plausible file positions to generated
//! parse tree nodes.
//!
//! Rewriting synthesizes nodes that have no position of their own; for
//! diagnostics to stay anchored they need one anyway. The
//! [`PositionInferer`] takes ordering and containment relations between
//! node descriptors -- some with known positions, some without -- and runs a
//! worklist fixpoint over `[min, max]` bounds on each node edge. Bounds
//! only ever narrow, so the solve always terminates; if the constraints
//! contradict each other it behaves as if some non-contradictory subset
//! had been added (which subset is unpredictable), but it still terminates
//! and never panics.
//!
//! # Usage
//!
//! 1. Implement [`PositionHost`] for whatever tree you hang positions on.
//!    Node descriptors are plain [`NodeId`]s, compared by identity; mint
//!    them however suits the tree.
//! 2. Register constraints with [`contains`](PositionInferer::contains),
//!    [`precedes`](PositionInferer::precedes), and
//!    [`adjacent`](PositionInferer::adjacent). A node never mentioned in a
//!    constraint gets no inferred position.
//! 3. Call [`solve`](PositionInferer::solve), which reports every fully
//!    pinned node through [`PositionHost::set_pos_for_node`]. Treat the
//!    results as advisory; ignoring one does not degrade the others.

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use sieve_position::{FilePosition, SourceBreaks};
use tracing::debug;

/// Lower bound sentinel: the char-in-file index at the start of a file.
const UNSPECIFIED_MIN: u32 = 1;
/// Upper bound sentinel.
const UNSPECIFIED_MAX: u32 = u32::MAX;

/// Identifies one node descriptor. Identity, not structure: two ids are
/// the same node exactly when the caller says so.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// The inferer's window onto the caller's tree.
pub trait PositionHost {
    /// The known position for a node, or [`FilePosition::UNKNOWN`] when the
    /// node's position needs to be inferred. Positions from a source other
    /// than the inferer's are treated as unknown.
    fn pos_for_node(&self, node: NodeId) -> FilePosition;

    /// Receives an inferred position. The host may ignore it, and probably
    /// should when the node already carries accurate data from elsewhere.
    fn set_pos_for_node(&mut self, node: NodeId, pos: FilePosition);
}

/// One edge (start or end) of a node's span, with live bounds.
struct Boundary {
    /// Lower bound on the edge's char-in-file position.
    min: u32,
    /// Upper bound on the edge's char-in-file position.
    max: u32,
    /// Possibly unsatisfied relations with this boundary as a clause.
    relations: Vec<usize>,
}

impl Boundary {
    fn new() -> Boundary {
        Boundary {
            min: UNSPECIFIED_MIN,
            max: UNSPECIFIED_MAX,
            relations: Vec::new(),
        }
    }

    fn is_specified(&self) -> bool {
        self.min == self.max
    }
}

/// A start boundary and an end boundary for one node.
struct Region {
    start: usize,
    end: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelationKind {
    /// The first boundary sits at or before the second.
    LessThan,
    /// The two boundaries sit at the same position.
    Equal,
}

struct Relation {
    kind: RelationKind,
    a: usize,
    b: usize,
}

/// Does simple constraint solving to assign reasonable position values to
/// generated parse tree nodes. See the crate docs for the protocol.
pub struct PositionInferer {
    /// Used to construct inferred file positions; nodes whose known
    /// positions come from a different source contribute no constraints.
    breaks: Rc<SourceBreaks>,
    boundaries: Vec<Boundary>,
    relations: Vec<Relation>,
    /// Relations not yet known to be satisfied.
    active: Vec<usize>,
    regions: FxHashMap<NodeId, Region>,
}

impl PositionInferer {
    /// An inferer producing positions in the source described by `breaks`.
    pub fn new(breaks: Rc<SourceBreaks>) -> PositionInferer {
        PositionInferer {
            breaks,
            boundaries: Vec::new(),
            relations: Vec::new(),
            active: Vec::new(),
            regions: FxHashMap::default(),
        }
    }

    /// Requires that `contained`'s span falls (inclusively) inside
    /// `container`'s span.
    pub fn contains(&mut self, host: &dyn PositionHost, container: NodeId, contained: NodeId) {
        self.bounds_for_node(host, container);
        self.bounds_for_node(host, contained);
        let outer = &self.regions[&container];
        let inner = &self.regions[&contained];
        let (outer_start, outer_end) = (outer.start, outer.end);
        let (inner_start, inner_end) = (inner.start, inner.end);
        self.add_relation(RelationKind::LessThan, outer_start, inner_start);
        self.add_relation(RelationKind::LessThan, inner_end, outer_end);
    }

    /// Requires that the end of `before` is at or before the start of
    /// `after`.
    pub fn precedes(&mut self, host: &dyn PositionHost, before: NodeId, after: NodeId) {
        self.bounds_for_node(host, before);
        self.bounds_for_node(host, after);
        let before_end = self.regions[&before].end;
        let after_start = self.regions[&after].start;
        self.add_relation(RelationKind::LessThan, before_end, after_start);
    }

    /// Requires that the end of `before` is exactly the start of `after`.
    /// More constraining than [`precedes`](Self::precedes).
    pub fn adjacent(&mut self, host: &dyn PositionHost, before: NodeId, after: NodeId) {
        self.bounds_for_node(host, before);
        self.bounds_for_node(host, after);
        let before_end = self.regions[&before].end;
        let after_start = self.regions[&after].start;
        self.add_relation(RelationKind::Equal, before_end, after_start);
    }

    /// Attempts to satisfy all constraints added so far, then reports a
    /// position for every node whose edges both got pinned.
    pub fn solve(&mut self, host: &mut dyn PositionHost) {
        let mut to_check: VecDeque<usize> = VecDeque::new();
        let mut rounds = 0u32;
        loop {
            rounds += 1;
            let mut work_done = false;
            let mut i = 0;
            while i < self.active.len() {
                let rel = self.active[i];
                if !self.is_satisfied(rel) {
                    to_check.push_back(rel);
                    while let Some(head) = to_check.pop_front() {
                        if self.narrow(head, &mut to_check) {
                            work_done = true;
                        }
                    }
                }
                if self.is_satisfied(rel) {
                    self.active.swap_remove(i);
                } else {
                    i += 1;
                }
            }
            if !work_done {
                break;
            }
        }
        debug!(rounds, unsatisfied = self.active.len(), "position inference fixpoint");

        // Guess for any half-specified bounds: prefer a known lower bound,
        // else a known upper bound.
        for boundary in &mut self.boundaries {
            if !boundary.is_specified() {
                if boundary.min > UNSPECIFIED_MIN {
                    boundary.max = boundary.min;
                } else if boundary.max < UNSPECIFIED_MAX {
                    boundary.min = boundary.max;
                }
            }
        }

        // Propagate positions back to nodes. A region whose bounds crossed
        // under contradictory constraints is skipped rather than reported.
        for (&node, region) in &self.regions {
            let start = &self.boundaries[region.start];
            let end = &self.boundaries[region.end];
            if start.is_specified() && end.is_specified() && start.min <= end.max {
                host.set_pos_for_node(
                    node,
                    self.breaks.to_file_position_span(start.min, end.max),
                );
            }
        }
    }

    /// The region for a node, created on first mention. A node whose known
    /// position is in the inferer's source arrives pre-pinned.
    fn bounds_for_node(&mut self, host: &dyn PositionHost, node: NodeId) {
        if self.regions.contains_key(&node) {
            return;
        }
        let start = self.boundaries.len();
        self.boundaries.push(Boundary::new());
        let end = self.boundaries.len();
        self.boundaries.push(Boundary::new());

        let pos = host.pos_for_node(node);
        if self.breaks.source() == pos.source() {
            self.boundaries[start].min = pos.start_char_in_file();
            self.boundaries[start].max = pos.start_char_in_file();
            self.boundaries[end].min = pos.end_char_in_file();
            self.boundaries[end].max = pos.end_char_in_file();
        }
        self.regions.insert(node, Region { start, end });
        self.add_relation(RelationKind::LessThan, start, end);
    }

    fn add_relation(&mut self, kind: RelationKind, a: usize, b: usize) {
        let id = self.relations.len();
        self.relations.push(Relation { kind, a, b });
        if !(self.boundaries[a].is_specified() && self.boundaries[b].is_specified()) {
            self.boundaries[a].relations.push(id);
            self.boundaries[b].relations.push(id);
        }
        if !self.is_satisfied(id) {
            self.active.push(id);
        }
    }

    /// True if no choice of actual positions within the current bounds
    /// could make this relation inconsistent.
    fn is_satisfied(&self, rel: usize) -> bool {
        let Relation { kind, a, b } = self.relations[rel];
        let (a, b) = (&self.boundaries[a], &self.boundaries[b]);
        match kind {
            RelationKind::LessThan => {
                (a.is_specified() && b.is_specified()) || a.max <= b.min
            }
            RelationKind::Equal => {
                (a.is_specified() && b.is_specified())
                    || (a.min == b.min && a.max == b.max)
            }
        }
    }

    /// Attempt to narrow the bounds on this relation's boundaries,
    /// scheduling re-checks of anything that changed. True if narrowed.
    fn narrow(&mut self, rel: usize, to_check: &mut VecDeque<usize>) -> bool {
        let Relation { kind, a, b } = self.relations[rel];
        match kind {
            RelationKind::LessThan => self.narrow_less_than(a, b, to_check),
            RelationKind::Equal => self.narrow_equal(a, b, to_check),
        }
    }

    fn narrow_less_than(
        &mut self,
        a: usize,
        b: usize,
        to_check: &mut VecDeque<usize>,
    ) -> bool {
        // Six cases for (A <= B):
        // 1. A entirely after B                Inconsistent; narrow nothing.
        // 2. A entirely before B               Satisfied; narrow nothing.
        // 3. overlapping, A.min <= B.min,
        //    A.max <= B.max                    Cannot narrow.
        // 4. B straddles A.min                 Narrow A.max and B.min.
        // 5. A contains B                      Narrow A.max.
        // 6. B contains A                      Narrow B.min.
        let (a_min, a_max) = (self.boundaries[a].min, self.boundaries[a].max);
        let (b_min, b_max) = (self.boundaries[b].min, self.boundaries[b].max);
        let mut narrowed = false;
        if a_min <= b_max {
            if a_min > b_min {
                let new_min = a_min.min(b_max);
                if b_min != new_min {
                    self.boundaries[b].min = new_min;
                    self.schedule(b, to_check);
                    narrowed = true;
                }
            }
            if a_max > b_max {
                let new_max = b_max.max(a_min);
                if a_max != new_max {
                    self.boundaries[a].max = new_max;
                    self.schedule(a, to_check);
                    narrowed = true;
                }
            }
        }
        narrowed
    }

    fn narrow_equal(&mut self, a: usize, b: usize, to_check: &mut VecDeque<usize>) -> bool {
        let (a_min, a_max) = (self.boundaries[a].min, self.boundaries[a].max);
        let (b_min, b_max) = (self.boundaries[b].min, self.boundaries[b].max);
        let new_a_min = a_max.min(a_min.max(b_min));
        let new_a_max = a_min.max(a_max.min(b_max));
        let new_b_min = b_max.min(a_min.max(b_min));
        let new_b_max = b_min.max(a_max.min(b_max));
        let mut narrowed = false;
        if a_min != new_a_min || a_max != new_a_max {
            self.boundaries[a].min = new_a_min;
            self.boundaries[a].max = new_a_max;
            self.schedule(a, to_check);
            narrowed = true;
        }
        if b_min != new_b_min || b_max != new_b_max {
            self.boundaries[b].min = new_b_min;
            self.boundaries[b].max = new_b_max;
            self.schedule(b, to_check);
            narrowed = true;
        }
        narrowed
    }

    /// Queue the boundary's unsatisfied relations for re-checking and drop
    /// the satisfied ones from its list.
    fn schedule(&mut self, boundary: usize, to_check: &mut VecDeque<usize>) {
        let relations = std::mem::take(&mut self.boundaries[boundary].relations);
        let mut kept = Vec::with_capacity(relations.len());
        for rel in relations {
            if !self.is_satisfied(rel) {
                to_check.push_back(rel);
                kept.push(rel);
            }
        }
        self.boundaries[boundary].relations = kept;
    }
}

#[cfg(test)]
mod tests;
