use std::rc::Rc;

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use sieve_position::{FilePosition, InputSource, SourceBreaks};

use super::{NodeId, PositionHost, PositionInferer};

/// A host over a flat map of known positions.
#[derive(Default)]
struct MapHost {
    known: FxHashMap<NodeId, FilePosition>,
    inferred: FxHashMap<NodeId, FilePosition>,
}

impl PositionHost for MapHost {
    fn pos_for_node(&self, node: NodeId) -> FilePosition {
        self.known
            .get(&node)
            .cloned()
            .unwrap_or(FilePosition::UNKNOWN)
    }

    fn set_pos_for_node(&mut self, node: NodeId, pos: FilePosition) {
        self.inferred.insert(node, pos);
    }
}

/// Breaks for a single-line, 40-character source.
fn breaks() -> Rc<SourceBreaks> {
    let mut b = SourceBreaks::new(InputSource::new("file:///inf.txt"), 0);
    b.line_starts_at(1);
    Rc::new(b)
}

fn span(breaks: &SourceBreaks, start: u32, end: u32) -> FilePosition {
    breaks.to_file_position_span(start, end)
}

const A: NodeId = NodeId(1);
const B: NodeId = NodeId(2);
const C: NodeId = NodeId(3);
const D: NodeId = NodeId(4);

// === Ordering ===

#[test]
fn unknown_between_two_known_nodes_stays_between() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 11));
    host.known.insert(C, span(&breaks, 21, 31));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.precedes(&host, A, B);
    inferer.precedes(&host, B, C);
    inferer.solve(&mut host);

    let b = &host.inferred[&B];
    assert!(b.start_char_in_file() >= 11, "start {}", b.start_char_in_file());
    assert!(b.end_char_in_file() <= 21, "end {}", b.end_char_in_file());
    assert!(b.start_char_in_file() <= b.end_char_in_file());
}

#[test]
fn adjacency_pins_the_gap_exactly() {
    // Two known nodes with a gap: the unknown node between them, adjacent
    // to both, covers exactly the gap.
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 6));
    host.known.insert(C, span(&breaks, 9, 14));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.adjacent(&host, A, B);
    inferer.adjacent(&host, B, C);
    inferer.solve(&mut host);

    assert_eq!(host.inferred[&B], span(&breaks, 6, 9));
}

#[test]
fn containment_stretches_the_container() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 4, 9));
    host.known.insert(B, span(&breaks, 9, 14));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.contains(&host, D, A);
    inferer.contains(&host, D, B);
    inferer.solve(&mut host);

    let d = &host.inferred[&D];
    // The container collapses onto the known extent of its children.
    assert_eq!(d.start_char_in_file(), 4);
    assert_eq!(d.end_char_in_file(), 14);
}

#[test]
fn chained_inference_through_unknowns() {
    // Known, unknown, unknown, known; all adjacent in a row.
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 5));
    host.known.insert(D, span(&breaks, 12, 20));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.adjacent(&host, A, B);
    inferer.adjacent(&host, B, C);
    inferer.adjacent(&host, C, D);
    inferer.solve(&mut host);

    let b = &host.inferred[&B];
    let c = &host.inferred[&C];
    assert_eq!(b.start_char_in_file(), 5);
    assert_eq!(c.end_char_in_file(), 12);
    assert!(b.end_char_in_file() == c.start_char_in_file());
}

// === Known data ===

#[test]
fn known_positions_are_reported_back_unchanged() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 6));
    host.known.insert(B, span(&breaks, 6, 9));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.precedes(&host, A, B);
    inferer.solve(&mut host);

    assert_eq!(host.inferred[&A], span(&breaks, 1, 6));
    assert_eq!(host.inferred[&B], span(&breaks, 6, 9));
}

#[test]
fn positions_from_other_sources_are_not_constraints() {
    let breaks = breaks();
    let mut other = SourceBreaks::new(InputSource::new("file:///elsewhere.txt"), 0);
    other.line_starts_at(1);

    let mut host = MapHost::default();
    host.known.insert(A, other.to_file_position_span(2, 4));
    host.known.insert(C, span(&breaks, 9, 14));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.adjacent(&host, A, C);
    inferer.solve(&mut host);

    // A's foreign position contributed nothing; it collapses onto C's
    // start instead of importing coordinates from the other file.
    assert_eq!(host.inferred[&A].end_char_in_file(), 9);
    assert_eq!(host.inferred[&A].source(), &InputSource::new("file:///inf.txt"));
}

#[test]
fn unmentioned_nodes_get_no_position() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 6));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.precedes(&host, A, B);
    inferer.solve(&mut host);

    assert!(!host.inferred.contains_key(&C));
}

// === Contradictions ===

#[test]
fn contradictory_constraints_still_terminate() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 1, 11));
    host.known.insert(B, span(&breaks, 21, 31));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    // B is entirely after A, yet must precede it.
    inferer.precedes(&host, B, A);
    inferer.solve(&mut host);

    // Which assignment results is unspecified; termination is the contract,
    // and pinned nodes still report.
    assert_eq!(host.inferred[&A], span(&breaks, 1, 11));
    assert_eq!(host.inferred[&B], span(&breaks, 21, 31));
}

#[test]
fn contradictory_cycle_terminates() {
    let breaks = breaks();
    let mut host = MapHost::default();
    host.known.insert(A, span(&breaks, 5, 10));

    let mut inferer = PositionInferer::new(Rc::clone(&breaks));
    inferer.precedes(&host, B, A);
    inferer.precedes(&host, A, C);
    inferer.precedes(&host, C, B);
    inferer.solve(&mut host);
    // No assertion beyond termination without panics.
}
