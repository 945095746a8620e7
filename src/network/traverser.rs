//! Multi-hop segment walks
//!
//! `SegmentTraverser` walks outward from a segment across its nodes,
//! yielding one `VisitData` per reached segment. It is a plain iterator:
//! dropping it (or breaking out of the loop) ends the walk.

use std::collections::{HashSet, VecDeque};

use super::accessor::NetworkQuery;
use super::direction::arrow_direction;
use super::types::{NodeId, SegmentEnd, SegmentId, TraverseSide, VisitData};

/// Which way a walk moves relative to traffic flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseDirection {
    /// Against traffic
    Incoming,
    /// With traffic
    Outgoing,
    AnyDirection,
}

/// When a walk stops expanding a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStopCriterion {
    None,
    /// Do not continue through a node that offers more than one continuation
    Junction,
}

/// Pending continuations at one node
#[derive(Debug)]
struct Frame {
    /// Segment end the walk arrived through
    exit: SegmentEnd,
    node: NodeId,
    via_initial_start_node: bool,
    candidates: Vec<SegmentId>,
    cursor: usize,
}

/// Lazy depth-first walk over segments
pub struct SegmentTraverser<'a, N: NetworkQuery + ?Sized> {
    network: &'a N,
    start: SegmentId,
    direction: TraverseDirection,
    side: TraverseSide,
    stop: SegmentStopCriterion,
    started: bool,
    roots: VecDeque<SegmentEnd>,
    stack: Vec<Frame>,
    visited: HashSet<SegmentId>,
}

impl<'a, N: NetworkQuery + ?Sized> SegmentTraverser<'a, N> {
    pub fn new(
        network: &'a N,
        start: SegmentId,
        direction: TraverseDirection,
        side: TraverseSide,
        stop: SegmentStopCriterion,
    ) -> Self {
        Self {
            network,
            start,
            direction,
            side,
            stop,
            started: false,
            roots: VecDeque::new(),
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Segments yielded so far, including the initial one
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Whether the walk may leave the initial segment through `end`
    fn admits_root(&self, end: SegmentEnd) -> bool {
        match self.direction {
            TraverseDirection::AnyDirection => true,
            TraverseDirection::Outgoing => self.network.is_incoming(end),
            TraverseDirection::Incoming => self.network.is_outgoing(end),
        }
    }

    /// Whether the walk may enter a segment through `end`
    fn admits_next(&self, end: SegmentEnd) -> bool {
        match self.direction {
            TraverseDirection::AnyDirection => true,
            TraverseDirection::Outgoing => self.network.is_outgoing(end),
            TraverseDirection::Incoming => self.network.is_incoming(end),
        }
    }

    fn push_frame(&mut self, exit: SegmentEnd, via_initial_start_node: bool) {
        let Some(node) = self.network.end_node(exit) else {
            return;
        };

        let candidates: Vec<SegmentId> = self
            .network
            .incident_segments(node)
            .into_iter()
            .filter(|segment| *segment != exit.segment)
            .collect();

        if self.stop == SegmentStopCriterion::Junction && candidates.len() > 1 {
            return;
        }

        self.stack.push(Frame {
            exit,
            node,
            via_initial_start_node,
            candidates,
            cursor: 0,
        });
    }
}

impl<N: NetworkQuery + ?Sized> Iterator for SegmentTraverser<'_, N> {
    type Item = VisitData;

    fn next(&mut self) -> Option<VisitData> {
        if !self.started {
            self.started = true;
            if !self.network.is_segment_valid(self.start) {
                return None;
            }
            self.visited.insert(self.start);
            for start_node in [true, false] {
                let end = SegmentEnd::new(self.start, start_node);
                if self.admits_root(end) {
                    self.roots.push_back(end);
                }
            }
            return Some(VisitData {
                prev_segment: self.start,
                cur_segment: self.start,
                via_initial_start_node: false,
                via_start_node: false,
                initial: true,
            });
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                let root = self.roots.pop_front()?;
                self.push_frame(root, root.start_node);
                continue;
            };

            if frame.cursor >= frame.candidates.len() {
                self.stack.pop();
                continue;
            }

            let next = frame.candidates[frame.cursor];
            frame.cursor += 1;
            let exit = frame.exit;
            let node = frame.node;
            let via_initial_start_node = frame.via_initial_start_node;

            if self.visited.contains(&next) {
                continue;
            }

            // A rejected candidate stays unvisited; another node may reach it
            // straight ahead
            let Some(next_end) = self.network.segment_end_at(next, node) else {
                continue;
            };
            if !self.admits_next(next_end) {
                continue;
            }
            if !self.side.admits(arrow_direction(self.network, exit, next)) {
                continue;
            }

            self.visited.insert(next);
            self.push_frame(next_end.opposite(), via_initial_start_node);
            return Some(VisitData {
                prev_segment: exit.segment,
                cur_segment: next,
                via_initial_start_node,
                via_start_node: next_end.start_node,
                initial: false,
            });
        }
    }
}

/// Walks from `start` and calls `visit` for each reached segment until it
/// returns `false` or the walk is exhausted. Returns the number of visits.
pub fn traverse<N, F>(
    network: &N,
    start: SegmentId,
    direction: TraverseDirection,
    side: TraverseSide,
    stop: SegmentStopCriterion,
    mut visit: F,
) -> usize
where
    N: NetworkQuery + ?Sized,
    F: FnMut(&VisitData) -> bool,
{
    let mut visits = 0;
    for data in SegmentTraverser::new(network, start, direction, side, stop) {
        visits += 1;
        if !visit(&data) {
            break;
        }
    }
    visits
}
