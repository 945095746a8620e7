//! Roundabout detection by walking a one-way ring

use std::collections::HashSet;

use super::accessor::NetworkQuery;
use super::direction::arrow_direction;
use super::types::{ArrowDirection, SegmentEnd, SegmentGeometry, SegmentId};

/// Half widths closer than this are treated as the same road type
const WIDTH_TOLERANCE: f32 = 0.01;

pub struct RoundaboutTraverser;

impl RoundaboutTraverser {
    /// Segments of the ring containing `start`, in driving order starting
    /// with `start`, or `None` if `start` is not part of a roundabout.
    ///
    /// From the head end of each segment the walk takes the one-way
    /// continuation that keeps the same width and lane count, preferring a
    /// straight one over a left turn. It fails as soon as no continuation
    /// exists or the walk loops back onto a segment other than `start`.
    pub fn ring_segments<N>(network: &N, start: SegmentId) -> Option<Vec<SegmentId>>
    where
        N: NetworkQuery + ?Sized,
    {
        let start_geometry = network.segment_geometry(start)?;
        if !start_geometry.one_way {
            return None;
        }

        let mut ring = vec![start];
        let mut seen: HashSet<SegmentId> = HashSet::from([start]);
        let mut current = start;
        let mut current_geometry = start_geometry;

        loop {
            let head = network.head_end(current)?;
            let next = Self::continuation(network, head, &current_geometry)?;

            if next == start {
                return Some(ring);
            }
            if !seen.insert(next) {
                return None;
            }

            ring.push(next);
            current = next;
            current_geometry = network.segment_geometry(next)?;
        }
    }

    pub fn is_roundabout<N>(network: &N, start: SegmentId) -> bool
    where
        N: NetworkQuery + ?Sized,
    {
        Self::ring_segments(network, start).is_some()
    }

    /// Calls `visit` for every ring segment if `start` lies on a roundabout.
    /// Returns `false` when there is no ring or a visit returned `false`.
    pub fn traverse_around<N, F>(network: &N, start: SegmentId, mut visit: F) -> bool
    where
        N: NetworkQuery + ?Sized,
        F: FnMut(SegmentId) -> bool,
    {
        let Some(ring) = Self::ring_segments(network, start) else {
            return false;
        };
        ring.into_iter().all(|segment| visit(segment))
    }

    fn continuation<N>(
        network: &N,
        head: SegmentEnd,
        geometry: &SegmentGeometry,
    ) -> Option<SegmentId>
    where
        N: NetworkQuery + ?Sized,
    {
        let node = network.end_node(head)?;

        let candidates: Vec<(SegmentId, ArrowDirection)> = network
            .incident_segments(node)
            .into_iter()
            .filter(|segment| *segment != head.segment)
            .filter(|segment| {
                let Some(other) = network.segment_geometry(*segment) else {
                    return false;
                };
                other.one_way
                    && (other.half_width - geometry.half_width).abs() < WIDTH_TOLERANCE
                    && other.car_lane_count() == geometry.car_lane_count()
            })
            .filter(|segment| {
                network
                    .segment_end_at(*segment, node)
                    .is_some_and(|end| network.is_outgoing(end))
            })
            .map(|segment| (segment, arrow_direction(network, head, segment)))
            .collect();

        [ArrowDirection::Forward, ArrowDirection::Left]
            .into_iter()
            .find_map(|wanted| {
                candidates
                    .iter()
                    .find(|(_, direction)| *direction == wanted)
                    .map(|(segment, _)| *segment)
            })
    }
}
