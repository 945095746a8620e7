//! Junction classification and rule propagation
//!
//! Given a node, decide which incident roads form the main road and which
//! ones yield, then push priority signs, lane arrows, lane connections and
//! junction restrictions onto a `RuleSink`. Every failure is a no-op: the
//! engine either applies a complete rule set or leaves the network alone.

use log::{debug, warn};
use std::cmp::Ordering;

use super::accessor::{LaneQuery, NetworkQuery};
use super::direction::arrow_direction;
use super::lanes::{arriving_lanes, count_target_lanes_toward, departing_lanes};
use super::roundabout::RoundaboutTraverser;
use super::rule_sink::{RuleSink, SetPrioritySignError};
use super::traverser::{traverse, SegmentStopCriterion, TraverseDirection};
use super::types::{
    ArrowDirection, LaneArrows, LaneId, NodeId, NodeKind, PriorityType, SegmentEnd, SegmentId,
    TraverseSide, VisitData, LANE_TYPES, VEHICLE_TYPES,
};

/// Why a node was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    InvalidNode,
    /// Through-roads and dead ends get no priority signs
    NotAJunction { segment_count: usize },
    /// The two largest roads are not larger than the third one
    AmbiguousSizing,
    /// The main road would be one-way
    OneWayMajorRoad,
    SignsNotAllowed(SetPrioritySignError),
}

/// Outcome of classifying a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JunctionClassification {
    Ineligible(IneligibleReason),
    MajorMinorSplit {
        /// The two largest roads, largest first
        major: Vec<SegmentId>,
        minor: Vec<SegmentId>,
    },
}

impl JunctionClassification {
    pub fn is_applicable(&self) -> bool {
        matches!(self, JunctionClassification::MajorMinorSplit { .. })
    }
}

/// What `fix_segment_lanes` did at a segment's head end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneFixOutcome {
    Skipped,
    /// Lanes were stitched 1:1 onto the only other segment
    Connected(usize),
    /// Lane counts differ across the through-node; nothing was connected
    CountMismatch { source: usize, target: usize },
    /// Arrows were assigned to this many lanes at a junction
    Arrows(usize),
}

/// Size of a segment for ranking purposes
#[derive(Debug, Clone, Copy)]
struct SegmentSize {
    segment: SegmentId,
    half_width: f32,
    car_lanes: i32,
}

/// Car lanes of a segment in both directions
pub fn car_lane_count<N>(network: &N, segment: SegmentId) -> usize
where
    N: LaneQuery + ?Sized,
{
    network
        .segment_lanes(segment)
        .iter()
        .filter(|lane| {
            lane.lane_types.intersects(LANE_TYPES) && lane.vehicle_types.intersects(VEHICLE_TYPES)
        })
        .count()
}

/// Negative when `a` is the larger road. Half widths are compared by the
/// ceiling of their difference; lane counts break ties.
fn compare_sizes(a: &SegmentSize, b: &SegmentSize) -> i32 {
    let diff = (b.half_width - a.half_width).ceil() as i32;
    if diff != 0 {
        return diff;
    }
    b.car_lanes - a.car_lanes
}

/// Compares two segments by size, larger first
pub fn compare_segments<N>(network: &N, a: SegmentId, b: SegmentId) -> Ordering
where
    N: NetworkQuery + LaneQuery + ?Sized,
{
    match (segment_size(network, a), segment_size(network, b)) {
        (Some(a), Some(b)) => compare_sizes(&a, &b).cmp(&0),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn segment_size<N>(network: &N, segment: SegmentId) -> Option<SegmentSize>
where
    N: NetworkQuery + LaneQuery + ?Sized,
{
    let geometry = network.segment_geometry(segment)?;
    Some(SegmentSize {
        segment,
        half_width: geometry.half_width,
        car_lanes: car_lane_count(network, segment) as i32,
    })
}

/// Orders segments from largest to smallest.
///
/// The width comparison is neither antisymmetric nor transitive across
/// fractional widths, so this is a stable insertion sort that only relies on
/// pairwise answers.
pub fn rank_by_size<N>(network: &N, segments: &[SegmentId]) -> Vec<SegmentId>
where
    N: NetworkQuery + LaneQuery + ?Sized,
{
    let mut sizes: Vec<SegmentSize> = segments
        .iter()
        .filter_map(|segment| segment_size(network, *segment))
        .collect();

    for i in 1..sizes.len() {
        let mut j = i;
        while j > 0 && compare_sizes(&sizes[j - 1], &sizes[j]) > 0 {
            sizes.swap(j - 1, j);
            j -= 1;
        }
    }

    sizes.into_iter().map(|size| size.segment).collect()
}

/// Decides the major/minor split of a node without touching anything
pub fn classify_junction<N, S>(network: &N, sink: &S, node: NodeId) -> JunctionClassification
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    use JunctionClassification::Ineligible;

    if !node.is_valid() || !network.is_node_valid(node) {
        return Ineligible(IneligibleReason::InvalidNode);
    }

    let segments = network.incident_segments(node);
    if NodeKind::from_segment_count(segments.len()) != NodeKind::Junction {
        return Ineligible(IneligibleReason::NotAJunction {
            segment_count: segments.len(),
        });
    }

    let ranked = rank_by_size(network, &segments);
    if ranked.len() < 3 {
        return Ineligible(IneligibleReason::NotAJunction {
            segment_count: ranked.len(),
        });
    }

    if compare_segments(network, ranked[0], ranked[2]) == Ordering::Equal {
        return Ineligible(IneligibleReason::AmbiguousSizing);
    }

    if network.is_one_way(ranked[0]) || network.is_one_way(ranked[1]) {
        return Ineligible(IneligibleReason::OneWayMajorRoad);
    }

    if let Err(reason) = sink.may_node_have_priority_signs(node) {
        return Ineligible(IneligibleReason::SignsNotAllowed(reason));
    }

    JunctionClassification::MajorMinorSplit {
        major: ranked[..2].to_vec(),
        minor: ranked[2..].to_vec(),
    }
}

/// Classifies `node` and, if it qualifies, makes the two largest roads the
/// main road and every other road yield
pub fn fix_junction<N, S>(network: &N, sink: &mut S, node: NodeId) -> JunctionClassification
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let classification = classify_junction(network, &*sink, node);

    match &classification {
        JunctionClassification::Ineligible(reason) => {
            debug!("Leaving {} unchanged: {:?}", node, reason);
        }
        JunctionClassification::MajorMinorSplit { major, minor } => {
            debug!("Fixing {}: major={:?} minor={:?}", node, major, minor);
            for segment in major {
                fix_major_segment(network, sink, *segment, node);
            }
            for segment in minor {
                fix_minor_segment(network, sink, *segment, node);
            }
        }
    }

    classification
}

/// Main road approach: priority, may enter a blocked junction, no pedestrian
/// crossing, straight ahead on every lane and a right turn from the rightmost
/// lane when one is possible. Left turns are never granted.
pub fn fix_major_segment<N, S>(network: &N, sink: &mut S, segment: SegmentId, node: NodeId)
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let Some(end) = network.segment_end_at(segment, node) else {
        return;
    };

    set_entering_blocked(sink, end, true);
    set_pedestrian_crossing(sink, end, false);
    set_sign(sink, end, PriorityType::Main);

    let right_targets = count_target_lanes_toward(network, segment, node, ArrowDirection::Right);
    let lanes = arriving_lanes(network, end);

    for lane in &lanes {
        set_arrows(sink, lane.lane_id, LaneArrows::FORWARD);
    }
    if let Some(rightmost) = lanes.last() {
        if right_targets > 0 {
            set_arrows(sink, rightmost.lane_id, LaneArrows::FORWARD_RIGHT);
        }
    }
}

/// Side road approach: yield, and right turns only
pub fn fix_minor_segment<N, S>(network: &N, sink: &mut S, segment: SegmentId, node: NodeId)
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let Some(end) = network.segment_end_at(segment, node) else {
        return;
    };

    set_sign(sink, end, PriorityType::Yield);

    for lane in arriving_lanes(network, end) {
        set_arrows(sink, lane.lane_id, LaneArrows::RIGHT);
    }
}

/// Arrows for `lane_count` lanes at a junction approach, leftmost first
pub fn lane_arrows_for(lane_count: usize, has_right: bool, has_left: bool) -> Vec<LaneArrows> {
    match lane_count {
        0 => Vec::new(),
        1 => {
            let mut arrows = LaneArrows::FORWARD;
            if has_right {
                arrows |= LaneArrows::RIGHT;
            }
            if has_left {
                arrows |= LaneArrows::LEFT;
            }
            vec![arrows]
        }
        2 => match (has_right, has_left) {
            (true, true) => vec![LaneArrows::LEFT_FORWARD, LaneArrows::FORWARD_RIGHT],
            (true, false) => vec![LaneArrows::FORWARD, LaneArrows::RIGHT],
            (false, true) => vec![LaneArrows::LEFT, LaneArrows::FORWARD],
            (false, false) => vec![LaneArrows::FORWARD, LaneArrows::FORWARD],
        },
        n => {
            let mut arrows = vec![LaneArrows::FORWARD; n];
            if has_right {
                arrows[n - 1] = LaneArrows::RIGHT;
            }
            if has_left {
                arrows[0] = LaneArrows::LEFT;
            }
            arrows
        }
    }
}

/// Lane rules at the head end of a visited segment.
///
/// At a through-node the lanes are connected 1:1 onto the next segment when
/// both sides have the same number of lanes. At a junction each lane gets
/// arrows according to the turns available.
pub fn fix_segment_lanes<N, S>(network: &N, sink: &mut S, data: &VisitData) -> LaneFixOutcome
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let segment = data.cur_segment;
    let Some(head) = network.head_end(segment) else {
        return LaneFixOutcome::Skipped;
    };
    let Some(node) = network.end_node(head) else {
        return LaneFixOutcome::Skipped;
    };

    let is_junction = network.node_kind(node) == NodeKind::Junction;
    let source = arriving_lanes(network, head);
    debug!(
        "Lane fix on {} at {} (start_node={} junction={} lanes={})",
        segment,
        node,
        head.start_node,
        is_junction,
        source.len()
    );

    if !is_junction {
        let Some(other) = network
            .incident_segments(node)
            .into_iter()
            .find(|other| *other != segment)
        else {
            return LaneFixOutcome::Skipped;
        };
        let Some(other_end) = network.segment_end_at(other, node) else {
            return LaneFixOutcome::Skipped;
        };

        let target = departing_lanes(network, other_end);
        if source.len() != target.len() {
            debug!(
                "Not connecting {} to {}: {} source lanes, {} target lanes",
                segment,
                other,
                source.len(),
                target.len()
            );
            return LaneFixOutcome::CountMismatch {
                source: source.len(),
                target: target.len(),
            };
        }

        for (from, to) in source.iter().zip(target.iter()) {
            if !sink.add_lane_connection(from.lane_id, to.lane_id, head.start_node) {
                warn!(
                    "Lane connection {} -> {} was rejected",
                    from.lane_id, to.lane_id
                );
            }
        }
        return LaneFixOutcome::Connected(source.len());
    }

    let right_targets = count_target_lanes_toward(network, segment, node, ArrowDirection::Right);
    let left_targets = count_target_lanes_toward(network, segment, node, ArrowDirection::Left);

    let arrows = lane_arrows_for(source.len(), right_targets > 0, left_targets > 0);
    for (lane, arrows) in source.iter().zip(arrows) {
        set_arrows(sink, lane.lane_id, arrows);
    }

    LaneFixOutcome::Arrows(source.len())
}

/// True when every segment at the node is a highway
pub fn is_highway_junction<N>(network: &N, node: NodeId) -> bool
where
    N: NetworkQuery + ?Sized,
{
    network
        .incident_segments(node)
        .into_iter()
        .all(|segment| network.is_highway(segment))
}

/// Makes both ends of `segment` part of the main road and every road that
/// branches off (anything but straight ahead) yield to it
pub fn propagate_main_road<N, S>(network: &N, sink: &mut S, segment: SegmentId)
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    for start_node in [true, false] {
        let end = SegmentEnd::new(segment, start_node);
        set_sign(sink, end, PriorityType::Main);

        let Some(node) = network.end_node(end) else {
            continue;
        };

        set_pedestrian_crossing(sink, end, false);
        set_entering_blocked(sink, end, true);

        let highway = is_highway_junction(network, node);
        for other in network.incident_segments(node) {
            if other == segment {
                continue;
            }
            if arrow_direction(network, end, other) == ArrowDirection::Forward {
                continue;
            }
            let Some(other_end) = network.segment_end_at(other, node) else {
                continue;
            };
            set_sign(sink, other_end, PriorityType::Yield);
            if highway && !sink.set_lane_changing_allowed_when_going_straight(other_end, true) {
                warn!("Lane changing flag on {:?} was rejected", other_end);
            }
        }
    }
}

/// Follows traffic straight ahead from `segment` and turns the path into a
/// main road, fixing lanes along the way. Returns the number of segments
/// visited.
pub fn fix_roundabout<N, S>(network: &N, sink: &mut S, segment: SegmentId) -> usize
where
    N: NetworkQuery + LaneQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    if !network.is_segment_valid(segment) {
        return 0;
    }

    traverse(
        network,
        segment,
        TraverseDirection::Outgoing,
        TraverseSide::STRAIGHT,
        SegmentStopCriterion::None,
        |data| {
            fix_segment_lanes(network, sink, data);
            propagate_main_road(network, sink, data.cur_segment);
            true
        },
    )
}

/// Applies main road rules around the ring containing `segment`. Returns
/// `false` and changes nothing when `segment` is not on a roundabout.
pub fn fix_roundabout_ring<N, S>(network: &N, sink: &mut S, segment: SegmentId) -> bool
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let Some(ring) = RoundaboutTraverser::ring_segments(network, segment) else {
        debug!("{} is not part of a roundabout", segment);
        return false;
    };

    for ring_segment in &ring {
        propagate_main_road(network, sink, *ring_segment);
    }

    // The last ring segment marks the start segment's entry as yielding
    set_sign(sink, SegmentEnd::new(segment, true), PriorityType::Main);
    true
}

/// Walks straight along the road through `segment` in both directions,
/// giving every end on the path `primary` and every branching road
/// `secondary`. Returns the number of segments visited.
pub fn mass_edit<N, S>(
    network: &N,
    sink: &mut S,
    segment: SegmentId,
    primary: PriorityType,
    secondary: PriorityType,
) -> usize
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    traverse(
        network,
        segment,
        TraverseDirection::AnyDirection,
        TraverseSide::STRAIGHT,
        SegmentStopCriterion::None,
        |data| {
            for start_node in [true, false] {
                let end = SegmentEnd::new(data.cur_segment, start_node);
                set_sign(sink, end, primary);

                let Some(node) = network.end_node(end) else {
                    continue;
                };
                for other in network.incident_segments(node) {
                    if other == data.cur_segment
                        || arrow_direction(network, end, other) == ArrowDirection::Forward
                    {
                        continue;
                    }
                    if let Some(other_end) = network.segment_end_at(other, node) {
                        set_sign(sink, other_end, secondary);
                    }
                }
            }
            true
        },
    )
}

fn set_sign<S: RuleSink + ?Sized>(sink: &mut S, end: SegmentEnd, sign: PriorityType) {
    if !sink.set_priority_sign(end, sign) {
        debug!("Priority sign {:?} on {:?} was rejected", sign, end);
    }
}

fn set_arrows<S: RuleSink + ?Sized>(sink: &mut S, lane: LaneId, arrows: LaneArrows) {
    if !sink.set_lane_arrows(lane, arrows) {
        warn!("Lane arrows {:?} on {} were rejected", arrows, lane);
    }
}

fn set_entering_blocked<S: RuleSink + ?Sized>(sink: &mut S, end: SegmentEnd, allowed: bool) {
    if !sink.set_entering_blocked_junction_allowed(end, allowed) {
        warn!("Entering blocked junction flag on {:?} was rejected", end);
    }
}

fn set_pedestrian_crossing<S: RuleSink + ?Sized>(sink: &mut S, end: SegmentEnd, allowed: bool) {
    if !sink.set_pedestrian_crossing_allowed(end, allowed) {
        warn!("Pedestrian crossing flag on {:?} was rejected", end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_lane_gets_every_available_turn() {
        assert_eq!(lane_arrows_for(1, false, false), vec![LaneArrows::FORWARD]);
        assert_eq!(
            lane_arrows_for(1, true, true),
            vec![LaneArrows::LEFT_FORWARD_RIGHT]
        );
    }

    #[test]
    fn two_lanes_prefer_dedicated_turn_lane() {
        assert_eq!(
            lane_arrows_for(2, true, false),
            vec![LaneArrows::FORWARD, LaneArrows::RIGHT]
        );
        assert_eq!(
            lane_arrows_for(2, false, true),
            vec![LaneArrows::LEFT, LaneArrows::FORWARD]
        );
        assert_eq!(
            lane_arrows_for(2, true, true),
            vec![LaneArrows::LEFT_FORWARD, LaneArrows::FORWARD_RIGHT]
        );
    }

    #[test]
    fn wide_approach_keeps_middle_lanes_straight() {
        let arrows = lane_arrows_for(4, true, true);
        assert_eq!(arrows[0], LaneArrows::LEFT);
        assert_eq!(arrows[1], LaneArrows::FORWARD);
        assert_eq!(arrows[2], LaneArrows::FORWARD);
        assert_eq!(arrows[3], LaneArrows::RIGHT);
        assert!(lane_arrows_for(0, true, true).is_empty());
    }

    #[test]
    fn size_comparison_is_not_antisymmetric_for_fractional_widths() {
        let wide = SegmentSize {
            segment: SegmentId(1),
            half_width: 8.0,
            car_lanes: 2,
        };
        let slightly_narrower = SegmentSize {
            segment: SegmentId(2),
            half_width: 7.5,
            car_lanes: 4,
        };
        // ceil(-0.5) == 0, so the lane count decides
        assert!(compare_sizes(&wide, &slightly_narrower) > 0);
        // ceil(0.5) == 1, so the width decides
        assert!(compare_sizes(&slightly_narrower, &wide) > 0);
    }
}
