//! Turning relation between segments meeting at a node

use super::accessor::NetworkQuery;
use super::types::{ArrowDirection, Direction, SegmentEnd, SegmentId, FORWARD_ANGLE_THRESHOLD_DEG};

/// Classifies a turn from one segment into another at their shared node.
///
/// Both directions point from the node into their segment, so a vehicle
/// arrives along `from_dir` reversed and leaves along `to_dir`. Nearly
/// opposite vectors mean going straight; otherwise the sign of the cross
/// product of travel-in and travel-out picks the side.
pub fn classify_turn(from_dir: Direction, to_dir: Direction) -> ArrowDirection {
    if from_dir.angle_deg(to_dir) > FORWARD_ANGLE_THRESHOLD_DEG {
        return ArrowDirection::Forward;
    }

    if from_dir.reversed().cross(to_dir) > 0.0 {
        ArrowDirection::Left
    } else {
        ArrowDirection::Right
    }
}

/// Turning relation from the segment end `from` to `to_segment` at the node
/// of `from`.
///
/// Returns `Turn` for the same segment and `None` when `to_segment` does not
/// touch that node.
pub fn arrow_direction<N>(network: &N, from: SegmentEnd, to_segment: SegmentId) -> ArrowDirection
where
    N: NetworkQuery + ?Sized,
{
    if to_segment == from.segment {
        return ArrowDirection::Turn;
    }

    let Some(node) = network.end_node(from) else {
        return ArrowDirection::None;
    };
    let Some(to_end) = network.segment_end_at(to_segment, node) else {
        return ArrowDirection::None;
    };
    let (Some(from_geometry), Some(to_geometry)) = (
        network.segment_geometry(from.segment),
        network.segment_geometry(to_segment),
    ) else {
        return ArrowDirection::None;
    };

    classify_turn(
        from_geometry.direction_at(from.start_node),
        to_geometry.direction_at(to_end.start_node),
    )
}
