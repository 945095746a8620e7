//! Lane enumeration at segment ends

use ordered_float::OrderedFloat;

use super::accessor::{LaneQuery, NetworkQuery};
use super::direction::arrow_direction;
use super::types::{
    ArrowDirection, LaneDirection, LaneId, LaneTypes, NodeId, SegmentEnd, SegmentId,
    VehicleTypes, LANE_TYPES, VEHICLE_TYPES,
};

/// A lane and its ordinal among the lanes arriving at one segment end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanePos {
    pub lane_id: LaneId,
    /// 0 is the leftmost lane from the driver's point of view
    pub ordinal: usize,
    pub position: f32,
}

/// Lanes of `segment` whose traffic flows towards the given end, filtered by
/// lane and vehicle type.
///
/// With `sort` the result runs from the driver's left to right; without it
/// the host's storage order is kept.
pub fn sorted_lanes<N>(
    network: &N,
    segment: SegmentId,
    start_node: bool,
    lane_types: LaneTypes,
    vehicle_types: VehicleTypes,
    sort: bool,
) -> Vec<LanePos>
where
    N: LaneQuery + ?Sized,
{
    // Lanes reaching the start node travel backwards along the segment
    let towards = if start_node {
        LaneDirection::Backward
    } else {
        LaneDirection::Forward
    };

    let mut lanes: Vec<(LaneId, f32)> = network
        .segment_lanes(segment)
        .into_iter()
        .filter(|lane| {
            lane.direction == towards
                && lane.lane_types.intersects(lane_types)
                && lane.vehicle_types.intersects(vehicle_types)
        })
        .map(|lane| (lane.id, lane.position))
        .collect();

    if sort {
        // A driver heading to the end node has positive offsets on the right
        match towards {
            LaneDirection::Forward => lanes.sort_by_key(|(_, position)| OrderedFloat(*position)),
            LaneDirection::Backward => {
                lanes.sort_by_key(|(_, position)| std::cmp::Reverse(OrderedFloat(*position)))
            }
        }
    }

    lanes
        .into_iter()
        .enumerate()
        .map(|(ordinal, (lane_id, position))| LanePos {
            lane_id,
            ordinal,
            position,
        })
        .collect()
}

/// Car lanes arriving at a segment end, left to right
pub fn arriving_lanes<N>(network: &N, end: SegmentEnd) -> Vec<LanePos>
where
    N: LaneQuery + ?Sized,
{
    sorted_lanes(
        network,
        end.segment,
        end.start_node,
        LANE_TYPES,
        VEHICLE_TYPES,
        true,
    )
}

/// Car lanes of `end.segment` leaving its node, left to right.
///
/// These are the lanes that arrive at the opposite end.
pub fn departing_lanes<N>(network: &N, end: SegmentEnd) -> Vec<LanePos>
where
    N: LaneQuery + ?Sized,
{
    arriving_lanes(network, end.opposite())
}

/// Number of car lanes on other segments at `node` that a vehicle arriving
/// on `segment` reaches by turning in `direction`
pub fn count_target_lanes_toward<N>(
    network: &N,
    segment: SegmentId,
    node: NodeId,
    direction: ArrowDirection,
) -> usize
where
    N: NetworkQuery + LaneQuery + ?Sized,
{
    let Some(from) = network.segment_end_at(segment, node) else {
        return 0;
    };

    network
        .incident_segments(node)
        .into_iter()
        .filter(|other| *other != segment)
        .filter(|other| arrow_direction(network, from, *other) == direction)
        .filter_map(|other| network.segment_end_at(other, node))
        .map(|other_end| departing_lanes(network, other_end).len())
        .sum()
}
