//! Road network rule engine
//!
//! Junction classification, segment traversal and rule propagation over a
//! host-owned road network. The host plugs in through `NetworkQuery`,
//! `LaneQuery` and `RuleSink`; `SimRoadNetwork` and `SimRuleStore` are the
//! in-memory implementations used by the CLI and the tests.

mod accessor;
mod direction;
mod junction_rules;
mod lane_arrows_record;
mod lanes;
mod priority_signs;
mod road_network;
mod roundabout;
mod rule_sink;
mod rule_store;
mod scenarios;
mod tool;
mod traverser;
mod types;

// Re-exported for hosts embedding the engine; the CLI uses only part of it
#[allow(unused_imports)]
pub use accessor::{LaneInfo, LaneQuery, NetworkQuery};
#[allow(unused_imports)]
pub use direction::{arrow_direction, classify_turn};
pub use junction_rules::{
    car_lane_count, classify_junction, compare_segments, fix_junction, fix_major_segment,
    fix_minor_segment, fix_roundabout, fix_roundabout_ring, fix_segment_lanes,
    is_highway_junction, lane_arrows_for, mass_edit, propagate_main_road, rank_by_size,
    IneligibleReason, JunctionClassification, LaneFixOutcome,
};
#[allow(unused_imports)]
pub use lane_arrows_record::LaneArrowsRecord;
#[allow(unused_imports)]
pub use lanes::{arriving_lanes, count_target_lanes_toward, departing_lanes, sorted_lanes, LanePos};
#[allow(unused_imports)]
pub use priority_signs::{
    count_priority_signs_at_node, cycle_priority_sign, has_node_priority_sign,
    next_priority_sign, priority_node_ids, remove_priority_signs_from_node, set_priority_sign,
    PrioritySignsMassEditMode,
};
pub use road_network::{SegmentSpec, SimNode, SimRoadNetwork, SimSegment, LANE_WIDTH};
#[allow(unused_imports)]
pub use roundabout::RoundaboutTraverser;
#[allow(unused_imports)]
pub use rule_sink::{RuleSink, SetPrioritySignError};
#[allow(unused_imports)]
pub use rule_store::{JunctionRestrictions, SimRuleStore};
#[allow(unused_imports)]
pub use scenarios::Scenario;
#[allow(unused_imports)]
pub use tool::{ClickTarget, Modifiers, PrioritySignsTool, ToolOutcome};
#[allow(unused_imports)]
pub use traverser::{traverse, SegmentStopCriterion, SegmentTraverser, TraverseDirection};
pub use types::{
    ArrowDirection, Direction, LaneArrows, LaneDirection, LaneId, LaneTypes, NodeId, NodeKind,
    Position, PriorityType, SegmentEnd, SegmentGeometry, SegmentId, TraverseSide, VehicleTypes,
    VisitData, FORWARD_ANGLE_THRESHOLD_DEG, LANE_TYPES, MAX_NODE_SEGMENTS, VEHICLE_TYPES,
};
