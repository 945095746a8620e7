//! Mutations the rule engine performs on the host
//!
//! Every setter reports success as a `bool`. A `false` means the host
//! rejected the change; the engine logs it and moves on.

use std::fmt;

use super::types::{LaneArrows, LaneId, NodeId, PriorityType, SegmentEnd};

/// Why a node may not carry priority signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetPrioritySignError {
    InvalidNode,
    HasTrafficLights,
    HasTimedLight,
}

impl fmt::Display for SetPrioritySignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetPrioritySignError::InvalidNode => write!(f, "node does not exist"),
            SetPrioritySignError::HasTrafficLights => write!(f, "node has traffic lights"),
            SetPrioritySignError::HasTimedLight => write!(f, "node has timed traffic light script"),
        }
    }
}

impl std::error::Error for SetPrioritySignError {}

pub trait RuleSink {
    fn may_node_have_priority_signs(&self, node: NodeId) -> Result<(), SetPrioritySignError>;

    fn set_priority_sign(&mut self, end: SegmentEnd, sign: PriorityType) -> bool;

    fn priority_sign(&self, end: SegmentEnd) -> PriorityType;

    fn set_lane_arrows(&mut self, lane: LaneId, arrows: LaneArrows) -> bool;

    /// Arrows explicitly set on a lane, if any
    fn lane_arrows(&self, lane: LaneId) -> Option<LaneArrows>;

    /// Connects `source` to `target` at the end of the source segment given by
    /// `source_start_node`
    fn add_lane_connection(
        &mut self,
        source: LaneId,
        target: LaneId,
        source_start_node: bool,
    ) -> bool;

    fn set_entering_blocked_junction_allowed(&mut self, end: SegmentEnd, allowed: bool) -> bool;

    fn set_pedestrian_crossing_allowed(&mut self, end: SegmentEnd, allowed: bool) -> bool;

    fn set_lane_changing_allowed_when_going_straight(&mut self, end: SegmentEnd, allowed: bool)
        -> bool;
}
