//! Read-only view of the host's road network
//!
//! The rule engine never owns the network. Everything it needs to know about
//! nodes, segments and lanes comes through these two traits, which the host
//! implements over its own storage.

use super::types::{
    LaneDirection, LaneId, LaneTypes, NodeId, NodeKind, SegmentEnd, SegmentGeometry, SegmentId,
    VehicleTypes, MAX_NODE_SEGMENTS,
};

/// A lane as stored by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneInfo {
    pub id: LaneId,
    pub segment: SegmentId,
    /// Lateral offset from the segment centre line, positive to the right
    /// when looking from the start node towards the end node
    pub position: f32,
    pub direction: LaneDirection,
    pub lane_types: LaneTypes,
    pub vehicle_types: VehicleTypes,
}

/// Graph queries over nodes and segments
pub trait NetworkQuery {
    fn is_node_valid(&self, node: NodeId) -> bool;

    /// All valid nodes, in ascending id order
    fn node_ids(&self) -> Vec<NodeId>;

    /// The fixed slot array of a node; empty slots hold `SegmentId::NONE`
    fn node_segments(&self, node: NodeId) -> [SegmentId; MAX_NODE_SEGMENTS];

    /// (start node, end node) of a segment
    fn segment_nodes(&self, segment: SegmentId) -> Option<(NodeId, NodeId)>;

    fn segment_geometry(&self, segment: SegmentId) -> Option<SegmentGeometry>;

    fn is_segment_valid(&self, segment: SegmentId) -> bool {
        self.segment_nodes(segment).is_some()
    }

    /// Non-empty slots of a node, in slot order
    fn incident_segments(&self, node: NodeId) -> Vec<SegmentId> {
        self.node_segments(node)
            .into_iter()
            .filter(|segment| segment.is_valid())
            .collect()
    }

    fn segment_count(&self, node: NodeId) -> usize {
        self.node_segments(node)
            .iter()
            .filter(|segment| segment.is_valid())
            .count()
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        NodeKind::from_segment_count(self.segment_count(node))
    }

    /// Whether `node` is the start node of `segment`; `None` when the node is
    /// not an endpoint of the segment
    fn is_start_node(&self, segment: SegmentId, node: NodeId) -> Option<bool> {
        let (start, end) = self.segment_nodes(segment)?;
        if start == node {
            Some(true)
        } else if end == node {
            Some(false)
        } else {
            None
        }
    }

    fn segment_node(&self, segment: SegmentId, start_node: bool) -> Option<NodeId> {
        let (start, end) = self.segment_nodes(segment)?;
        Some(if start_node { start } else { end })
    }

    fn end_node(&self, end: SegmentEnd) -> Option<NodeId> {
        self.segment_node(end.segment, end.start_node)
    }

    /// The end of `segment` that touches `node`
    fn segment_end_at(&self, segment: SegmentId, node: NodeId) -> Option<SegmentEnd> {
        self.is_start_node(segment, node)
            .map(|start_node| SegmentEnd::new(segment, start_node))
    }

    fn is_one_way(&self, segment: SegmentId) -> bool {
        self.segment_geometry(segment)
            .is_some_and(|geometry| geometry.one_way)
    }

    fn is_highway(&self, segment: SegmentId) -> bool {
        self.segment_geometry(segment)
            .is_some_and(|geometry| geometry.highway)
    }

    /// The end traffic flows towards: the start end for inverted segments,
    /// the end end otherwise
    fn head_end(&self, segment: SegmentId) -> Option<SegmentEnd> {
        let geometry = self.segment_geometry(segment)?;
        Some(SegmentEnd::new(segment, geometry.inverted))
    }

    /// Traffic flows from the segment into the node at this end
    fn is_incoming(&self, end: SegmentEnd) -> bool {
        self.segment_geometry(end.segment).is_some_and(|geometry| {
            if end.start_node {
                geometry.backward_lanes > 0
            } else {
                geometry.forward_lanes > 0
            }
        })
    }

    /// Traffic flows from the node into the segment at this end
    fn is_outgoing(&self, end: SegmentEnd) -> bool {
        self.segment_geometry(end.segment).is_some_and(|geometry| {
            if end.start_node {
                geometry.forward_lanes > 0
            } else {
                geometry.backward_lanes > 0
            }
        })
    }
}

/// Lane queries
pub trait LaneQuery {
    /// Lanes of a segment in the host's storage order
    fn segment_lanes(&self, segment: SegmentId) -> Vec<LaneInfo>;
}
