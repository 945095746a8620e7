//! In-memory road network store
//!
//! Reference host for the rule engine: owns nodes, segments and lanes and
//! exposes them through `NetworkQuery` and `LaneQuery`. Topology is kept in a
//! petgraph graph; each node additionally keeps the fixed slot array the
//! engine reads.

use anyhow::{bail, Context, Result};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

use super::accessor::{LaneInfo, LaneQuery, NetworkQuery};
use super::types::{
    Direction, LaneDirection, LaneId, LaneTypes, NodeId, Position, SegmentGeometry, SegmentId,
    VehicleTypes, MAX_NODE_SEGMENTS,
};

/// Width of one driving lane in world units
pub const LANE_WIDTH: f32 = 3.0;

/// Road type used when creating a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpec {
    pub half_width: f32,
    pub forward_lanes: u8,
    pub backward_lanes: u8,
    pub highway: bool,
    pub sidewalks: bool,
}

impl SegmentSpec {
    /// Two-way road with `lanes_per_direction` car lanes each way
    pub fn two_way(half_width: f32, lanes_per_direction: u8) -> Self {
        Self {
            half_width,
            forward_lanes: lanes_per_direction,
            backward_lanes: lanes_per_direction,
            highway: false,
            sidewalks: true,
        }
    }

    /// One-way road flowing from the start node to the end node
    pub fn one_way(half_width: f32, lanes: u8) -> Self {
        Self {
            half_width,
            forward_lanes: lanes,
            backward_lanes: 0,
            highway: false,
            sidewalks: true,
        }
    }

    /// One-way road flowing from the end node to the start node
    pub fn one_way_inverted(half_width: f32, lanes: u8) -> Self {
        Self {
            half_width,
            forward_lanes: 0,
            backward_lanes: lanes,
            highway: false,
            sidewalks: true,
        }
    }

    /// One-way highway without sidewalks
    pub fn highway(half_width: f32, lanes: u8) -> Self {
        Self {
            half_width,
            forward_lanes: lanes,
            backward_lanes: 0,
            highway: true,
            sidewalks: false,
        }
    }

    pub fn is_one_way(&self) -> bool {
        (self.forward_lanes == 0) != (self.backward_lanes == 0)
    }
}

/// A node in the store
#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: NodeId,
    pub position: Position,
    pub segments: [SegmentId; MAX_NODE_SEGMENTS],
}

/// A segment in the store
#[derive(Debug, Clone)]
pub struct SimSegment {
    pub id: SegmentId,
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub spec: SegmentSpec,
    pub start_direction: Direction,
    pub end_direction: Direction,
    pub lanes: Vec<LaneId>,
}

impl SimSegment {
    pub fn geometry(&self) -> SegmentGeometry {
        SegmentGeometry {
            half_width: self.spec.half_width,
            forward_lanes: self.spec.forward_lanes,
            backward_lanes: self.spec.backward_lanes,
            one_way: self.spec.is_one_way(),
            inverted: self.spec.is_one_way() && self.spec.forward_lanes == 0,
            highway: self.spec.highway,
            start_direction: self.start_direction,
            end_direction: self.end_direction,
        }
    }
}

/// Road network store backed by a petgraph graph
#[derive(Default)]
pub struct SimRoadNetwork {
    /// Undirected topology; edge weights are segment ids
    graph: StableUnGraph<NodeId, SegmentId>,

    node_to_index: HashMap<NodeId, NodeIndex>,

    segment_to_edge: HashMap<SegmentId, EdgeIndex>,

    /// Ordered so iteration and summaries are deterministic
    nodes: BTreeMap<NodeId, SimNode>,

    segments: BTreeMap<SegmentId, SimSegment>,

    lanes: HashMap<LaneId, LaneInfo>,

    next_node_id: u16,
    next_segment_id: u16,
    next_lane_id: u32,
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self {
            next_node_id: 1,
            next_segment_id: 1,
            next_lane_id: 1,
            ..Self::default()
        }
    }

    /// Adds a node at a position
    pub fn add_node(&mut self, position: Position) -> Result<NodeId> {
        if self.next_node_id == u16::MAX {
            bail!("Node id space exhausted");
        }
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let index = self.graph.add_node(id);
        self.node_to_index.insert(id, index);
        self.nodes.insert(
            id,
            SimNode {
                id,
                position,
                segments: [SegmentId::NONE; MAX_NODE_SEGMENTS],
            },
        );
        Ok(id)
    }

    /// Adds a straight segment between two nodes and creates its lanes
    pub fn add_segment(
        &mut self,
        start_node: NodeId,
        end_node: NodeId,
        spec: SegmentSpec,
    ) -> Result<SegmentId> {
        if start_node == end_node {
            bail!("Segment cannot start and end at {}", start_node);
        }
        if spec.forward_lanes == 0 && spec.backward_lanes == 0 && !spec.sidewalks {
            bail!("Segment needs at least one lane");
        }

        let start = self
            .nodes
            .get(&start_node)
            .with_context(|| format!("Start {} not found", start_node))?;
        let end = self
            .nodes
            .get(&end_node)
            .with_context(|| format!("End {} not found", end_node))?;

        let start_slot = free_slot(start)
            .with_context(|| format!("{} has no free segment slot", start_node))?;
        let end_slot =
            free_slot(end).with_context(|| format!("{} has no free segment slot", end_node))?;

        if self.next_segment_id == u16::MAX {
            bail!("Segment id space exhausted");
        }

        let start_direction = start.position.direction_to(&end.position);
        let end_direction = end.position.direction_to(&start.position);

        let start_index = *self
            .node_to_index
            .get(&start_node)
            .context("Start node missing from graph")?;
        let end_index = *self
            .node_to_index
            .get(&end_node)
            .context("End node missing from graph")?;

        let id = SegmentId(self.next_segment_id);
        self.next_segment_id += 1;

        let edge = self.graph.add_edge(start_index, end_index, id);
        self.segment_to_edge.insert(id, edge);

        if let Some(node) = self.nodes.get_mut(&start_node) {
            node.segments[start_slot] = id;
        }
        if let Some(node) = self.nodes.get_mut(&end_node) {
            node.segments[end_slot] = id;
        }

        let lanes = self.create_lanes(id, &spec);
        self.segments.insert(
            id,
            SimSegment {
                id,
                start_node,
                end_node,
                spec,
                start_direction,
                end_direction,
                lanes,
            },
        );

        Ok(id)
    }

    /// Lays out car lanes (backward lanes left of the centre line, forward
    /// lanes right of it) plus optional sidewalks
    fn create_lanes(&mut self, segment: SegmentId, spec: &SegmentSpec) -> Vec<LaneId> {
        let mut layout: Vec<(f32, LaneDirection, LaneTypes, VehicleTypes)> = Vec::new();

        if spec.is_one_way() {
            let count = spec.forward_lanes.max(spec.backward_lanes);
            let direction = if spec.forward_lanes > 0 {
                LaneDirection::Forward
            } else {
                LaneDirection::Backward
            };
            let centre = (f32::from(count) - 1.0) / 2.0;
            for i in 0..count {
                let position = (f32::from(i) - centre) * LANE_WIDTH;
                layout.push((position, direction, LaneTypes::VEHICLE, VehicleTypes::CAR));
            }
        } else {
            for i in 0..spec.backward_lanes {
                let position = -(f32::from(i) + 0.5) * LANE_WIDTH;
                layout.push((
                    position,
                    LaneDirection::Backward,
                    LaneTypes::VEHICLE,
                    VehicleTypes::CAR,
                ));
            }
            for i in 0..spec.forward_lanes {
                let position = (f32::from(i) + 0.5) * LANE_WIDTH;
                layout.push((
                    position,
                    LaneDirection::Forward,
                    LaneTypes::VEHICLE,
                    VehicleTypes::CAR,
                ));
            }
        }

        if spec.sidewalks {
            let edge = (spec.half_width - 1.0).max(0.0);
            let sides = [
                (-edge, LaneDirection::Backward),
                (edge, LaneDirection::Forward),
            ];
            for (position, direction) in sides {
                layout.push((position, direction, LaneTypes::PEDESTRIAN, VehicleTypes::NONE));
            }
        }

        layout
            .into_iter()
            .map(|(position, direction, lane_types, vehicle_types)| {
                let id = LaneId(self.next_lane_id);
                self.next_lane_id += 1;
                self.lanes.insert(
                    id,
                    LaneInfo {
                        id,
                        segment,
                        position,
                        direction,
                        lane_types,
                        vehicle_types,
                    },
                );
                id
            })
            .collect()
    }

    /// Overrides the direction vector at one end, e.g. to model a curve
    pub fn set_end_direction(
        &mut self,
        segment: SegmentId,
        start_node: bool,
        direction: Direction,
    ) -> Result<()> {
        let segment = self
            .segments
            .get_mut(&segment)
            .with_context(|| format!("{} not found", segment))?;
        if start_node {
            segment.start_direction = direction;
        } else {
            segment.end_direction = direction;
        }
        Ok(())
    }

    /// Removes a segment and its lanes
    pub fn remove_segment(&mut self, segment_id: SegmentId) -> Result<()> {
        let segment = self
            .segments
            .remove(&segment_id)
            .context("Segment not found")?;

        if let Some(edge) = self.segment_to_edge.remove(&segment_id) {
            self.graph.remove_edge(edge);
        }

        for node_id in [segment.start_node, segment.end_node] {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                for slot in node.segments.iter_mut() {
                    if *slot == segment_id {
                        *slot = SegmentId::NONE;
                    }
                }
            }
        }

        for lane in &segment.lanes {
            self.lanes.remove(lane);
        }

        Ok(())
    }

    /// Removes a node and every segment attached to it.
    /// Returns the removed segments.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Vec<SegmentId>> {
        let node = self.nodes.get(&node_id).context("Node not found")?;
        let attached: Vec<SegmentId> = node
            .segments
            .iter()
            .copied()
            .filter(|segment| segment.is_valid())
            .collect();

        for segment in &attached {
            self.remove_segment(*segment)?;
        }

        self.nodes.remove(&node_id);
        if let Some(index) = self.node_to_index.remove(&node_id) {
            self.graph.remove_node(index);
        }

        Ok(attached)
    }

    /// Finds a segment connecting two nodes, in either direction
    pub fn find_segment_between(&self, a: NodeId, b: NodeId) -> Option<SegmentId> {
        let a_index = self.node_to_index.get(&a)?;
        let b_index = self.node_to_index.get(&b)?;
        self.graph
            .edges_connecting(*a_index, *b_index)
            .map(|edge| *edge.weight())
            .next()
    }

    /// Nodes adjacent to `node` through any segment
    pub fn neighbours(&self, node: NodeId) -> Vec<NodeId> {
        let Some(index) = self.node_to_index.get(&node) else {
            return Vec::new();
        };
        let mut neighbours: Vec<NodeId> = self
            .graph
            .neighbors(*index)
            .filter_map(|neighbour| self.graph.node_weight(neighbour).copied())
            .collect();
        neighbours.sort();
        neighbours.dedup();
        neighbours
    }

    pub fn node(&self, node: NodeId) -> Option<&SimNode> {
        self.nodes.get(&node)
    }

    pub fn segment(&self, segment: SegmentId) -> Option<&SimSegment> {
        self.segments.get(&segment)
    }

    pub fn lane(&self, lane: LaneId) -> Option<&LaneInfo> {
        self.lanes.get(&lane)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SimNode> {
        self.nodes.values()
    }

    pub fn segments(&self) -> impl Iterator<Item = &SimSegment> {
        self.segments.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count_total(&self) -> usize {
        self.segments.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

fn free_slot(node: &SimNode) -> Option<usize> {
    node.segments.iter().position(|segment| !segment.is_valid())
}

impl NetworkQuery for SimRoadNetwork {
    fn is_node_valid(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_segments(&self, node: NodeId) -> [SegmentId; MAX_NODE_SEGMENTS] {
        self.nodes
            .get(&node)
            .map(|node| node.segments)
            .unwrap_or([SegmentId::NONE; MAX_NODE_SEGMENTS])
    }

    fn segment_nodes(&self, segment: SegmentId) -> Option<(NodeId, NodeId)> {
        self.segments
            .get(&segment)
            .map(|segment| (segment.start_node, segment.end_node))
    }

    fn segment_geometry(&self, segment: SegmentId) -> Option<SegmentGeometry> {
        self.segments.get(&segment).map(SimSegment::geometry)
    }
}

impl LaneQuery for SimRoadNetwork {
    fn segment_lanes(&self, segment: SegmentId) -> Vec<LaneInfo> {
        self.segments
            .get(&segment)
            .map(|segment| {
                segment
                    .lanes
                    .iter()
                    .filter_map(|lane| self.lanes.get(lane).copied())
                    .collect()
            })
            .unwrap_or_default()
    }
}
