//! In-memory rule store
//!
//! Reference `RuleSink`: keeps priority signs, lane arrows, lane connections
//! and junction restrictions in plain maps. It knows which node each segment
//! end touches (see `sync_network`) so it can refuse signs at signalised
//! nodes the way the host game does.

use log::warn;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

use super::accessor::{LaneQuery, NetworkQuery};
use super::rule_sink::{RuleSink, SetPrioritySignError};
use super::types::{LaneArrows, LaneId, NodeId, PriorityType, SegmentEnd};

/// Junction restriction flags of one segment end; `None` means the host
/// default applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JunctionRestrictions {
    pub entering_blocked_junction_allowed: Option<bool>,
    pub pedestrian_crossing_allowed: Option<bool>,
    pub lane_changing_allowed_when_going_straight: Option<bool>,
}

/// Rule store for a `SimRoadNetwork` (or any host with `NetworkQuery` and `LaneQuery`)
#[derive(Default)]
pub struct SimRuleStore {
    end_nodes: HashMap<SegmentEnd, NodeId>,

    valid_nodes: HashSet<NodeId>,

    traffic_light_nodes: HashSet<NodeId>,

    timed_light_nodes: HashSet<NodeId>,

    priority_signs: HashMap<SegmentEnd, PriorityType>,

    lane_arrows: HashMap<LaneId, LaneArrows>,

    /// Edge weight: the connection sits at the source segment's start node
    lane_connections: DiGraphMap<LaneId, bool>,

    restrictions: HashMap<SegmentEnd, JunctionRestrictions>,

    /// Number of successful mutations, for summaries
    mutation_count: usize,
}

impl SimRuleStore {
    pub fn new<N: NetworkQuery + LaneQuery + ?Sized>(network: &N) -> Self {
        let mut store = Self::default();
        store.sync_network(network);
        store
    }

    /// Refreshes the segment end -> node lookup after the network changed.
    /// Rules on ends and lanes that no longer exist are dropped.
    pub fn sync_network<N: NetworkQuery + LaneQuery + ?Sized>(&mut self, network: &N) {
        self.end_nodes.clear();
        self.valid_nodes.clear();
        let mut lanes = HashSet::new();

        for node in network.node_ids() {
            self.valid_nodes.insert(node);
            for segment in network.incident_segments(node) {
                if let Some(end) = network.segment_end_at(segment, node) {
                    self.end_nodes.insert(end, node);
                }
                lanes.extend(network.segment_lanes(segment).iter().map(|lane| lane.id));
            }
        }

        let end_nodes = &self.end_nodes;
        self.priority_signs.retain(|end, _| end_nodes.contains_key(end));
        self.restrictions.retain(|end, _| end_nodes.contains_key(end));
        self.lane_arrows.retain(|lane, _| lanes.contains(lane));

        let stale: Vec<LaneId> = self
            .lane_connections
            .nodes()
            .filter(|lane| !lanes.contains(lane))
            .collect();
        for lane in stale {
            self.lane_connections.remove_node(lane);
        }
    }

    pub fn add_traffic_light(&mut self, node: NodeId) {
        self.traffic_light_nodes.insert(node);
    }

    /// Marks a node as running a timed traffic light program
    pub fn add_timed_light(&mut self, node: NodeId) {
        self.traffic_light_nodes.insert(node);
        self.timed_light_nodes.insert(node);
    }

    pub fn remove_traffic_light(&mut self, node: NodeId) {
        self.traffic_light_nodes.remove(&node);
        self.timed_light_nodes.remove(&node);
    }

    pub fn restrictions(&self, end: SegmentEnd) -> JunctionRestrictions {
        self.restrictions.get(&end).copied().unwrap_or_default()
    }

    pub fn has_lane_connection(&self, source: LaneId, target: LaneId) -> bool {
        self.lane_connections.contains_edge(source, target)
    }

    /// Targets connected from `source`, in ascending lane id order
    pub fn lane_connections_from(&self, source: LaneId) -> Vec<LaneId> {
        let mut targets: Vec<LaneId> = self.lane_connections.neighbors(source).collect();
        targets.sort();
        targets
    }

    pub fn lane_connection_count(&self) -> usize {
        self.lane_connections.edge_count()
    }

    /// All signs, sorted by segment end
    pub fn priority_signs(&self) -> Vec<(SegmentEnd, PriorityType)> {
        let mut signs: Vec<(SegmentEnd, PriorityType)> = self
            .priority_signs
            .iter()
            .map(|(end, sign)| (*end, *sign))
            .collect();
        signs.sort_by_key(|(end, _)| *end);
        signs
    }

    /// All explicitly set lane arrows, sorted by lane
    pub fn all_lane_arrows(&self) -> Vec<(LaneId, LaneArrows)> {
        let mut arrows: Vec<(LaneId, LaneArrows)> = self
            .lane_arrows
            .iter()
            .map(|(lane, arrows)| (*lane, *arrows))
            .collect();
        arrows.sort_by_key(|(lane, _)| *lane);
        arrows
    }

    pub fn mutation_count(&self) -> usize {
        self.mutation_count
    }

    fn known_end(&self, end: SegmentEnd) -> bool {
        if self.end_nodes.contains_key(&end) {
            true
        } else {
            warn!("Rejecting rule for unknown segment end {:?}", end);
            false
        }
    }

    fn update_restrictions(
        &mut self,
        end: SegmentEnd,
        update: impl FnOnce(&mut JunctionRestrictions),
    ) -> bool {
        if !self.known_end(end) {
            return false;
        }
        update(self.restrictions.entry(end).or_default());
        self.mutation_count += 1;
        true
    }
}

impl RuleSink for SimRuleStore {
    fn may_node_have_priority_signs(&self, node: NodeId) -> Result<(), SetPrioritySignError> {
        if !self.valid_nodes.contains(&node) {
            return Err(SetPrioritySignError::InvalidNode);
        }
        if self.timed_light_nodes.contains(&node) {
            return Err(SetPrioritySignError::HasTimedLight);
        }
        if self.traffic_light_nodes.contains(&node) {
            return Err(SetPrioritySignError::HasTrafficLights);
        }
        Ok(())
    }

    fn set_priority_sign(&mut self, end: SegmentEnd, sign: PriorityType) -> bool {
        let Some(node) = self.end_nodes.get(&end).copied() else {
            warn!("Rejecting priority sign for unknown segment end {:?}", end);
            return false;
        };

        if sign != PriorityType::None {
            if let Err(reason) = self.may_node_have_priority_signs(node) {
                warn!("Rejecting {:?} sign at {}: {}", sign, node, reason);
                return false;
            }
        }

        if sign == PriorityType::None {
            self.priority_signs.remove(&end);
        } else {
            self.priority_signs.insert(end, sign);
        }
        self.mutation_count += 1;
        true
    }

    fn priority_sign(&self, end: SegmentEnd) -> PriorityType {
        self.priority_signs.get(&end).copied().unwrap_or_default()
    }

    fn set_lane_arrows(&mut self, lane: LaneId, arrows: LaneArrows) -> bool {
        if !lane.is_valid() {
            return false;
        }
        self.lane_arrows.insert(lane, arrows);
        self.mutation_count += 1;
        true
    }

    fn lane_arrows(&self, lane: LaneId) -> Option<LaneArrows> {
        self.lane_arrows.get(&lane).copied()
    }

    fn add_lane_connection(
        &mut self,
        source: LaneId,
        target: LaneId,
        source_start_node: bool,
    ) -> bool {
        if !source.is_valid() || !target.is_valid() || source == target {
            return false;
        }
        self.lane_connections.add_edge(source, target, source_start_node);
        self.mutation_count += 1;
        true
    }

    fn set_entering_blocked_junction_allowed(&mut self, end: SegmentEnd, allowed: bool) -> bool {
        self.update_restrictions(end, |restrictions| {
            restrictions.entering_blocked_junction_allowed = Some(allowed)
        })
    }

    fn set_pedestrian_crossing_allowed(&mut self, end: SegmentEnd, allowed: bool) -> bool {
        self.update_restrictions(end, |restrictions| {
            restrictions.pedestrian_crossing_allowed = Some(allowed)
        })
    }

    fn set_lane_changing_allowed_when_going_straight(
        &mut self,
        end: SegmentEnd,
        allowed: bool,
    ) -> bool {
        self.update_restrictions(end, |restrictions| {
            restrictions.lane_changing_allowed_when_going_straight = Some(allowed)
        })
    }
}
