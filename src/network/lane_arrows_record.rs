//! Snapshot and restore of lane arrows

use std::collections::HashMap;

use super::accessor::LaneQuery;
use super::lanes::sorted_lanes;
use super::rule_sink::RuleSink;
use super::types::{LaneArrows, LaneId, SegmentId, LANE_TYPES, VEHICLE_TYPES};

/// Arrows of one lane captured at some point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneArrowsRecord {
    pub lane_id: LaneId,
    arrows: Option<LaneArrows>,
}

impl LaneArrowsRecord {
    pub fn new(lane_id: LaneId) -> Self {
        Self {
            lane_id,
            arrows: None,
        }
    }

    /// The recorded arrows, `None` before `record` or when the lane had none
    pub fn arrows(&self) -> Option<LaneArrows> {
        self.arrows
    }

    pub fn record<S: RuleSink + ?Sized>(&mut self, sink: &S) {
        self.arrows = sink.lane_arrows(self.lane_id);
    }

    /// Puts the recorded arrows back on the same lane
    pub fn restore<S: RuleSink + ?Sized>(&self, sink: &mut S) -> bool {
        self.transfer(sink, self.lane_id)
    }

    /// Applies the recorded arrows to another lane. Does nothing (and returns
    /// `false`) when nothing was recorded.
    pub fn transfer<S: RuleSink + ?Sized>(&self, sink: &mut S, lane_id: LaneId) -> bool {
        match self.arrows {
            Some(arrows) => sink.set_lane_arrows(lane_id, arrows),
            None => false,
        }
    }

    /// Applies the recorded arrows to the lane this one maps to
    pub fn transfer_mapped<S: RuleSink + ?Sized>(
        &self,
        sink: &mut S,
        map: &HashMap<LaneId, LaneId>,
    ) -> bool {
        match map.get(&self.lane_id) {
            Some(target) => self.transfer(sink, *target),
            None => false,
        }
    }

    /// Empty records for the car lanes arriving at one end of a segment, in
    /// storage order
    pub fn records_for<N: LaneQuery + ?Sized>(
        network: &N,
        segment: SegmentId,
        start_node: bool,
    ) -> Vec<LaneArrowsRecord> {
        sorted_lanes(
            network,
            segment,
            start_node,
            LANE_TYPES,
            VEHICLE_TYPES,
            false,
        )
        .into_iter()
        .map(|lane| LaneArrowsRecord::new(lane.lane_id))
        .collect()
    }
}
