//! Click handling for the priority signs tool
//!
//! Maps a click on a node or segment, together with the held modifier, to
//! one engine operation. Rendering and hover detection belong to the host;
//! it passes in what is under the cursor.

use log::{debug, info};

use super::accessor::{LaneQuery, NetworkQuery};
use super::junction_rules::{fix_junction, fix_roundabout, mass_edit, JunctionClassification};
use super::priority_signs::{
    cycle_priority_sign, has_node_priority_sign, priority_node_ids, PrioritySignsMassEditMode,
};
use super::rule_sink::{RuleSink, SetPrioritySignError};
use super::types::{NodeId, PriorityType, SegmentEnd, SegmentId};
use sorted_vec::SortedSet;

/// What the cursor is over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickTarget {
    pub node: NodeId,
    pub segment: SegmentId,
}

/// Modifier keys held during a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

/// Result of a click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Ignored,
    MassEdited {
        mode: PrioritySignsMassEditMode,
        visited: usize,
    },
    RoundaboutFixed {
        visited: usize,
    },
    JunctionFixed(JunctionClassification),
    NodeSelected(NodeId),
    NodeHasSigns(NodeId),
    NodeRejected(SetPrioritySignError),
}

impl ToolOutcome {
    /// Message shown to the user, if the outcome warrants one
    pub fn advisory(&self) -> Option<String> {
        match self {
            ToolOutcome::NodeRejected(SetPrioritySignError::HasTimedLight) => {
                Some("Node has timed traffic light script".to_string())
            }
            _ => None,
        }
    }
}

/// State of the priority signs tool between clicks
#[derive(Debug, Default)]
pub struct PrioritySignsTool {
    mass_edit_mode: PrioritySignsMassEditMode,
    selected_node: NodeId,
}

impl PrioritySignsTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mass_edit_mode(&self) -> PrioritySignsMassEditMode {
        self.mass_edit_mode
    }

    pub fn selected_node(&self) -> NodeId {
        self.selected_node
    }

    /// Called when the mass edit modifier is released
    pub fn reset_mass_edit_mode(&mut self) {
        self.mass_edit_mode = PrioritySignsMassEditMode::default();
    }

    pub fn on_primary_click<N, S>(
        &mut self,
        network: &N,
        sink: &mut S,
        target: ClickTarget,
        modifiers: Modifiers,
    ) -> ToolOutcome
    where
        N: NetworkQuery + LaneQuery + ?Sized,
        S: RuleSink + ?Sized,
    {
        if modifiers.shift {
            if !target.segment.is_valid() {
                return ToolOutcome::Ignored;
            }
            self.selected_node = NodeId::NONE;

            let mode = self.mass_edit_mode;
            let (primary, secondary) = mode.signs();
            let visited = mass_edit(network, sink, target.segment, primary, secondary);
            info!(
                "Mass edit {:?} from {} touched {} segments",
                mode, target.segment, visited
            );

            self.mass_edit_mode = mode.next();
            return ToolOutcome::MassEdited { mode, visited };
        }

        if modifiers.alt {
            let visited = fix_roundabout(network, sink, target.segment);
            info!("Fixed {} segments from {}", visited, target.segment);
            return ToolOutcome::RoundaboutFixed { visited };
        }

        if modifiers.ctrl {
            return ToolOutcome::JunctionFixed(fix_junction(network, sink, target.node));
        }

        if has_node_priority_sign(network, &*sink, target.node) {
            return ToolOutcome::NodeHasSigns(target.node);
        }

        if let Err(reason) = sink.may_node_have_priority_signs(target.node) {
            debug!("{} may not have priority signs: {}", target.node, reason);
            return ToolOutcome::NodeRejected(reason);
        }

        self.selected_node = target.node;
        debug!("Selected {}", self.selected_node);
        ToolOutcome::NodeSelected(target.node)
    }

    /// Click on the sign of a segment end at the selected node
    pub fn on_sign_click<N, S>(
        &mut self,
        network: &N,
        sink: &mut S,
        end: SegmentEnd,
    ) -> Option<PriorityType>
    where
        N: NetworkQuery + ?Sized,
        S: RuleSink + ?Sized,
    {
        cycle_priority_sign(network, sink, end)
    }

    /// Nodes whose signs should be shown
    pub fn priority_nodes<N, S>(&self, network: &N, sink: &S) -> SortedSet<NodeId>
    where
        N: NetworkQuery + ?Sized,
        S: RuleSink + ?Sized,
    {
        priority_node_ids(network, sink, self.selected_node)
    }
}
