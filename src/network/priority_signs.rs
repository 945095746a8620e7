//! Priority sign editing on single nodes

use log::debug;
use sorted_vec::SortedSet;

use super::accessor::NetworkQuery;
use super::rule_sink::RuleSink;
use super::types::{NodeId, PriorityType, SegmentEnd};

/// Sign pairs applied by successive mass edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrioritySignsMassEditMode {
    #[default]
    MainYield,
    MainStop,
    YieldMain,
    StopMain,
    Delete,
}

impl PrioritySignsMassEditMode {
    const ALL: [PrioritySignsMassEditMode; 5] = [
        PrioritySignsMassEditMode::MainYield,
        PrioritySignsMassEditMode::MainStop,
        PrioritySignsMassEditMode::YieldMain,
        PrioritySignsMassEditMode::StopMain,
        PrioritySignsMassEditMode::Delete,
    ];

    /// (sign for the selected road, sign for roads branching off it)
    pub fn signs(self) -> (PriorityType, PriorityType) {
        match self {
            PrioritySignsMassEditMode::MainYield => (PriorityType::Main, PriorityType::Yield),
            PrioritySignsMassEditMode::MainStop => (PriorityType::Main, PriorityType::Stop),
            PrioritySignsMassEditMode::YieldMain => (PriorityType::Yield, PriorityType::Main),
            PrioritySignsMassEditMode::StopMain => (PriorityType::Stop, PriorityType::Main),
            PrioritySignsMassEditMode::Delete => (PriorityType::None, PriorityType::None),
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|mode| *mode == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Sign a segment end gets when clicked. Unsigned ends become Main until the
/// node already has two main roads.
pub fn next_priority_sign(current: PriorityType, main_count_at_node: usize) -> PriorityType {
    match current {
        PriorityType::Main => PriorityType::Yield,
        PriorityType::Yield => PriorityType::Stop,
        PriorityType::Stop => PriorityType::Main,
        PriorityType::None => {
            if main_count_at_node >= 2 {
                PriorityType::Yield
            } else {
                PriorityType::Main
            }
        }
    }
}

fn node_ends<N: NetworkQuery + ?Sized>(network: &N, node: NodeId) -> Vec<SegmentEnd> {
    network
        .incident_segments(node)
        .into_iter()
        .filter_map(|segment| network.segment_end_at(segment, node))
        .collect()
}

pub fn has_node_priority_sign<N, S>(network: &N, sink: &S, node: NodeId) -> bool
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    node_ends(network, node)
        .into_iter()
        .any(|end| sink.priority_sign(end) != PriorityType::None)
}

pub fn count_priority_signs_at_node<N, S>(
    network: &N,
    sink: &S,
    node: NodeId,
    sign: PriorityType,
) -> usize
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    node_ends(network, node)
        .into_iter()
        .filter(|end| sink.priority_sign(*end) == sign)
        .count()
}

/// Clears every sign at a node. Returns how many signs were removed.
pub fn remove_priority_signs_from_node<N, S>(network: &N, sink: &mut S, node: NodeId) -> usize
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let mut removed = 0;
    for end in node_ends(network, node) {
        if sink.priority_sign(end) != PriorityType::None
            && sink.set_priority_sign(end, PriorityType::None)
        {
            removed += 1;
        }
    }
    debug!("Removed {} priority signs from {}", removed, node);
    removed
}

/// Sets one sign. A Stop or Yield sign turns every still unsigned end at the
/// same node into a main road.
pub fn set_priority_sign<N, S>(
    network: &N,
    sink: &mut S,
    end: SegmentEnd,
    sign: PriorityType,
) -> bool
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let Some(node) = network.end_node(end) else {
        return false;
    };

    if let Err(reason) = sink.may_node_have_priority_signs(node) {
        debug!("{} may not have priority signs: {}", node, reason);
        return false;
    }

    let success = sink.set_priority_sign(end, sign);
    debug!("set_priority_sign({:?}, {:?}) = {}", end, sign, success);

    if !success || (sign != PriorityType::Stop && sign != PriorityType::Yield) {
        return success;
    }

    for other in node_ends(network, node) {
        if other.segment == end.segment {
            continue;
        }
        if sink.priority_sign(other) == PriorityType::None {
            debug!("Flagging {:?} at {} as main road", other, node);
            sink.set_priority_sign(other, PriorityType::Main);
        }
    }

    success
}

/// Advances the sign on `end` to the next one in the cycle. Returns the new
/// sign if it was applied.
pub fn cycle_priority_sign<N, S>(
    network: &N,
    sink: &mut S,
    end: SegmentEnd,
) -> Option<PriorityType>
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let node = network.end_node(end)?;
    let main_count = count_priority_signs_at_node(network, &*sink, node, PriorityType::Main);
    let sign = next_priority_sign(sink.priority_sign(end), main_count);
    set_priority_sign(network, sink, end, sign).then_some(sign)
}

/// Nodes that may carry signs and either carry one already or are
/// `selected`. Recomputed from the sink on every call.
pub fn priority_node_ids<N, S>(network: &N, sink: &S, selected: NodeId) -> SortedSet<NodeId>
where
    N: NetworkQuery + ?Sized,
    S: RuleSink + ?Sized,
{
    let mut nodes = SortedSet::new();
    for node in network.node_ids() {
        if sink.may_node_have_priority_signs(node).is_err() {
            continue;
        }
        if !has_node_priority_sign(network, sink, node) && node != selected {
            continue;
        }
        nodes.push(node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_edit_mode_cycles_back_to_start() {
        let mut mode = PrioritySignsMassEditMode::default();
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(mode.signs());
            mode = mode.next();
        }
        assert_eq!(mode, PrioritySignsMassEditMode::MainYield);
        assert_eq!(seen[1], (PriorityType::Main, PriorityType::Stop));
        assert_eq!(seen[4], (PriorityType::None, PriorityType::None));
    }

    #[test]
    fn clicking_cycles_signs() {
        assert_eq!(next_priority_sign(PriorityType::None, 0), PriorityType::Main);
        assert_eq!(next_priority_sign(PriorityType::None, 2), PriorityType::Yield);
        assert_eq!(next_priority_sign(PriorityType::Main, 0), PriorityType::Yield);
        assert_eq!(next_priority_sign(PriorityType::Yield, 0), PriorityType::Stop);
        assert_eq!(next_priority_sign(PriorityType::Stop, 0), PriorityType::Main);
    }
}
