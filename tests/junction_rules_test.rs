//! Junction classification and rule propagation tests
//!
//! Runs the engine against the in-memory network and checks the rules that
//! end up in the store.

use junction_rules::network::{
    arriving_lanes, classify_junction, fix_junction, fix_roundabout, fix_segment_lanes,
    is_highway_junction, lane_arrows_for, propagate_main_road, IneligibleReason,
    JunctionClassification, LaneArrows, LaneFixOutcome, NetworkQuery, NodeId, Position,
    PriorityType, RuleSink, Scenario, SegmentEnd, SegmentId, SegmentSpec, SetPrioritySignError,
    SimRoadNetwork, SimRuleStore, VisitData,
};

fn visit(segment: SegmentId) -> VisitData {
    VisitData {
        prev_segment: segment,
        cur_segment: segment,
        via_initial_start_node: false,
        via_start_node: false,
        initial: true,
    }
}

/// Up to four roads meeting at one node
fn star(specs: &[SegmentSpec]) -> (SimRoadNetwork, NodeId) {
    let mut network = SimRoadNetwork::new();
    let centre = network.add_node(Position::new(0.0, 0.0, 0.0)).unwrap();
    let arms = [
        Position::new(0.0, 0.0, 50.0),
        Position::new(0.0, 0.0, -50.0),
        Position::new(50.0, 0.0, 0.0),
        Position::new(-50.0, 0.0, 0.0),
    ];
    for (spec, position) in specs.iter().zip(arms) {
        let outer = network.add_node(position).unwrap();
        network.add_segment(centre, outer, *spec).unwrap();
    }
    (network, centre)
}

#[test]
fn test_crossroads_wide_roads_become_main() {
    let scenario = Scenario::crossroads().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);
    let centre = scenario.focus_node;

    let classification = fix_junction(network, &mut store, centre);
    let JunctionClassification::MajorMinorSplit { major, minor } = classification else {
        panic!("Crossroads should be split, got {:?}", classification);
    };

    let segments = network.incident_segments(centre);
    assert_eq!(major.len(), 2);
    assert_eq!(minor.len(), 2);
    for segment in &major {
        assert_eq!(network.segment_geometry(*segment).unwrap().half_width, 12.0);
    }
    for segment in &minor {
        assert_eq!(network.segment_geometry(*segment).unwrap().half_width, 8.0);
    }
    assert_eq!(segments.len(), 4);

    for segment in &major {
        let end = network.segment_end_at(*segment, centre).unwrap();
        assert_eq!(store.priority_sign(end), PriorityType::Main);

        let restrictions = store.restrictions(end);
        assert_eq!(restrictions.entering_blocked_junction_allowed, Some(true));
        assert_eq!(restrictions.pedestrian_crossing_allowed, Some(false));
    }
    for segment in &minor {
        let end = network.segment_end_at(*segment, centre).unwrap();
        assert_eq!(store.priority_sign(end), PriorityType::Yield);
        assert_eq!(store.restrictions(end).entering_blocked_junction_allowed, None);
    }
}

#[test]
fn test_major_lanes_go_straight_with_right_turn_on_rightmost() {
    let scenario = Scenario::crossroads().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);
    let centre = scenario.focus_node;

    let JunctionClassification::MajorMinorSplit { major, minor } =
        fix_junction(network, &mut store, centre)
    else {
        panic!("Crossroads should be split");
    };

    for segment in major {
        let end = network.segment_end_at(segment, centre).unwrap();
        let lanes = arriving_lanes(network, end);
        assert_eq!(lanes.len(), 2);
        assert_eq!(store.lane_arrows(lanes[0].lane_id), Some(LaneArrows::FORWARD));
        assert_eq!(
            store.lane_arrows(lanes[1].lane_id),
            Some(LaneArrows::FORWARD_RIGHT)
        );
    }

    for segment in minor {
        let end = network.segment_end_at(segment, centre).unwrap();
        let lanes = arriving_lanes(network, end);
        assert_eq!(lanes.len(), 1);
        for lane in lanes {
            assert_eq!(store.lane_arrows(lane.lane_id), Some(LaneArrows::RIGHT));
        }
    }
}

#[test]
fn test_t_junction_right_turn_only_where_a_road_exists() {
    let scenario = Scenario::t_junction().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);
    let centre = scenario.focus_node;

    let classification = fix_junction(network, &mut store, centre);
    assert!(classification.is_applicable());

    // Westbound traffic has the side street on its left, eastbound on its right
    let [west, east, south] = <[_; 3]>::try_from(network.incident_segments(centre)).unwrap();

    let west_end = network.segment_end_at(west, centre).unwrap();
    let west_lanes = arriving_lanes(network, west_end);
    assert_eq!(store.lane_arrows(west_lanes[0].lane_id), Some(LaneArrows::FORWARD));
    assert_eq!(
        store.lane_arrows(west_lanes[1].lane_id),
        Some(LaneArrows::FORWARD_RIGHT)
    );

    let east_end = network.segment_end_at(east, centre).unwrap();
    for lane in arriving_lanes(network, east_end) {
        assert_eq!(store.lane_arrows(lane.lane_id), Some(LaneArrows::FORWARD));
    }

    let south_end = network.segment_end_at(south, centre).unwrap();
    assert_eq!(store.priority_sign(south_end), PriorityType::Yield);
}

#[test]
fn test_fix_junction_is_stable_when_repeated() {
    let scenario = Scenario::crossroads().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);

    fix_junction(network, &mut store, scenario.focus_node);
    let signs = store.priority_signs();
    let arrows = store.all_lane_arrows();

    fix_junction(network, &mut store, scenario.focus_node);
    assert_eq!(store.priority_signs(), signs);
    assert_eq!(store.all_lane_arrows(), arrows);
}

#[test]
fn test_dead_ends_and_through_nodes_are_left_alone() {
    let scenario = Scenario::avenue().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);

    let through = NodeId(2);
    assert_eq!(network.incident_segments(through).len(), 2);
    assert_eq!(
        fix_junction(network, &mut store, through),
        JunctionClassification::Ineligible(IneligibleReason::NotAJunction { segment_count: 2 })
    );

    let dead_end = NodeId(1);
    assert_eq!(
        fix_junction(network, &mut store, dead_end),
        JunctionClassification::Ineligible(IneligibleReason::NotAJunction { segment_count: 1 })
    );

    assert_eq!(
        fix_junction(network, &mut store, NodeId::NONE),
        JunctionClassification::Ineligible(IneligibleReason::InvalidNode)
    );
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_equal_roads_are_ambiguous() {
    let (network, centre) = star(&[SegmentSpec::two_way(6.0, 1); 3]);
    let mut store = SimRuleStore::new(&network);

    assert_eq!(
        fix_junction(&network, &mut store, centre),
        JunctionClassification::Ineligible(IneligibleReason::AmbiguousSizing)
    );
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_third_road_tied_with_largest_is_ambiguous() {
    // The third largest road is as big as the largest one
    let (network, centre) = star(&[
        SegmentSpec::two_way(12.0, 2),
        SegmentSpec::two_way(12.0, 2),
        SegmentSpec::two_way(12.0, 2),
        SegmentSpec::two_way(8.0, 1),
    ]);
    let mut store = SimRuleStore::new(&network);

    assert_eq!(
        fix_junction(&network, &mut store, centre),
        JunctionClassification::Ineligible(IneligibleReason::AmbiguousSizing)
    );
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_one_way_main_road_is_left_alone() {
    let (network, centre) = star(&[
        SegmentSpec::one_way(12.0, 2),
        SegmentSpec::one_way_inverted(12.0, 2),
        SegmentSpec::two_way(6.0, 1),
    ]);
    let mut store = SimRuleStore::new(&network);

    assert_eq!(
        fix_junction(&network, &mut store, centre),
        JunctionClassification::Ineligible(IneligibleReason::OneWayMajorRoad)
    );
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_signalised_junction_is_left_alone() {
    let scenario = Scenario::crossroads().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);
    store.add_traffic_light(scenario.focus_node);

    assert_eq!(
        classify_junction(network, &store, scenario.focus_node),
        JunctionClassification::Ineligible(IneligibleReason::SignsNotAllowed(
            SetPrioritySignError::HasTrafficLights
        ))
    );
    fix_junction(network, &mut store, scenario.focus_node);
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_major_and_minor_signs_are_exclusive_on_random_grids() {
    for seed in 0..10 {
        let scenario = Scenario::random_grid(seed, 5).unwrap();
        let network = &scenario.network;
        let mut store = SimRuleStore::new(network);

        let mut results = Vec::new();
        for node in network.node_ids() {
            results.push((node, fix_junction(network, &mut store, node)));
        }

        for (node, classification) in results {
            let JunctionClassification::MajorMinorSplit { major, minor } = classification else {
                continue;
            };
            assert_eq!(major.len(), 2, "seed {} {}", seed, node);
            for segment in &major {
                assert!(!minor.contains(segment));
                let end = network.segment_end_at(*segment, node).unwrap();
                assert_eq!(store.priority_sign(end), PriorityType::Main);
            }
            for segment in &minor {
                let end = network.segment_end_at(*segment, node).unwrap();
                assert_eq!(store.priority_sign(end), PriorityType::Yield);
            }
        }
    }
}

#[test]
fn test_through_node_lanes_are_connected_in_order() {
    let scenario = Scenario::avenue().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);

    let first = scenario.focus_segment;
    let outcome = fix_segment_lanes(network, &mut store, &visit(first));
    assert_eq!(outcome, LaneFixOutcome::Connected(2));

    let head = network.head_end(first).unwrap();
    let node = network.end_node(head).unwrap();
    let next = network
        .incident_segments(node)
        .into_iter()
        .find(|segment| *segment != first)
        .unwrap();
    let source = arriving_lanes(network, head);
    let target = arriving_lanes(network, network.segment_end_at(next, node).unwrap().opposite());

    assert_eq!(store.lane_connection_count(), 2);
    for (from, to) in source.iter().zip(target.iter()) {
        assert!(store.has_lane_connection(from.lane_id, to.lane_id));
        assert_eq!(store.lane_connections_from(from.lane_id), vec![to.lane_id]);
    }
}

#[test]
fn test_lane_count_mismatch_leaves_lanes_unconnected() {
    let mut network = SimRoadNetwork::new();
    let a = network.add_node(Position::new(0.0, 0.0, 0.0)).unwrap();
    let b = network.add_node(Position::new(40.0, 0.0, 0.0)).unwrap();
    let c = network.add_node(Position::new(80.0, 0.0, 0.0)).unwrap();
    let wide = network.add_segment(a, b, SegmentSpec::two_way(6.0, 2)).unwrap();
    network.add_segment(b, c, SegmentSpec::two_way(4.0, 1)).unwrap();
    let mut store = SimRuleStore::new(&network);

    assert_eq!(
        fix_segment_lanes(&network, &mut store, &visit(wide)),
        LaneFixOutcome::CountMismatch {
            source: 2,
            target: 1
        }
    );
    assert_eq!(store.lane_connection_count(), 0);
}

#[test]
fn test_wide_approach_gets_dedicated_turn_lanes() {
    let mut network = SimRoadNetwork::new();
    let centre = network.add_node(Position::new(0.0, 0.0, 0.0)).unwrap();
    let south = network.add_node(Position::new(0.0, 0.0, -50.0)).unwrap();
    let approach = network
        .add_segment(south, centre, SegmentSpec::one_way(9.0, 3))
        .unwrap();
    for position in [
        Position::new(0.0, 0.0, 50.0),
        Position::new(50.0, 0.0, 0.0),
        Position::new(-50.0, 0.0, 0.0),
    ] {
        let outer = network.add_node(position).unwrap();
        network
            .add_segment(centre, outer, SegmentSpec::two_way(6.0, 1))
            .unwrap();
    }
    let mut store = SimRuleStore::new(&network);

    assert_eq!(
        fix_segment_lanes(&network, &mut store, &visit(approach)),
        LaneFixOutcome::Arrows(3)
    );

    let lanes = arriving_lanes(&network, SegmentEnd::new(approach, false));
    let arrows: Vec<_> = lanes
        .iter()
        .map(|lane| store.lane_arrows(lane.lane_id))
        .collect();
    assert_eq!(
        arrows,
        vec![
            Some(LaneArrows::LEFT),
            Some(LaneArrows::FORWARD),
            Some(LaneArrows::RIGHT)
        ]
    );
}

#[test]
fn test_fix_roundabout_follows_avenue_and_yields_side_street() {
    let scenario = Scenario::avenue().unwrap();
    let network = &scenario.network;
    let mut store = SimRuleStore::new(network);

    let visited = fix_roundabout(network, &mut store, scenario.focus_segment);
    assert_eq!(visited, 4);

    // Both through-nodes stitched, two lanes each
    assert_eq!(store.lane_connection_count(), 4);

    let junction = scenario.focus_node;
    for segment in network.incident_segments(junction) {
        let end = network.segment_end_at(segment, junction).unwrap();
        let geometry = network.segment_geometry(segment).unwrap();
        let expected = if geometry.half_width > 5.0 {
            PriorityType::Main
        } else {
            PriorityType::Yield
        };
        assert_eq!(store.priority_sign(end), expected, "{}", segment);
    }
}

#[test]
fn test_rule_store_rejects_unknown_segment_end() {
    let scenario = Scenario::crossroads().unwrap();
    let mut store = SimRuleStore::new(&scenario.network);

    let unknown = SegmentEnd::new(SegmentId(999), true);
    assert!(!store.set_priority_sign(unknown, PriorityType::Main));
    assert!(!store.set_pedestrian_crossing_allowed(unknown, true));
    assert_eq!(store.mutation_count(), 0);
}

#[test]
fn test_store_forgets_rules_of_removed_roads() {
    let mut scenario = Scenario::crossroads().unwrap();
    let centre = scenario.focus_node;
    let mut store = SimRuleStore::new(&scenario.network);
    fix_junction(&scenario.network, &mut store, centre);
    assert_eq!(store.priority_signs().len(), 4);

    let neighbours = scenario.network.neighbours(centre);
    assert_eq!(neighbours.len(), 4);
    let west = *neighbours.last().unwrap();
    let removed = scenario.network.find_segment_between(centre, west).unwrap();

    let removed_lanes = scenario.network.segment(removed).unwrap().lanes.clone();
    assert!(store
        .all_lane_arrows()
        .iter()
        .any(|(lane, _)| removed_lanes.contains(lane)));

    assert_eq!(scenario.network.remove_node(west).unwrap(), vec![removed]);
    store.sync_network(&scenario.network);

    assert_eq!(store.priority_signs().len(), 3);
    assert!(!store.all_lane_arrows().is_empty());
    assert!(store
        .all_lane_arrows()
        .iter()
        .all(|(lane, _)| !removed_lanes.contains(lane)));
    assert!(!store.set_priority_sign(SegmentEnd::new(removed, true), PriorityType::Main));

    let classification = fix_junction(&scenario.network, &mut store, centre);
    let JunctionClassification::MajorMinorSplit { minor, .. } = classification else {
        panic!("Three remaining roads should still split");
    };
    assert_eq!(minor.len(), 1);
}

#[test]
fn test_store_drops_connections_of_removed_lanes() {
    let mut scenario = Scenario::avenue().unwrap();
    let first = scenario.focus_segment;
    let mut store = SimRuleStore::new(&scenario.network);
    assert_eq!(
        fix_segment_lanes(&scenario.network, &mut store, &visit(first)),
        LaneFixOutcome::Connected(2)
    );

    let network = &scenario.network;
    let head = network.head_end(first).unwrap();
    let node = network.end_node(head).unwrap();
    let next = network
        .incident_segments(node)
        .into_iter()
        .find(|segment| *segment != first)
        .unwrap();
    let sources: Vec<_> = arriving_lanes(network, head)
        .into_iter()
        .map(|lane| lane.lane_id)
        .collect();

    scenario.network.remove_segment(next).unwrap();
    store.sync_network(&scenario.network);

    assert_eq!(store.lane_connection_count(), 0);
    for source in sources {
        assert!(store.lane_connections_from(source).is_empty());
    }
}

/// Highway splitting at `junction` into a straight carriageway and a ramp
fn highway_exit(ramp: SegmentSpec) -> (SimRoadNetwork, SegmentId, SegmentId) {
    let mut network = SimRoadNetwork::new();
    let junction = network.add_node(Position::new(0.0, 0.0, 0.0)).unwrap();
    let west = network.add_node(Position::new(-50.0, 0.0, 0.0)).unwrap();
    let east = network.add_node(Position::new(50.0, 0.0, 0.0)).unwrap();
    let exit = network.add_node(Position::new(30.0, 0.0, -40.0)).unwrap();

    let main = network
        .add_segment(west, junction, SegmentSpec::highway(8.0, 2))
        .unwrap();
    network
        .add_segment(junction, east, SegmentSpec::highway(8.0, 2))
        .unwrap();
    let ramp = network.add_segment(junction, exit, ramp).unwrap();
    (network, main, ramp)
}

#[test]
fn test_highway_main_road_allows_lane_changes_on_ramps() {
    let (network, main, ramp) = highway_exit(SegmentSpec::highway(4.0, 1));
    let junction = network.end_node(SegmentEnd::new(main, false)).unwrap();
    assert!(is_highway_junction(&network, junction));
    let mut store = SimRuleStore::new(&network);

    propagate_main_road(&network, &mut store, main);

    let ramp_end = network.segment_end_at(ramp, junction).unwrap();
    assert_eq!(store.priority_sign(ramp_end), PriorityType::Yield);
    assert_eq!(
        store.restrictions(ramp_end).lane_changing_allowed_when_going_straight,
        Some(true)
    );
}

#[test]
fn test_ordinary_side_road_keeps_lane_change_default() {
    let (network, main, ramp) = highway_exit(SegmentSpec::two_way(4.0, 1));
    let junction = network.end_node(SegmentEnd::new(main, false)).unwrap();
    assert!(!is_highway_junction(&network, junction));
    let mut store = SimRuleStore::new(&network);

    propagate_main_road(&network, &mut store, main);

    let ramp_end = network.segment_end_at(ramp, junction).unwrap();
    assert_eq!(store.priority_sign(ramp_end), PriorityType::Yield);
    assert_eq!(
        store.restrictions(ramp_end).lane_changing_allowed_when_going_straight,
        None
    );
}

#[test]
fn test_single_sided_turns_get_arrows_on_the_matching_edge() {
    assert_eq!(lane_arrows_for(1, true, false), vec![LaneArrows::FORWARD_RIGHT]);
    assert_eq!(lane_arrows_for(1, false, true), vec![LaneArrows::LEFT_FORWARD]);
    assert_eq!(
        lane_arrows_for(3, true, false),
        vec![LaneArrows::FORWARD, LaneArrows::FORWARD, LaneArrows::RIGHT]
    );
    assert_eq!(
        lane_arrows_for(3, false, true),
        vec![LaneArrows::LEFT, LaneArrows::FORWARD, LaneArrows::FORWARD]
    );
    assert_eq!(lane_arrows_for(4, false, false), vec![LaneArrows::FORWARD; 4]);
}
