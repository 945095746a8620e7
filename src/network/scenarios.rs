//! Ready-made road networks for the CLI and the tests

use anyhow::{Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::accessor::NetworkQuery;
use super::road_network::{SegmentSpec, SimRoadNetwork};
use super::rule_store::SimRuleStore;
use super::types::{Direction, NodeId, Position, SegmentId};

/// A network plus the node and segment the interesting rules apply to
pub struct Scenario {
    pub name: &'static str,
    pub network: SimRoadNetwork,
    pub focus_node: NodeId,
    pub focus_segment: SegmentId,
}

impl Scenario {
    /// Four-way junction of two wide avenues (half width 12, four lanes)
    /// and two narrow streets (half width 8, two lanes). North and south
    /// are the avenues.
    pub fn crossroads() -> Result<Self> {
        let mut network = SimRoadNetwork::new();
        let centre = network.add_node(Position::new(0.0, 0.0, 0.0))?;

        let arms = [
            (Position::new(0.0, 0.0, 60.0), SegmentSpec::two_way(12.0, 2)),
            (Position::new(0.0, 0.0, -60.0), SegmentSpec::two_way(12.0, 2)),
            (Position::new(60.0, 0.0, 0.0), SegmentSpec::two_way(8.0, 1)),
            (Position::new(-60.0, 0.0, 0.0), SegmentSpec::two_way(8.0, 1)),
        ];

        let mut first = SegmentId::NONE;
        for (position, spec) in arms {
            let outer = network.add_node(position)?;
            let segment = network.add_segment(centre, outer, spec)?;
            if !first.is_valid() {
                first = segment;
            }
        }

        Ok(Self {
            name: "crossroads",
            network,
            focus_node: centre,
            focus_segment: first,
        })
    }

    /// East-west main road with a narrow side street to the south
    pub fn t_junction() -> Result<Self> {
        let mut network = SimRoadNetwork::new();
        let centre = network.add_node(Position::new(0.0, 0.0, 0.0))?;
        let west = network.add_node(Position::new(-50.0, 0.0, 0.0))?;
        let east = network.add_node(Position::new(50.0, 0.0, 0.0))?;
        let south = network.add_node(Position::new(0.0, 0.0, -50.0))?;

        let main = network.add_segment(west, centre, SegmentSpec::two_way(8.0, 2))?;
        network.add_segment(centre, east, SegmentSpec::two_way(8.0, 2))?;
        network.add_segment(centre, south, SegmentSpec::two_way(4.0, 1))?;

        Ok(Self {
            name: "t-junction",
            network,
            focus_node: centre,
            focus_segment: main,
        })
    }

    /// Four-node one-way ring driven counter-clockwise, with a two-way
    /// approach road at every ring node. Ring segments carry curved end
    /// directions so that staying on the ring reads as straight ahead.
    pub fn roundabout() -> Result<Self> {
        const RADIUS: f32 = 30.0;
        const APPROACH: f32 = 70.0;

        let mut network = SimRoadNetwork::new();

        // Points on the circle at 0, 90, 180 and 270 degrees
        let spokes = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

        let mut ring_nodes = Vec::with_capacity(spokes.len());
        for (x, z) in spokes {
            ring_nodes.push(network.add_node(Position::new(x * RADIUS, 0.0, z * RADIUS))?);
        }

        let mut ring = Vec::with_capacity(spokes.len());
        for i in 0..spokes.len() {
            let j = (i + 1) % spokes.len();
            let segment =
                network.add_segment(ring_nodes[i], ring_nodes[j], SegmentSpec::one_way(5.0, 1))?;

            // Counter-clockwise tangent at angle a is (-sin a, cos a)
            let (xi, zi) = spokes[i];
            let (xj, zj) = spokes[j];
            network.set_end_direction(segment, true, Direction::new(-zi, xi))?;
            network.set_end_direction(segment, false, Direction::new(zj, -xj))?;
            ring.push(segment);
        }

        for (node, (x, z)) in ring_nodes.iter().zip(spokes) {
            let outer = network.add_node(Position::new(x * APPROACH, 0.0, z * APPROACH))?;
            network.add_segment(*node, outer, SegmentSpec::two_way(4.0, 1))?;
        }

        let focus_segment = *ring.first().context("Ring has no segments")?;
        Ok(Self {
            name: "roundabout",
            network,
            focus_node: ring_nodes[0],
            focus_segment,
        })
    }

    /// Gently winding avenue of four two-lane-per-direction segments with a
    /// side street joining at the last bend
    pub fn avenue() -> Result<Self> {
        let mut network = SimRoadNetwork::new();

        let bends = [
            (0.0, 0.0),
            (40.0, 4.0),
            (80.0, 0.0),
            (120.0, 4.0),
            (160.0, 0.0),
        ];
        let mut nodes = Vec::with_capacity(bends.len());
        for (x, z) in bends {
            nodes.push(network.add_node(Position::new(x, 0.0, z))?);
        }

        let mut segments = Vec::with_capacity(bends.len() - 1);
        for pair in nodes.windows(2) {
            segments.push(network.add_segment(pair[0], pair[1], SegmentSpec::two_way(6.0, 2))?);
        }

        let junction = nodes[3];
        let side = network.add_node(Position::new(120.0, 0.0, -40.0))?;
        network.add_segment(junction, side, SegmentSpec::two_way(4.0, 1))?;

        let focus_segment = *segments.first().context("Avenue has no segments")?;
        Ok(Self {
            name: "avenue",
            network,
            focus_node: junction,
            focus_segment,
        })
    }

    /// `size` x `size` grid with random road types and some missing links
    pub fn random_grid(seed: u64, size: usize) -> Result<Self> {
        const SPACING: f32 = 40.0;
        const MISSING_LINK_CHANCE: f64 = 0.15;

        let size = size.max(2);
        let road_types = [
            SegmentSpec::two_way(4.0, 1),
            SegmentSpec::two_way(6.0, 2),
            SegmentSpec::two_way(8.0, 2),
            SegmentSpec::one_way(4.0, 1),
            SegmentSpec::one_way_inverted(4.0, 1),
        ];

        let mut rng = StdRng::seed_from_u64(seed);
        let mut network = SimRoadNetwork::new();

        let mut grid = vec![vec![NodeId::NONE; size]; size];
        for (row, nodes) in grid.iter_mut().enumerate() {
            for (col, node) in nodes.iter_mut().enumerate() {
                let x = col as f32 * SPACING;
                let z = row as f32 * SPACING;
                *node = network.add_node(Position::new(x, 0.0, z))?;
            }
        }

        let mut first = SegmentId::NONE;
        for row in 0..size {
            for col in 0..size {
                let mut neighbours = Vec::with_capacity(2);
                if col + 1 < size {
                    neighbours.push(grid[row][col + 1]);
                }
                if row + 1 < size {
                    neighbours.push(grid[row + 1][col]);
                }

                for neighbour in neighbours {
                    if rng.random_bool(MISSING_LINK_CHANCE) {
                        continue;
                    }
                    let spec = road_types[rng.random_range(0..road_types.len())];
                    let segment = network.add_segment(grid[row][col], neighbour, spec)?;
                    if !first.is_valid() {
                        first = segment;
                    }
                }
            }
        }

        info!(
            "Generated {}x{} grid (seed {}) with {} segments",
            size,
            size,
            seed,
            network.segment_count_total()
        );

        Ok(Self {
            name: "grid",
            focus_node: grid[size / 2][size / 2],
            network,
            focus_segment: first,
        })
    }

    /// Print the network and every rule the store holds
    pub fn print_summary(&self, store: &SimRuleStore) {
        println!("=== Scenario: {} ===", self.name);
        println!(
            "Nodes: {}, Segments: {}, Lanes: {}",
            self.network.node_count(),
            self.network.segment_count_total(),
            self.network.lane_count()
        );
        println!("Focus: {} / {}", self.focus_node, self.focus_segment);
        println!();

        println!("--- Segments ---");
        for segment in self.network.segments() {
            println!(
                "  {}: {} -> {}, half width {:.1}, lanes {}/{}{}{}",
                segment.id,
                segment.start_node,
                segment.end_node,
                segment.spec.half_width,
                segment.spec.forward_lanes,
                segment.spec.backward_lanes,
                if segment.spec.is_one_way() { ", one-way" } else { "" },
                if segment.spec.highway { ", highway" } else { "" },
            );
        }
        println!();

        println!("--- Priority signs ---");
        for (end, sign) in store.priority_signs() {
            let node = self
                .network
                .end_node(end)
                .map(|node| node.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("  {} at {}: {:?}", end.segment, node, sign);
        }
        println!();

        println!("--- Lane arrows ---");
        for (lane, arrows) in store.all_lane_arrows() {
            match self.network.lane(lane) {
                Some(info) => println!("  {} ({}): {:?}", lane, info.segment, arrows),
                None => println!("  {}: {:?}", lane, arrows),
            }
        }
        println!();

        println!("Lane connections: {}", store.lane_connection_count());
        println!("Rule changes: {}", store.mutation_count());
    }
}
