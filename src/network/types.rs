//! Core types for the road network and its traffic rules
//!
//! These are plain value types shared by the network store, the traversers
//! and the junction rule engine.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Maximum number of segments a node can reference
pub const MAX_NODE_SEGMENTS: usize = 8;

/// Angle (degrees) between two segment directions above which a turn counts
/// as going straight
pub const FORWARD_ANGLE_THRESHOLD_DEG: f32 = 150.0;

/// A node (intersection or road end) identifier. 0 is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u16);

/// A segment identifier. 0 is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SegmentId(pub u16);

/// A lane identifier. 0 is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LaneId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl SegmentId {
    pub const NONE: SegmentId = SegmentId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl LaneId {
    pub const NONE: LaneId = LaneId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment {}", self.0)
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane {}", self.0)
    }
}

/// A 3D position in the world (y is up, the road plane is x/z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Unit direction in the road plane from this position towards another
    pub fn direction_to(&self, other: &Position) -> Direction {
        Direction::new(other.x - self.x, other.z - self.z)
    }
}

/// A unit vector in the x/z road plane (x east, z north)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Direction {
    pub x: f32,
    pub z: f32,
}

impl Direction {
    /// Creates a normalized direction. A zero vector stays zero.
    pub fn new(x: f32, z: f32) -> Self {
        let len = (x * x + z * z).sqrt();
        if len > f32::EPSILON {
            Self {
                x: x / len,
                z: z / len,
            }
        } else {
            Self { x: 0.0, z: 0.0 }
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            x: -self.x,
            z: -self.z,
        }
    }

    pub fn dot(self, other: Direction) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// Signed area of the parallelogram; positive when `other` lies
    /// counter-clockwise (to the left) of `self`
    pub fn cross(self, other: Direction) -> f32 {
        self.x * other.z - self.z * other.x
    }

    /// Unsigned angle to another direction in degrees
    pub fn angle_deg(self, other: Direction) -> f32 {
        self.dot(other).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// One end of a segment; the unit that carries directional rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentEnd {
    pub segment: SegmentId,
    pub start_node: bool,
}

impl SegmentEnd {
    pub fn new(segment: SegmentId, start_node: bool) -> Self {
        Self {
            segment,
            start_node,
        }
    }

    /// The end at the other side of the same segment
    pub fn opposite(self) -> Self {
        Self {
            segment: self.segment,
            start_node: !self.start_node,
        }
    }
}

/// Topological role of a node derived from its segment count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Zero or one segment
    DeadEnd,
    /// Exactly two segments
    Through,
    /// Three or more segments
    Junction,
}

impl NodeKind {
    pub fn from_segment_count(count: usize) -> Self {
        match count {
            0 | 1 => NodeKind::DeadEnd,
            2 => NodeKind::Through,
            _ => NodeKind::Junction,
        }
    }
}

/// Priority sign on a segment end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PriorityType {
    #[default]
    None,
    Main,
    Stop,
    Yield,
}

/// Turning relation between a segment end and another segment at its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowDirection {
    None,
    Left,
    Forward,
    Right,
    Turn,
}

/// Direction of travel on a lane relative to its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneDirection {
    /// Start node towards end node
    Forward,
    /// End node towards start node
    Backward,
}

macro_rules! mask_type {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub $repr);

        impl $name {
            pub const NONE: $name = $name(0);

            pub fn bits(self) -> $repr {
                self.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// True when every bit of `other` is set in `self`
            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            /// True when `self` and `other` share at least one bit
            pub fn intersects(self, other: $name) -> bool {
                self.0 & other.0 != 0
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = $name;

            fn bitand(self, rhs: $name) -> $name {
                $name(self.0 & rhs.0)
            }
        }
    };
}

mask_type!(
    /// Turn arrows painted on a lane
    LaneArrows(u8)
);

impl LaneArrows {
    pub const LEFT: LaneArrows = LaneArrows(1);
    pub const FORWARD: LaneArrows = LaneArrows(2);
    pub const RIGHT: LaneArrows = LaneArrows(4);
    pub const LEFT_FORWARD: LaneArrows = LaneArrows(1 | 2);
    pub const LEFT_RIGHT: LaneArrows = LaneArrows(1 | 4);
    pub const FORWARD_RIGHT: LaneArrows = LaneArrows(2 | 4);
    pub const LEFT_FORWARD_RIGHT: LaneArrows = LaneArrows(1 | 2 | 4);
}

impl fmt::Debug for LaneArrows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let mut parts = Vec::new();
        if self.contains(LaneArrows::LEFT) {
            parts.push("Left");
        }
        if self.contains(LaneArrows::FORWARD) {
            parts.push("Forward");
        }
        if self.contains(LaneArrows::RIGHT) {
            parts.push("Right");
        }
        write!(f, "{}", parts.join("|"))
    }
}

mask_type!(
    /// Kinds of lane a segment can carry
    #[derive(Debug)]
    LaneTypes(u8)
);

impl LaneTypes {
    pub const VEHICLE: LaneTypes = LaneTypes(1);
    pub const PEDESTRIAN: LaneTypes = LaneTypes(2);
    pub const PARKING: LaneTypes = LaneTypes(4);
    pub const TRANSPORT_VEHICLE: LaneTypes = LaneTypes(8);
}

mask_type!(
    /// Kinds of vehicle a lane admits
    #[derive(Debug)]
    VehicleTypes(u16)
);

impl VehicleTypes {
    pub const CAR: VehicleTypes = VehicleTypes(1);
    pub const BICYCLE: VehicleTypes = VehicleTypes(2);
    pub const TRAM: VehicleTypes = VehicleTypes(4);
    pub const TRAIN: VehicleTypes = VehicleTypes(8);
}

mask_type!(
    /// Turning relations a traversal is allowed to follow
    #[derive(Debug)]
    TraverseSide(u8)
);

impl TraverseSide {
    pub const LEFT: TraverseSide = TraverseSide(1);
    pub const STRAIGHT: TraverseSide = TraverseSide(2);
    pub const RIGHT: TraverseSide = TraverseSide(4);
    pub const ANY: TraverseSide = TraverseSide(1 | 2 | 4);

    /// Whether a turn in the given direction may be followed
    pub fn admits(self, direction: ArrowDirection) -> bool {
        match direction {
            ArrowDirection::Left => self.contains(TraverseSide::LEFT),
            ArrowDirection::Forward => self.contains(TraverseSide::STRAIGHT),
            ArrowDirection::Right => self.contains(TraverseSide::RIGHT),
            ArrowDirection::None | ArrowDirection::Turn => false,
        }
    }
}

/// Lanes that receive turn arrows
pub const LANE_TYPES: LaneTypes = LaneTypes(LaneTypes::VEHICLE.0 | LaneTypes::TRANSPORT_VEHICLE.0);

/// Vehicles whose lanes receive turn arrows
pub const VEHICLE_TYPES: VehicleTypes = VehicleTypes::CAR;

/// Geometric attributes of a segment as seen by the rule engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentGeometry {
    pub half_width: f32,
    /// Car lanes travelling start -> end
    pub forward_lanes: u8,
    /// Car lanes travelling end -> start
    pub backward_lanes: u8,
    pub one_way: bool,
    /// One-way traffic flows end -> start
    pub inverted: bool,
    pub highway: bool,
    /// Points from the start node into the segment
    pub start_direction: Direction,
    /// Points from the end node into the segment
    pub end_direction: Direction,
}

impl SegmentGeometry {
    pub fn car_lane_count(&self) -> u32 {
        u32::from(self.forward_lanes) + u32::from(self.backward_lanes)
    }

    pub fn direction_at(&self, start_node: bool) -> Direction {
        if start_node {
            self.start_direction
        } else {
            self.end_direction
        }
    }
}

/// Per-visit record produced by the segment traverser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitData {
    /// Segment the walk came from (equal to `cur_segment` on the initial visit)
    pub prev_segment: SegmentId,
    pub cur_segment: SegmentId,
    /// Whether this branch left the initial segment through its start node
    pub via_initial_start_node: bool,
    /// Whether `cur_segment` was entered through its start node
    pub via_start_node: bool,
    pub initial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_arrow_masks_combine() {
        let arrows = LaneArrows::FORWARD | LaneArrows::RIGHT;
        assert_eq!(arrows, LaneArrows::FORWARD_RIGHT);
        assert!(arrows.contains(LaneArrows::RIGHT));
        assert!(!arrows.contains(LaneArrows::LEFT));
        assert_eq!(format!("{:?}", arrows), "Forward|Right");
    }

    #[test]
    fn node_kind_from_count() {
        assert_eq!(NodeKind::from_segment_count(1), NodeKind::DeadEnd);
        assert_eq!(NodeKind::from_segment_count(2), NodeKind::Through);
        assert_eq!(NodeKind::from_segment_count(5), NodeKind::Junction);
    }

    #[test]
    fn direction_cross_is_positive_for_left() {
        let north = Direction::new(0.0, 1.0);
        let west = Direction::new(-1.0, 0.0);
        assert!(north.cross(west) > 0.0);
        assert!((north.angle_deg(north.reversed()) - 180.0).abs() < 1e-3);
    }
}
