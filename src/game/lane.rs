//! Lane Topology
//!
//! The playfield is an ordered strip of lanes, left to right: one `curb`
//! start lane, N `highway` lanes carrying traffic, and a final `safe`
//! finish lane. Built once per run and never mutated.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, LANE_WIDTH, PLAYER_SIZE, VEHICLE_WIDTH};

/// Number of highway lanes in the standard layout.
pub const STANDARD_HIGHWAY_COUNT: usize = 15;

/// Lane role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    /// Start lane, no hazards, multiplier 1.00
    Curb,
    /// Traffic lane with a checkpoint
    Highway,
    /// Finish lane, terminal multiplier
    Safe,
}

/// Single lane. Offsets are in pixels from the left edge of the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub index: usize,
    pub kind: LaneKind,
    pub start_offset: Fixed,
    pub width: Fixed,
    /// Traffic direction, +1 flows down the screen
    pub direction: i8,
}

impl Lane {
    pub fn center(&self) -> Fixed {
        self.start_offset + self.width / 2
    }

    pub fn end_offset(&self) -> Fixed {
        self.start_offset + self.width
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneTopology {
    lanes: Vec<Lane>,
}

impl LaneTopology {
    /// Build `curb + highway_count × highway + safe`, all `lane_width` wide.
    pub fn new(highway_count: usize, lane_width: Fixed) -> Self {
        let mut lanes = Vec::with_capacity(highway_count + 2);
        let mut offset: Fixed = 0;

        let kinds = std::iter::once(LaneKind::Curb)
            .chain(std::iter::repeat(LaneKind::Highway).take(highway_count))
            .chain(std::iter::once(LaneKind::Safe));

        for (index, kind) in kinds.enumerate() {
            lanes.push(Lane {
                index,
                kind,
                start_offset: offset,
                width: lane_width,
                direction: 1,
            });
            offset += lane_width;
        }

        Self { lanes }
    }

    /// The layout the game ships with: 1 curb, 15 highways, 1 safe lane, 100 px each.
    pub fn standard() -> Self {
        Self::new(STANDARD_HIGHWAY_COUNT, LANE_WIDTH)
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lane_at(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(index)
    }

    pub fn total_width(&self) -> Fixed {
        self.lanes.iter().map(|l| l.width).sum()
    }

    pub fn lane_center(&self, index: usize) -> Option<Fixed> {
        self.lane_at(index).map(Lane::center)
    }

    /// Index of the finish lane.
    pub fn final_index(&self) -> usize {
        self.lanes.len().saturating_sub(1)
    }

    pub fn highway_indices(&self) -> Vec<usize> {
        self.lanes
            .iter()
            .filter(|l| l.kind == LaneKind::Highway)
            .map(|l| l.index)
            .collect()
    }

    pub fn highway_count(&self) -> usize {
        self.lanes.iter().filter(|l| l.kind == LaneKind::Highway).count()
    }

    pub fn is_highway(&self, index: usize) -> bool {
        matches!(self.lane_at(index), Some(l) if l.kind == LaneKind::Highway)
    }

    /// Left edge that centers the player token in a lane.
    pub fn token_x(&self, index: usize) -> Option<Fixed> {
        self.lane_at(index)
            .map(|l| l.start_offset + (l.width - PLAYER_SIZE) / 2)
    }

    /// Left edge that centers a vehicle in a lane.
    pub fn obstacle_x(&self, index: usize) -> Option<Fixed> {
        self.lane_at(index)
            .map(|l| l.start_offset + (l.width - VEHICLE_WIDTH) / 2)
    }
}

impl Default for LaneTopology {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;

    #[test]
    fn test_standard_layout() {
        let topo = LaneTopology::standard();
        assert_eq!(topo.len(), 17);
        assert_eq!(topo.lane_at(0).unwrap().kind, LaneKind::Curb);
        assert_eq!(topo.lane_at(16).unwrap().kind, LaneKind::Safe);
        assert_eq!(topo.highway_indices(), (1..=15).collect::<Vec<_>>());
        assert_eq!(topo.final_index(), 16);
        assert_eq!(topo.total_width(), from_int(1700));
    }

    #[test]
    fn test_offsets_accumulate() {
        let topo = LaneTopology::standard();
        for (i, lane) in topo.lanes().iter().enumerate() {
            let expected: Fixed = topo.lanes()[..i].iter().map(|l| l.width).sum();
            assert_eq!(lane.start_offset, expected);
        }
        assert_eq!(topo.lane_center(0), Some(from_int(50)));
        assert_eq!(topo.lane_center(3), Some(from_int(350)));
    }

    #[test]
    fn test_out_of_range() {
        let topo = LaneTopology::standard();
        assert!(topo.lane_at(17).is_none());
        assert!(topo.lane_center(99).is_none());
        assert!(!topo.is_highway(0));
        assert!(topo.is_highway(15));
        assert!(!topo.is_highway(16));
    }

    #[test]
    fn test_token_and_obstacle_x() {
        let topo = LaneTopology::standard();
        assert_eq!(topo.token_x(1), Some(from_int(120)));
        assert_eq!(topo.obstacle_x(2), Some(from_int(220)));
    }

    #[test]
    fn test_custom_layout() {
        let topo = LaneTopology::new(3, from_int(80));
        assert_eq!(topo.len(), 5);
        assert_eq!(topo.highway_count(), 3);
        assert_eq!(topo.lane_at(4).unwrap().start_offset, from_int(320));
    }
}
