//! Collision Detection
//!
//! Token-versus-vehicle overlap using strict AABB tests.

use crate::core::fixed::PLAYER_SIZE;
use crate::core::vec2::{FixedVec2, Rect};
use crate::game::traffic::Obstacle;

/// Hitbox of the player token at `position` (top-left corner).
#[inline]
pub fn player_bounds(position: FixedVec2) -> Rect {
    Rect::new(position, PLAYER_SIZE, PLAYER_SIZE)
}

/// Check if the token overlaps a vehicle.
#[inline]
pub fn check_obstacle_collision(player: &Rect, obstacle: &Obstacle) -> bool {
    player.overlaps(&obstacle.bounds())
}

/// First vehicle hit by the token, in iteration order.
///
/// Iteration order comes from the simulator (lane, then spawn order),
/// so the reported vehicle is deterministic when several overlap.
pub fn first_collision<'a>(
    player: &Rect,
    obstacles: impl IntoIterator<Item = &'a Obstacle>,
) -> Option<u32> {
    obstacles
        .into_iter()
        .find(|o| check_obstacle_collision(player, o))
        .map(|o| o.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, PLAYER_Y, VEHICLE_HEIGHT, VEHICLE_WIDTH};
    use crate::game::traffic::VehicleKind;

    fn vehicle(id: u32, x: i32, y: i32) -> Obstacle {
        Obstacle {
            id,
            lane_index: 1,
            position: FixedVec2::from_ints(x, y),
            speed: from_int(2),
            width: VEHICLE_WIDTH,
            height: VEHICLE_HEIGHT,
            lane_offset: from_int(100),
            kind: VehicleKind::Sedan,
            is_hazard_formation: false,
            formation_id: None,
        }
    }

    #[test]
    fn test_hit_in_same_lane() {
        let token = player_bounds(FixedVec2::new(from_int(120), PLAYER_Y));
        // Vehicle covering y 100..220 in lane 1 (x 120..180)
        assert!(check_obstacle_collision(&token, &vehicle(1, 120, 100)));
    }

    #[test]
    fn test_miss_above_and_beside() {
        let token = player_bounds(FixedVec2::new(from_int(120), PLAYER_Y));
        // Bottom edge exactly at the token's top edge (161)
        assert!(!check_obstacle_collision(&token, &vehicle(1, 120, 41)));
        // Neighboring lane
        assert!(!check_obstacle_collision(&token, &vehicle(1, 220, 150)));
    }

    #[test]
    fn test_first_collision_order() {
        let token = player_bounds(FixedVec2::new(from_int(120), PLAYER_Y));
        let vehicles = vec![vehicle(4, 500, 150), vehicle(7, 120, 150), vehicle(9, 130, 160)];
        assert_eq!(first_collision(&token, &vehicles), Some(7));
        assert_eq!(first_collision(&token, &vehicles[..1]), None);
    }
}
