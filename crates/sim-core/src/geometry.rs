//! Positions, room names, room adjacency, and peaks.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A parsed room name, e.g. "W3N5" -> (West, 3, North, 5).
///
/// Follows the host's room name pattern `/^([WE])(\d+)([NS])(\d+)$/` (bit-level
/// compatible, see SPEC_FULL §13 / spec.md §6.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomName {
    pub west: bool,
    pub x: i32,
    pub north: bool,
    pub y: i32,
}

impl RoomName {
    /// Parse a room name string, failing with `ValidationError::InvalidRoomName`
    /// rather than panicking on malformed input.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let bytes = s.as_bytes();
        let mut chars = s.char_indices();
        let (_, ew) = chars.next().ok_or_else(|| bad(s))?;
        let west = match ew {
            'W' => true,
            'E' => false,
            _ => return Err(bad(s)),
        };
        let mut x_end = bytes.len();
        let mut ns_idx = None;
        for (i, c) in chars.by_ref() {
            if c == 'N' || c == 'S' {
                ns_idx = Some(i);
                x_end = i;
                break;
            }
            if !c.is_ascii_digit() {
                return Err(bad(s));
            }
        }
        let ns_idx = ns_idx.ok_or_else(|| bad(s))?;
        let x: i32 = s[1..x_end].parse().map_err(|_| bad(s))?;
        let north = match s.as_bytes()[ns_idx] {
            b'N' => true,
            b'S' => false,
            _ => return Err(bad(s)),
        };
        let y_str = &s[ns_idx + 1..];
        if y_str.is_empty() || !y_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad(s));
        }
        let y: i32 = y_str.parse().map_err(|_| bad(s))?;
        Ok(RoomName { west, x, north, y })
    }

    /// Signed integer room-grid coordinates, with West/South negative so that
    /// adjacency is a simple Chebyshev test.
    pub fn grid_coords(&self) -> (i32, i32) {
        let gx = if self.west { -self.x - 1 } else { self.x };
        let gy = if self.north { -self.y - 1 } else { self.y };
        (gx, gy)
    }

    /// True iff `self` and `other` are adjacent rooms: Chebyshev distance of
    /// exactly 1 in room-grid coordinates (spec.md §3.1).
    pub fn is_adjacent(&self, other: &RoomName) -> bool {
        if self == other {
            return false;
        }
        let (ax, ay) = self.grid_coords();
        let (bx, by) = other.grid_coords();
        let dx = (ax - bx).abs();
        let dy = (ay - by).abs();
        dx.max(dy) == 1
    }
}

fn bad(s: &str) -> ValidationError {
    ValidationError::InvalidRoomName(s.to_string())
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.west { "W" } else { "E" },
            self.x,
            if self.north { "N" } else { "S" },
            self.y
        )
    }
}

impl Serialize for RoomName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomName::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A tile position: local room coordinates in `[0,49]` plus the room it lives
/// in (spec.md §3.1, grid constants in §6.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
    pub room: RoomName,
}

impl Position {
    pub fn new(x: u8, y: u8, room: RoomName) -> Self {
        Position { x, y, room }
    }

    /// Global tile coordinates: each room occupies a 50x50 block in an
    /// infinite grid, so Chebyshev distance is well-defined across room
    /// borders (used by cross-room edge construction, §4.A).
    pub fn world_coords(&self) -> (i64, i64) {
        let (rx, ry) = self.room.grid_coords();
        (
            rx as i64 * 50 + self.x as i64,
            ry as i64 * 50 + self.y as i64,
        )
    }

    /// Chebyshev (L-infinity) distance between two positions, in world tiles.
    pub fn chebyshev(&self, other: &Position) -> u32 {
        let (ax, ay) = self.world_coords();
        let (bx, by) = other.world_coords();
        (ax - bx).unsigned_abs().max((ay - by).unsigned_abs()) as u32
    }

    /// The 8 neighbouring positions, clamped to stay within the room's 0..=49
    /// bounds (no cross-room walking here; cross-room adjacency is handled
    /// separately by the node-level nearest-neighbour pass).
    pub fn neighbours8(&self) -> Vec<Position> {
        let mut out = Vec::with_capacity(8);
        for dx in -1i16..=1 {
            for dy in -1i16..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = self.x as i16 + dx;
                let ny = self.y as i16 + dy;
                if (0..=49).contains(&nx) && (0..=49).contains(&ny) {
                    out.push(Position::new(nx as u8, ny as u8, self.room));
                }
            }
        }
        out
    }
}

/// A local terrain maximum in a room: a cluster of tiles with a representative
/// center, the tiles it claims as territory, and a scalar height (spec.md
/// §2, §3.1). Produced by the world-sensing layer outside this core (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Peak {
    pub center: Position,
    pub territory: Vec<Position>,
    pub height: f64,
}

/// True iff any tile in `a` has an 8-neighbour tile in `b` (shared-boundary
/// test used both for peak merging and for node adjacency, spec.md §4.A).
pub fn territories_touch(a: &[Position], b: &[Position]) -> bool {
    use std::collections::HashSet;
    let b_set: HashSet<Position> = b.iter().copied().collect();
    for p in a {
        for n in p.neighbours8() {
            if b_set.contains(&n) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_quadrants() {
        let w = RoomName::parse("W3N5").unwrap();
        assert!(w.west && w.north && w.x == 3 && w.y == 5);
        let e = RoomName::parse("E12S0").unwrap();
        assert!(!e.west && !e.north && e.x == 12 && e.y == 0);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(RoomName::parse("X3N5").is_err());
        assert!(RoomName::parse("W3N").is_err());
        assert!(RoomName::parse("").is_err());
    }

    #[test]
    fn adjacency_is_chebyshev_one() {
        let a = RoomName::parse("W3N5").unwrap();
        let b = RoomName::parse("W4N5").unwrap();
        let c = RoomName::parse("W5N5").unwrap();
        assert!(a.is_adjacent(&b));
        assert!(!a.is_adjacent(&c));
        assert!(!a.is_adjacent(&a));
    }

    #[test]
    fn cross_room_chebyshev_distance() {
        let room_a = RoomName::parse("W1N1").unwrap();
        let room_b = RoomName::parse("W2N1").unwrap();
        let p1 = Position::new(49, 25, room_a);
        let p2 = Position::new(0, 25, room_b);
        assert_eq!(p1.chebyshev(&p2), 1);
    }

    #[test]
    fn neighbours8_clamped_at_room_edge() {
        let room = RoomName::parse("W1N1").unwrap();
        let corner = Position::new(0, 0, room);
        assert_eq!(corner.neighbours8().len(), 3);
    }

    #[test]
    fn territories_touch_detects_shared_boundary() {
        let room = RoomName::parse("W1N1").unwrap();
        let a = vec![Position::new(5, 5, room)];
        let b = vec![Position::new(6, 6, room)];
        let c = vec![Position::new(10, 10, room)];
        assert!(territories_touch(&a, &b));
        assert!(!territories_touch(&a, &c));
    }

    use proptest::prelude::*;

    fn arb_room() -> impl Strategy<Value = RoomName> {
        (any::<bool>(), 0i32..200, any::<bool>(), 0i32..200)
            .prop_map(|(west, x, north, y)| RoomName { west, x, north, y })
    }

    proptest! {
        #[test]
        fn room_name_display_parse_round_trips(room in arb_room()) {
            let parsed = RoomName::parse(&room.to_string()).unwrap();
            prop_assert_eq!(parsed, room);
        }

        #[test]
        fn chebyshev_is_symmetric_and_zero_for_self(
            room in arb_room(),
            x1 in 0u8..50, y1 in 0u8..50,
            x2 in 0u8..50, y2 in 0u8..50,
        ) {
            let a = Position::new(x1, y1, room);
            let b = Position::new(x2, y2, room);
            prop_assert_eq!(a.chebyshev(&b), b.chebyshev(&a));
            prop_assert_eq!(a.chebyshev(&a), 0);
        }
    }
}
