//! Battle terrain: a forest-filled grid with carved corridors linking the
//! control points, and A* pathfinding over the result.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rand::Rng;
use rand::rngs::SmallRng;

use crate::consts;
use crate::engine::context::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn distance(self, other: GridPos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Center of the tile in world units.
    pub fn to_world(self) -> (f32, f32) {
        (
            self.x as f32 * consts::TILE_SIZE + consts::TILE_SIZE / 2.0,
            self.y as f32 * consts::TILE_SIZE + consts::TILE_SIZE / 2.0,
        )
    }

    pub fn from_world(x: f32, y: f32) -> Self {
        Self {
            x: (x / consts::TILE_SIZE).floor() as i32,
            y: (y / consts::TILE_SIZE).floor() as i32,
        }
    }

    pub fn neighbors4(self) -> [GridPos; 4] {
        [
            GridPos::new(self.x, self.y - 1),
            GridPos::new(self.x, self.y + 1),
            GridPos::new(self.x - 1, self.y),
            GridPos::new(self.x + 1, self.y),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Hq,
    SupplyDepot,
    Outpost,
    Gate,
}

/// A strongpoint on the battlefield. Ownership is per battle side. Only
/// gates carry health; everything else changes hands by capture.
#[derive(Debug, Clone)]
pub struct ControlPoint {
    pub id: usize,
    pub kind: PointKind,
    pub owner: Option<Side>,
    pub pos: GridPos,
    pub health: f32,
}

impl ControlPoint {
    pub fn is_destroyed(&self) -> bool {
        self.kind == PointKind::Gate && self.health <= 0.0
    }

    /// A standing gate blocks movement through its tile.
    pub fn blocks(&self) -> bool {
        self.kind == PointKind::Gate && !self.is_destroyed()
    }

    /// Convert a captured neutral point into its chosen role. Gates are
    /// fixed map structures and never a capture outcome.
    pub fn assume_kind(&mut self, kind: PointKind, owner: Side) {
        self.kind = kind;
        self.owner = Some(owner);
    }
}

#[derive(Debug, Clone)]
pub struct BattleMap {
    walkable: Vec<bool>,
    pub points: Vec<ControlPoint>,
}

impl BattleMap {
    /// Carve a battlefield: everything starts as blocking forest, then the
    /// two HQs, a handful of neutral points, and connecting corridors are
    /// cut out. The two HQs are always linked so a battle cannot stall on
    /// terrain.
    pub fn generate(rng: &mut SmallRng) -> BattleMap {
        let mut map = BattleMap {
            walkable: vec![false; (consts::MAP_WIDTH * consts::MAP_HEIGHT) as usize],
            points: Vec::new(),
        };

        let defender_hq = GridPos::new(3, consts::MAP_HEIGHT / 2);
        let attacker_hq = GridPos::new(consts::MAP_WIDTH - 4, consts::MAP_HEIGHT / 2);
        map.place_point(defender_hq, PointKind::Hq, Some(Side::Defenders));
        map.place_point(attacker_hq, PointKind::Hq, Some(Side::Attackers));

        // A defender gate plugs the main road out of their HQ; attackers
        // breach it or squeeze past on the carved shoulder.
        let gate = GridPos::new(defender_hq.x + 4, consts::MAP_HEIGHT / 2);
        map.place_point(gate, PointKind::Gate, Some(Side::Defenders));

        for _ in 0..consts::NEUTRAL_POINT_ATTEMPTS {
            let pos = GridPos::new(
                rng.random_range(6..consts::MAP_WIDTH - 6),
                rng.random_range(3..consts::MAP_HEIGHT - 3),
            );
            let too_close = map.points.iter().any(|p| {
                let (ax, ay) = p.pos.to_world();
                let (bx, by) = pos.to_world();
                ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt() < consts::POINT_SPACING
            });
            if too_close {
                continue;
            }
            let kind = if rng.random_bool(0.5) {
                PointKind::SupplyDepot
            } else {
                PointKind::Outpost
            };
            map.place_point(pos, kind, None);
        }

        // Each point links to its two nearest neighbors.
        let positions: Vec<GridPos> = map.points.iter().map(|p| p.pos).collect();
        for &from in &positions {
            let mut others: Vec<GridPos> =
                positions.iter().copied().filter(|&p| p != from).collect();
            others.sort_by(|a, b| {
                from.distance(*a)
                    .partial_cmp(&from.distance(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for &to in others.iter().take(2) {
                map.carve_line(from, to);
            }
        }
        map.carve_line(defender_hq, attacker_hq);

        map
    }

    fn place_point(&mut self, pos: GridPos, kind: PointKind, owner: Option<Side>) {
        let id = self.points.len();
        self.points.push(ControlPoint {
            id,
            kind,
            owner,
            pos,
            health: if kind == PointKind::Gate {
                consts::GATE_HEALTH
            } else {
                0.0
            },
        });
        self.carve_area(pos, 2);
    }

    fn carve_area(&mut self, center: GridPos, radius: i32) {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let pos = GridPos::new(center.x + dx, center.y + dy);
                if self.in_bounds(pos) {
                    let idx = self.index(pos);
                    self.walkable[idx] = true;
                }
            }
        }
    }

    /// Bresenham line with a radius-1 brush.
    fn carve_line(&mut self, from: GridPos, to: GridPos) {
        let (mut x0, mut y0) = (from.x, from.y);
        let (x1, y1) = (to.x, to.y);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.carve_area(GridPos::new(x0, y0), 1);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn index(&self, pos: GridPos) -> usize {
        (pos.x * consts::MAP_HEIGHT + pos.y) as usize
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < consts::MAP_WIDTH && pos.y >= 0 && pos.y < consts::MAP_HEIGHT
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.in_bounds(pos) && self.walkable[self.index(pos)]
    }

    /// Walkable and not plugged by a standing gate.
    pub fn is_passable(&self, pos: GridPos) -> bool {
        self.is_walkable(pos)
            && !self
                .points
                .iter()
                .any(|p| p.blocks() && p.pos == pos)
    }

    pub fn point(&self, id: usize) -> &ControlPoint {
        &self.points[id]
    }

    pub fn point_mut(&mut self, id: usize) -> &mut ControlPoint {
        &mut self.points[id]
    }

    /// A* over passable tiles, 4-way, Euclidean heuristic. An impassable
    /// goal retargets to its nearest passable neighbor. The returned path
    /// excludes the start tile.
    pub fn find_path(&self, start: GridPos, goal: GridPos) -> Option<Vec<GridPos>> {
        let goal = if self.is_passable(goal) {
            goal
        } else {
            goal.neighbors4()
                .into_iter()
                .filter(|&n| self.is_passable(n))
                .min_by(|a, b| {
                    start
                        .distance(*a)
                        .partial_cmp(&start.distance(*b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })?
        };
        if start == goal {
            return Some(Vec::new());
        }

        let mut open: BinaryHeap<(Reverse<u32>, GridPos)> = BinaryHeap::new();
        let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();
        let mut g_score: HashMap<GridPos, f32> = HashMap::from([(start, 0.0)]);
        let mut in_open: HashSet<GridPos> = HashSet::from([start]);
        open.push((Reverse(0), start));

        while let Some((_, current)) = open.pop() {
            in_open.remove(&current);
            if current == goal {
                let mut path = vec![current];
                let mut node = current;
                while let Some(&prev) = came_from.get(&node) {
                    path.push(prev);
                    node = prev;
                }
                path.pop(); // drop the start tile
                path.reverse();
                return Some(path);
            }
            let current_g = g_score[&current];
            for neighbor in current.neighbors4() {
                if !self.is_passable(neighbor) {
                    continue;
                }
                let tentative = current_g + 1.0;
                if g_score.get(&neighbor).is_none_or(|&g| tentative < g) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative);
                    if in_open.insert(neighbor) {
                        let f = tentative + neighbor.distance(goal);
                        // Scale to keep ordering while using an integer heap key.
                        open.push((Reverse((f * 16.0) as u32), neighbor));
                    }
                }
            }
        }
        None
    }

    pub fn defender_hq(&self) -> &ControlPoint {
        &self.points[0]
    }

    pub fn attacker_hq(&self) -> &ControlPoint {
        &self.points[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn hqs_exist_and_sit_on_open_ground() {
        for seed in 0..10 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let map = BattleMap::generate(&mut rng);
            assert_eq!(map.defender_hq().kind, PointKind::Hq);
            assert_eq!(map.attacker_hq().kind, PointKind::Hq);
            assert_eq!(map.defender_hq().owner, Some(Side::Defenders));
            assert_eq!(map.attacker_hq().owner, Some(Side::Attackers));
            for point in &map.points {
                assert!(map.is_walkable(point.pos), "seed {seed}: point in forest");
            }
        }
    }

    #[test]
    fn hqs_are_always_connected() {
        for seed in 0..10 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let map = BattleMap::generate(&mut rng);
            let path = map.find_path(map.defender_hq().pos, map.attacker_hq().pos);
            assert!(path.is_some(), "seed {seed}: no path between HQs");
        }
    }

    #[test]
    fn neutral_points_keep_their_distance() {
        let mut rng = SmallRng::seed_from_u64(3);
        let map = BattleMap::generate(&mut rng);
        for a in &map.points {
            for b in &map.points {
                if a.id == b.id {
                    continue;
                }
                let (ax, ay) = a.pos.to_world();
                let (bx, by) = b.pos.to_world();
                let dist = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
                assert!(dist >= consts::POINT_SPACING - f32::EPSILON);
            }
        }
    }

    #[test]
    fn every_map_raises_a_defender_gate_on_the_road() {
        for seed in 0..10 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let map = BattleMap::generate(&mut rng);
            let gate = map
                .points
                .iter()
                .find(|p| p.kind == PointKind::Gate)
                .expect("no gate generated");
            assert_eq!(gate.owner, Some(Side::Defenders));
            assert_eq!(gate.health, consts::GATE_HEALTH);
        }
    }

    #[test]
    fn standing_gate_blocks_and_falls_open() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut map = BattleMap::generate(&mut rng);
        let gate = map
            .points
            .iter()
            .find(|p| p.kind == PointKind::Gate)
            .map(|p| (p.id, p.pos))
            .unwrap();
        assert!(map.is_walkable(gate.1));
        assert!(!map.is_passable(gate.1));
        map.point_mut(gate.0).health = 0.0;
        assert!(map.is_passable(gate.1));
    }

    #[test]
    fn carving_opens_the_ground_around_every_point() {
        let mut rng = SmallRng::seed_from_u64(7);
        let map = BattleMap::generate(&mut rng);
        for point in &map.points {
            for dx in -2..=2 {
                for dy in -2..=2 {
                    let pos = GridPos::new(point.pos.x + dx, point.pos.y + dy);
                    if map.in_bounds(pos) {
                        assert!(map.is_walkable(pos), "uncarved tile next to a point");
                    }
                }
            }
        }
    }

    #[test]
    fn path_excludes_start_and_steps_are_adjacent() {
        let mut rng = SmallRng::seed_from_u64(5);
        let map = BattleMap::generate(&mut rng);
        let start = map.defender_hq().pos;
        let goal = map.attacker_hq().pos;
        let path = map.find_path(start, goal).unwrap();
        assert_ne!(path.first(), Some(&start));
        assert_eq!(*path.last().unwrap(), goal);
        let mut prev = start;
        for &step in &path {
            assert_eq!(prev.manhattan(step), 1);
            prev = step;
        }
    }

    #[test]
    fn blocked_goal_retargets_to_a_neighbor() {
        let mut rng = SmallRng::seed_from_u64(6);
        let map = BattleMap::generate(&mut rng);
        // A forest tile adjacent to open ground near the attacker HQ.
        let hq = map.attacker_hq().pos;
        let forest = GridPos::new(hq.x, hq.y - 3);
        if !map.is_walkable(forest) {
            let path = map.find_path(map.defender_hq().pos, forest);
            if let Some(path) = path {
                assert!(map.is_passable(*path.last().unwrap()));
            }
        }
    }
}
