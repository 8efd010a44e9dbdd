//! Battlefield representation: terrain, tiles, and the live unit registry.
//!
//! This module contains:
//! - Terrain kinds and their movement/defense facts
//! - Tiles with their occupancy slot
//! - The `Board`, the only place tile occupancy is changed
//! - Movement range (cost-limited flood fill) and hop-radius expansion

use crate::game::GameError;
use crate::hex::GridPosition;
use crate::player::PlayerId;
use crate::scenario::{MapSource, SetupError};
use crate::unit::{Unit, UnitId, UnitStats};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Movement cost sentinel for tiles that can never be entered
pub const IMPASSABLE: u32 = u32::MAX;

/// Kind of ground a tile is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Grass,
    Hills,
    Mountains,
    ShallowWater,
    DeepWater,
    /// Gameplay-only: settlement tile
    City,
    /// Gameplay-only: resource site
    Resource,
    /// Gameplay-only: scenario-specific marker
    Special,
}

impl Terrain {
    /// All terrain kinds
    pub const ALL: [Terrain; 8] = [
        Terrain::Grass,
        Terrain::Hills,
        Terrain::Mountains,
        Terrain::ShallowWater,
        Terrain::DeepWater,
        Terrain::City,
        Terrain::Resource,
        Terrain::Special,
    ];

    /// Cost to enter a tile of this terrain, `IMPASSABLE` if it can't be entered
    pub const fn movement_cost(&self) -> u32 {
        match self {
            Terrain::Grass => 1,
            Terrain::Hills => 2,
            Terrain::Mountains => 3,
            Terrain::ShallowWater => 2,
            Terrain::DeepWater => IMPASSABLE,
            Terrain::City => 1,
            Terrain::Resource => 1,
            Terrain::Special => 1,
        }
    }

    /// Multiplier applied to a defender's defense stat (1.0 = neutral)
    pub const fn defense_multiplier(&self) -> f64 {
        match self {
            Terrain::Grass => 1.0,
            Terrain::Hills => 1.3,
            Terrain::Mountains => 1.5,
            Terrain::ShallowWater => 0.8,
            Terrain::DeepWater => 1.0,
            Terrain::City => 1.2,
            Terrain::Resource => 1.0,
            Terrain::Special => 1.1,
        }
    }

    pub const fn is_passable(&self) -> bool {
        !matches!(self, Terrain::DeepWater)
    }

    /// Kinds that exist for game rules rather than geography.
    /// Only these may be swapped while a game is running.
    pub const fn is_gameplay_only(&self) -> bool {
        matches!(self, Terrain::City | Terrain::Resource | Terrain::Special)
    }

    /// Single-character code used by text maps
    pub const fn symbol(&self) -> char {
        match self {
            Terrain::Grass => '.',
            Terrain::Hills => 'h',
            Terrain::Mountains => 'm',
            Terrain::ShallowWater => 'w',
            Terrain::DeepWater => 'W',
            Terrain::City => 'c',
            Terrain::Resource => 'r',
            Terrain::Special => 's',
        }
    }

    /// Inverse of [`Terrain::symbol`]
    pub fn from_symbol(symbol: char) -> Option<Terrain> {
        Terrain::ALL.into_iter().find(|t| t.symbol() == symbol)
    }
}

/// A single tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Position in the tile array
    pub position: GridPosition,
    terrain: Terrain,
    occupant: Option<UnitId>,
}

impl Tile {
    pub fn new(position: GridPosition, terrain: Terrain) -> Self {
        Self {
            position,
            terrain,
            occupant: None,
        }
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// The unit standing on this tile, if any
    pub fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn is_passable(&self) -> bool {
        self.terrain.is_passable()
    }

    pub fn movement_cost(&self) -> u32 {
        self.terrain.movement_cost()
    }

    pub fn defense_multiplier(&self) -> f64 {
        self.terrain.defense_multiplier()
    }

    /// Only the board calls this, always in pairs when a unit moves
    pub(crate) fn set_occupant(&mut self, unit: Option<UnitId>) {
        self.occupant = unit;
    }
}

/// The battlefield: a `width` x `height` tile array plus the unit arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: i32,
    height: i32,
    /// Tiles in row-major order
    tiles: Vec<Tile>,
    /// Unit arena indexed by `UnitId`; dead units leave a `None` slot
    units: Vec<Option<Unit>>,
}

impl Board {
    /// Build a board from a map source
    pub fn from_source(source: &impl MapSource) -> Result<Self, SetupError> {
        let (width, height) = (source.width(), source.height());
        if width <= 0 || height <= 0 {
            return Err(SetupError::EmptyMap);
        }

        let mut tiles = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            for col in 0..width {
                let position = GridPosition::new(col, row);
                tiles.push(Tile::new(position, source.terrain_at(position)));
            }
        }

        if !tiles.iter().any(Tile::is_passable) {
            return Err(SetupError::NoPassableTiles);
        }

        Ok(Self {
            width,
            height,
            tiles,
            units: Vec::new(),
        })
    }

    /// Board of the given size filled with one terrain kind
    pub fn filled(width: i32, height: i32, terrain: Terrain) -> Result<Self, SetupError> {
        Self::from_source(&crate::scenario::TerrainGrid::filled(width, height, terrain))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.is_within(self.width, self.height)
    }

    fn index(&self, pos: GridPosition) -> usize {
        (pos.row * self.width + pos.col) as usize
    }

    /// All tiles in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn tile_at(&self, pos: GridPosition) -> Result<&Tile, GameError> {
        if !self.contains(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        Ok(&self.tiles[self.index(pos)])
    }

    fn tile_at_mut(&mut self, pos: GridPosition) -> Result<&mut Tile, GameError> {
        if !self.contains(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        let index = self.index(pos);
        Ok(&mut self.tiles[index])
    }

    /// In-bounds neighbors of a position
    pub fn neighbors(&self, pos: GridPosition) -> Vec<GridPosition> {
        pos.neighbors_within(self.width, self.height)
    }

    // ==================== Units ====================

    /// Place a new unit on an empty, passable tile
    pub fn spawn_unit(
        &mut self,
        owner: PlayerId,
        stats: UnitStats,
        pos: GridPosition,
    ) -> Result<UnitId, GameError> {
        let tile = self.tile_at(pos)?;
        if !tile.is_passable() || tile.is_occupied() {
            return Err(GameError::IllegalMove {
                unit: None,
                to: pos,
            });
        }

        let id = UnitId(self.units.len() as u32);
        self.units.push(Some(Unit::new(id, owner, stats, pos)));
        self.tile_at_mut(pos)?.set_occupant(Some(id));

        debug!(unit = %id, owner, position = %pos, "unit spawned");
        Ok(id)
    }

    /// A living unit by id
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The unit standing at a position
    pub fn unit_at(&self, pos: GridPosition) -> Option<&Unit> {
        let tile = self.tile_at(pos).ok()?;
        tile.occupant().and_then(|id| self.unit(id))
    }

    /// All living units in id order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().flatten()
    }

    pub fn units_owned_by(&self, owner: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units().filter(move |u| u.owner == owner)
    }

    pub fn living_unit_count(&self, owner: PlayerId) -> usize {
        self.units_owned_by(owner).count()
    }

    /// Living units whose distance from `pos` is at most `radius`
    pub fn units_within(&self, pos: GridPosition, radius: u32) -> impl Iterator<Item = &Unit> {
        self.units()
            .filter(move |u| u.position.distance_to(&pos) <= radius)
    }

    /// Clear both action flags on every unit of a player
    pub fn reset_turn_flags(&mut self, owner: PlayerId) {
        for unit in self.units.iter_mut().flatten() {
            if unit.owner == owner {
                unit.reset_turn_flags();
            }
        }
    }

    // ==================== Movement ====================

    /// Tiles the unit can legally move to this turn.
    ///
    /// A tile is included when the cheapest sum of entry costs along a path of
    /// passable tiles does not exceed the unit's movement range and the tile
    /// itself is unoccupied. Tiles along the way may hold other units. The
    /// unit's own tile is never part of the set.
    pub fn movement_range(&self, id: UnitId) -> HashSet<GridPosition> {
        match self.unit(id) {
            Some(unit) => self.reachable_from(unit.position, unit.movement_range),
            None => HashSet::new(),
        }
    }

    /// Cost-limited flood fill from `origin` with the given budget
    pub fn reachable_from(&self, origin: GridPosition, budget: u32) -> HashSet<GridPosition> {
        if !self.contains(origin) {
            return HashSet::new();
        }

        let mut best: HashMap<GridPosition, u32> = HashMap::new();
        let mut frontier = BinaryHeap::new();
        best.insert(origin, 0);
        frontier.push(Reverse((0u32, origin)));

        while let Some(Reverse((cost, pos))) = frontier.pop() {
            if best.get(&pos).is_some_and(|&known| cost > known) {
                continue;
            }
            for next in self.neighbors(pos) {
                let tile = &self.tiles[self.index(next)];
                if !tile.is_passable() {
                    continue;
                }
                let next_cost = cost.saturating_add(tile.movement_cost());
                if next_cost > budget {
                    continue;
                }
                if best.get(&next).map_or(true, |&known| next_cost < known) {
                    best.insert(next, next_cost);
                    frontier.push(Reverse((next_cost, next)));
                }
            }
        }

        best.into_keys()
            .filter(|&pos| pos != origin && !self.tiles[self.index(pos)].is_occupied())
            .collect()
    }

    /// Move a unit to a tile in its movement range.
    ///
    /// Turn flags are left alone; the phase machine owns that bookkeeping.
    pub fn move_unit(&mut self, id: UnitId, dest: GridPosition) -> Result<(), GameError> {
        let dest_tile = self.tile_at(dest)?;
        let from = self.unit(id).ok_or(GameError::UnknownUnit(id))?.position;

        let illegal = GameError::IllegalMove {
            unit: Some(id),
            to: dest,
        };
        if !dest_tile.is_passable() || dest_tile.is_occupied() {
            return Err(illegal);
        }
        if !self.movement_range(id).contains(&dest) {
            return Err(illegal);
        }

        self.tile_at_mut(from)?.set_occupant(None);
        self.tile_at_mut(dest)?.set_occupant(Some(id));
        if let Some(unit) = self.unit_mut(id) {
            unit.position = dest;
        }

        debug!(unit = %id, from = %from, to = %dest, "unit moved");
        Ok(())
    }

    // ==================== Combat ====================

    /// Reduce a unit's health, removing it from the board if it reaches zero.
    /// Returns the unit's new health.
    pub fn apply_damage(&mut self, id: UnitId, amount: u32) -> Result<u32, GameError> {
        let unit = self.unit_mut(id).ok_or(GameError::UnknownUnit(id))?;
        let remaining = unit.take_damage(amount);
        let position = unit.position;

        if remaining == 0 {
            self.units[id.index()] = None;
            self.tile_at_mut(position)?.set_occupant(None);
            debug!(unit = %id, position = %position, "unit destroyed");
        }

        Ok(remaining)
    }

    // ==================== Queries ====================

    /// Positions within `radius` neighbor hops of `pos`, excluding `pos`.
    ///
    /// Plain breadth-first expansion ignoring terrain cost and occupancy,
    /// meant for highlighting. Sorted by (col, row).
    pub fn neighboring_tiles(
        &self,
        pos: GridPosition,
        radius: u32,
    ) -> Result<Vec<GridPosition>, GameError> {
        self.tile_at(pos)?;

        let mut seen = HashSet::from([pos]);
        let mut queue = VecDeque::from([(pos, 0u32)]);
        let mut found = Vec::new();

        while let Some((current, hops)) = queue.pop_front() {
            if hops == radius {
                continue;
            }
            for next in self.neighbors(current) {
                if seen.insert(next) {
                    found.push(next);
                    queue.push_back((next, hops + 1));
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Swap a gameplay-only terrain kind for another at runtime.
    /// Returns the terrain that was replaced.
    pub fn replace_gameplay_terrain(
        &mut self,
        pos: GridPosition,
        terrain: Terrain,
    ) -> Result<Terrain, GameError> {
        let tile = self.tile_at_mut(pos)?;
        let previous = tile.terrain;
        if !previous.is_gameplay_only() || !terrain.is_gameplay_only() {
            return Err(GameError::IllegalTerrainChange {
                at: pos,
                from: previous,
                to: terrain,
            });
        }
        tile.terrain = terrain;
        Ok(previous)
    }
}
