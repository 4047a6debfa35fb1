//! Tile grid, entity placement and the actor arena.
//!
//! The grid only stores entity references. Actor records live in an arena
//! keyed by [`EntityId`], and a location index maps every placed entity to
//! its cell, so relocation and removal are index updates rather than grid
//! scans. All cell access goes through [`World::index`], which fixes the axis
//! order to row-major `(x, y)` and rejects coordinates outside the grid.

use log::info;
use shared::{
    BlockId, BlockRecord, BlockType, Direction, EntityId, EntityRecord, EntityType, MapRecord,
    PlayerId, SkeletonInfo, Stance, Stats,
};
use std::collections::HashMap;

/// Fixed arena template. `W` is wall, space is floor, anything else is wall.
pub const ARENA_LAYOUT: [&str; 13] = [
    "WWWWWWWWWWWWWWWWW",
    "WWW     W     WWW",
    "WWW     W     WWW",
    "W               W",
    "W       W       W",
    "W       W       W",
    "WWWW WWWWWWW WWWW",
    "W       W       W",
    "W               W",
    "W               W",
    "WWW     W     WWW",
    "WWW     W     WWW",
    "WWWWWWWWWWWWWWWWW",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("({x}, {y}) is outside the {width}x{height} world")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },
    #[error("({x}, {y}) is not passable")]
    Impassable { x: i32, y: i32 },
    #[error("entity {0} is not on the map")]
    UnknownEntity(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

/// One grid cell.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    block_type: BlockType,
    passable: bool,
    entities: Vec<EntityRecord>,
}

impl Block {
    fn from_tile(tile: char) -> Self {
        let block_type = match tile {
            ' ' => BlockType::Floor,
            _ => BlockType::Wall,
        };

        Self {
            id: BlockId::generate(),
            block_type,
            passable: block_type == BlockType::Floor,
            entities: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn is_passable(&self) -> bool {
        self.passable
    }

    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|entity| entity.guid == id)
    }

    /// First skeleton standing on this block, if any.
    pub fn first_skeleton(&self) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|entity| entity.entity_type == EntityType::Skeleton)
            .map(|entity| entity.guid)
    }

    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            block_type: self.block_type,
            is_passable: self.passable,
            entities: self.entities.clone(),
            block_guid: self.id,
        }
    }
}

/// Actor record stored in the world's arena.
///
/// The position is owned by the [`World`]; it changes only through
/// [`World::relocate`], which keeps it in step with the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub id: EntityId,
    pub owner: PlayerId,
    pub name: String,
    pub hit_points: i32,
    pub attack_power: i32,
    pub armor_class: i32,
    pub stats: Option<Stats>,
    pub stance: Stance,
    position: Position,
}

impl Skeleton {
    /// Builds an actor from a client's registration record. The server
    /// assigns a fresh identifier; coordinates are set on placement.
    pub fn from_info(owner: PlayerId, info: SkeletonInfo) -> Self {
        Self {
            id: EntityId::generate(),
            owner,
            name: info.name,
            hit_points: info.hit_points,
            attack_power: info.attack_power,
            armor_class: info.armor_class,
            stats: info.stats,
            stance: info.fight_stance,
            position: Position::new(0, 0),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points >= 1
    }

    fn to_info(&self, block: Option<BlockId>) -> SkeletonInfo {
        SkeletonInfo {
            guid: self.id,
            entity_type: EntityType::Skeleton,
            name: self.name.clone(),
            hit_points: self.hit_points,
            attack_power: self.attack_power,
            armor_class: self.armor_class,
            xcoord: self.position.x,
            ycoord: self.position.y,
            assigned_to_entity: block,
            stats: self.stats,
            fight_stance: self.stance,
        }
    }
}

/// The shared arena map.
#[derive(Debug, Clone)]
pub struct World {
    id: i32,
    width: usize,
    height: usize,
    blocks: Vec<Block>,
    block_index: HashMap<BlockId, Position>,
    locations: HashMap<EntityId, Position>,
    skeletons: HashMap<EntityId, Skeleton>,
}

impl World {
    /// Builds the reference arena from [`ARENA_LAYOUT`].
    pub fn arena() -> Self {
        let world = Self::from_layout(&ARENA_LAYOUT);
        info!("Map created ({}x{})", world.width, world.height);
        world
    }

    /// Builds a world from ASCII rows. Short rows are padded with wall.
    pub fn from_layout(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);

        let mut blocks = Vec::with_capacity(width * height);
        let mut block_index = HashMap::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            let mut tiles = row.chars();
            for x in 0..width {
                let block = Block::from_tile(tiles.next().unwrap_or('W'));
                block_index.insert(block.id, Position::new(x as i32, y as i32));
                blocks.push(block);
            }
        }

        Self {
            id: 1,
            width,
            height,
            blocks,
            block_index,
            locations: HashMap::new(),
            skeletons: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as usize) < self.width
            && (position.y as usize) < self.height
    }

    fn index(&self, position: Position) -> Result<usize, WorldError> {
        if !self.contains(position) {
            return Err(WorldError::OutOfBounds {
                x: position.x,
                y: position.y,
                width: self.width,
                height: self.height,
            });
        }

        Ok(position.y as usize * self.width + position.x as usize)
    }

    pub fn block(&self, position: Position) -> Result<&Block, WorldError> {
        let index = self.index(position)?;
        Ok(&self.blocks[index])
    }

    fn block_mut(&mut self, position: Position) -> Result<&mut Block, WorldError> {
        let index = self.index(position)?;
        Ok(&mut self.blocks[index])
    }

    pub fn block_by_id(&self, id: BlockId) -> Option<&Block> {
        let position = self.block_index.get(&id)?;
        self.block(*position).ok()
    }

    pub fn is_passable(&self, position: Position) -> Result<bool, WorldError> {
        Ok(self.block(position)?.is_passable())
    }

    /// Places an entity reference on a passable block.
    ///
    /// Returns `Ok(false)` without changing anything when the block is not
    /// passable or the entity is already placed somewhere.
    pub fn add_entity(&mut self, position: Position, entity: EntityRecord) -> Result<bool, WorldError> {
        let block = self.block_mut(position)?;
        if !block.passable {
            return Ok(false);
        }
        if self.locations.contains_key(&entity.guid) {
            return Ok(false);
        }

        self.block_mut(position)?.entities.push(entity);
        self.locations.insert(entity.guid, position);
        Ok(true)
    }

    /// Removes an entity from the grid, dropping its arena record if it is an
    /// actor. Returns the cell it occupied.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Position> {
        let position = self.locations.remove(&id)?;
        if let Ok(block) = self.block_mut(position) {
            if let Some(slot) = block.entities.iter().position(|entity| entity.guid == id) {
                block.entities.remove(slot);
            }
        }
        self.skeletons.remove(&id);
        Some(position)
    }

    /// Places a new actor on `position` and stores it in the arena.
    pub fn spawn_skeleton(
        &mut self,
        mut skeleton: Skeleton,
        position: Position,
    ) -> Result<EntityId, WorldError> {
        let record = EntityRecord {
            guid: skeleton.id,
            entity_type: EntityType::Skeleton,
        };

        if !self.add_entity(position, record)? {
            return Err(WorldError::Impassable {
                x: position.x,
                y: position.y,
            });
        }

        let id = skeleton.id;
        skeleton.position = position;
        self.skeletons.insert(id, skeleton);
        Ok(id)
    }

    pub fn remove_skeleton(&mut self, id: EntityId) -> Option<Skeleton> {
        let skeleton = self.skeletons.get(&id).cloned()?;
        self.remove_entity(id);
        Some(skeleton)
    }

    /// Moves a placed entity to `to` if that block is passable.
    ///
    /// Source removal, destination insertion and the stored coordinates are
    /// updated together; on `Ok(false)` or an error nothing has changed.
    pub fn relocate(&mut self, id: EntityId, to: Position) -> Result<bool, WorldError> {
        let from = *self
            .locations
            .get(&id)
            .ok_or(WorldError::UnknownEntity(id))?;

        if !self.block(to)?.is_passable() {
            return Ok(false);
        }
        if from == to {
            return Ok(true);
        }

        let source = self.block_mut(from)?;
        let slot = source
            .entities
            .iter()
            .position(|entity| entity.guid == id)
            .ok_or(WorldError::UnknownEntity(id))?;
        let record = source.entities.remove(slot);

        self.block_mut(to)?.entities.push(record);
        self.locations.insert(id, to);
        if let Some(skeleton) = self.skeletons.get_mut(&id) {
            skeleton.position = to;
        }
        Ok(true)
    }

    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.locations.get(&id).copied()
    }

    pub fn skeleton(&self, id: EntityId) -> Option<&Skeleton> {
        self.skeletons.get(&id)
    }

    pub fn skeleton_mut(&mut self, id: EntityId) -> Option<&mut Skeleton> {
        self.skeletons.get_mut(&id)
    }

    pub fn skeletons(&self) -> impl Iterator<Item = &Skeleton> {
        self.skeletons.values()
    }

    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    /// Wire record for an actor, including the block it stands on.
    pub fn skeleton_info(&self, id: EntityId) -> Option<SkeletonInfo> {
        let skeleton = self.skeletons.get(&id)?;
        let block = self.block(skeleton.position).ok().map(Block::id);
        Some(skeleton.to_info(block))
    }

    /// Full snapshot of the grid, row-major.
    pub fn snapshot(&self) -> MapRecord {
        let map_blocks = self
            .blocks
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| row.iter().map(Block::to_record).collect())
            .collect();

        MapRecord {
            id: self.id,
            width: self.width,
            height: self.height,
            map_blocks,
        }
    }
}
