use super::LateReverb;
use crate::engine::{GameObjectId, RoomId};
use crate::geometry::{Aabb, VolumeShape};
use crate::math::Vec3;
use std::collections::{BTreeMap, BTreeSet};

/// The index's own copy of a room, taken when the room was last (re)indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRoom {
    pub id: RoomId,
    pub shape: VolumeShape,
    pub bounds: Aabb,
    pub volume: f32,
    pub reverb: Option<LateReverb>,
    pub transmission_loss: f32,
    pub spatial_audio: bool,
}

impl IndexedRoom {
    pub fn new(
        id: RoomId,
        shape: VolumeShape,
        reverb: Option<LateReverb>,
        transmission_loss: f32,
        spatial_audio: bool,
    ) -> Self {
        Self {
            id,
            bounds: shape.bounds(),
            volume: shape.volume(),
            shape,
            reverb,
            transmission_loss,
            spatial_audio,
        }
    }

    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        self.bounds.contains(point, epsilon) && self.shape.contains(point, epsilon)
    }
}

/// Registry of the rooms of a world and of the game objects inside them.
///
/// Mutated and queried from the simulation thread only. Every change bumps
/// [`revision`](Self::revision), which emitters compare against to notice
/// that their room may have changed even though they did not move.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: BTreeMap<RoomId, IndexedRoom>,
    occupancy: BTreeMap<RoomId, BTreeSet<GameObjectId>>,
    revision: u64,
    portals_dirty: bool,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a room, or replaces its record if it changed.
    ///
    /// Indexing a room with an identical record is a no-op. Returns whether
    /// the index changed.
    pub fn index_room(&mut self, room: IndexedRoom) -> bool {
        if self.rooms.get(&room.id) == Some(&room) {
            return false;
        }
        log::debug!("Indexing {}", room.id);
        self.rooms.insert(room.id, room);
        self.revision += 1;
        true
    }

    /// Refreshes a room whose shape, transform or reverb changed.
    pub fn reindex_room(&mut self, room: IndexedRoom) -> bool {
        if !self.rooms.contains_key(&room.id) {
            log::debug!("Reindexing {} which was not indexed", room.id);
        }
        self.index_room(room)
    }

    /// Removes a room and forgets who was inside it.
    pub fn unindex_room(&mut self, id: RoomId) -> Option<IndexedRoom> {
        let removed = self.rooms.remove(&id)?;
        self.occupancy.remove(&id);
        self.revision += 1;
        log::debug!("Unindexed {}", id);
        Some(removed)
    }

    pub fn get(&self, id: RoomId) -> Option<&IndexedRoom> {
        self.rooms.get(&id)
    }

    pub fn contains(&self, id: RoomId) -> bool {
        self.rooms.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedRoom> {
        self.rooms.values()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_spatial_audio_rooms(&self) -> bool {
        self.rooms.values().any(|r| r.spatial_audio)
    }

    /// Rooms containing `point`, smallest volume first.
    ///
    /// Rooms of equal volume are ordered by id.
    pub fn rooms_containing(&self, point: Vec3, epsilon: f32) -> Vec<&IndexedRoom> {
        let mut found: Vec<&IndexedRoom> = self
            .rooms
            .values()
            .filter(|room| room.contains(point, epsilon))
            .collect();
        found.sort_by(|a, b| a.volume.total_cmp(&b.volume).then(a.id.cmp(&b.id)));
        found
    }

    /// Flags every portal for re-evaluation of the rooms it connects.
    pub fn notify_portals_need_update(&mut self) {
        self.portals_dirty = true;
    }

    /// Returns and clears the portal re-evaluation flag.
    pub fn take_portals_dirty(&mut self) -> bool {
        std::mem::take(&mut self.portals_dirty)
    }

    /// Records the rooms `object` is currently inside, replacing earlier records.
    pub fn set_occupancy(&mut self, object: GameObjectId, rooms: &[RoomId]) {
        self.remove_occupant(object);
        for room in rooms {
            if self.rooms.contains_key(room) {
                self.occupancy.entry(*room).or_default().insert(object);
            }
        }
    }

    pub fn remove_occupant(&mut self, object: GameObjectId) {
        self.occupancy.retain(|_, occupants| {
            occupants.remove(&object);
            !occupants.is_empty()
        });
    }

    /// Game objects inside `room`, as of their last tick
    pub fn occupants(&self, room: RoomId) -> impl Iterator<Item = GameObjectId> + '_ {
        self.occupancy.get(&room).into_iter().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AuxBusId;

    fn cube(id: u64, min: f32, max: f32) -> IndexedRoom {
        IndexedRoom::new(
            RoomId(id),
            VolumeShape::aabb(Vec3::splat(min), Vec3::splat(max)),
            None,
            1.0,
            true,
        )
    }

    #[test]
    fn nested_rooms_smallest_first() {
        let mut index = RoomIndex::new();
        index.index_room(cube(1, 0.0, 100.0));
        index.index_room(cube(2, 10.0, 20.0));
        index.index_room(cube(3, 50.0, 60.0));

        let ids: Vec<_> = index
            .rooms_containing(Vec3::splat(15.0), 0.01)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![RoomId(2), RoomId(1)]);
        assert!(index.rooms_containing(Vec3::splat(200.0), 0.01).is_empty());
    }

    #[test]
    fn indexing_twice_is_idempotent() {
        let mut index = RoomIndex::new();
        assert!(index.index_room(cube(1, 0.0, 10.0)));
        let revision = index.revision();

        assert!(!index.index_room(cube(1, 0.0, 10.0)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.revision(), revision);
        assert_eq!(index.rooms_containing(Vec3::splat(5.0), 0.01).len(), 1);
    }

    #[test]
    fn reindex_reflects_latest_shape() {
        let mut index = RoomIndex::new();
        index.index_room(cube(1, 0.0, 10.0));
        assert!(index.reindex_room(cube(1, 20.0, 30.0)));

        assert!(index.rooms_containing(Vec3::splat(5.0), 0.01).is_empty());
        assert_eq!(index.rooms_containing(Vec3::splat(25.0), 0.01).len(), 1);
    }

    #[test]
    fn reverb_change_is_a_change() {
        let mut index = RoomIndex::new();
        index.index_room(cube(1, 0.0, 10.0));
        let mut with_reverb = cube(1, 0.0, 10.0);
        with_reverb.reverb = Some(LateReverb::new(AuxBusId(3)));
        assert!(index.index_room(with_reverb));
    }

    #[test]
    fn unindex_drops_occupants() {
        let mut index = RoomIndex::new();
        index.index_room(cube(1, 0.0, 10.0));
        index.index_room(cube(2, 0.0, 5.0));
        index.set_occupancy(GameObjectId(7), &[RoomId(2), RoomId(1)]);
        assert_eq!(index.occupants(RoomId(1)).collect::<Vec<_>>(), vec![GameObjectId(7)]);

        index.unindex_room(RoomId(1));
        assert_eq!(index.occupants(RoomId(1)).count(), 0);
        assert_eq!(index.occupants(RoomId(2)).count(), 1);

        index.remove_occupant(GameObjectId(7));
        assert_eq!(index.occupants(RoomId(2)).count(), 0);
    }

    #[test]
    fn portal_flag_is_taken_once() {
        let mut index = RoomIndex::new();
        assert!(!index.take_portals_dirty());
        index.notify_portals_need_update();
        assert!(index.take_portals_dirty());
        assert!(!index.take_portals_dirty());
    }
}
