use super::RoomIndex;
use crate::engine::{self, AudioContext, PortalId, PortalParams, RoomId};
use crate::math::{Pose, Vec3};

/// An acoustic opening between two rooms.
///
/// The portal is a box around `pose`. Its front room is the room found just
/// past the box on its local +X side, its back room the one on the -X side.
#[derive(Debug, Clone)]
pub struct Portal {
    id: PortalId,
    pose: Pose,
    half_extents: Vec3,
    enabled: bool,
    front_room: Option<RoomId>,
    back_room: Option<RoomId>,
    needs_refresh: bool,
    last_sent: Option<PortalParams>,
}

impl Portal {
    pub fn new(id: PortalId, pose: Pose, half_extents: Vec3) -> Self {
        Self {
            id,
            pose,
            half_extents: half_extents.abs(),
            enabled: true,
            front_room: None,
            back_room: None,
            needs_refresh: true,
            last_sent: None,
        }
    }

    pub fn id(&self) -> PortalId {
        self.id
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn front_room(&self) -> Option<RoomId> {
        self.front_room
    }

    pub fn back_room(&self) -> Option<RoomId> {
        self.back_room
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.needs_refresh = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.needs_refresh = true;
    }

    pub fn params(&self) -> PortalParams {
        PortalParams {
            pose: self.pose,
            half_extents: self.half_extents,
            enabled: self.enabled,
            front_room: self.front_room,
            back_room: self.back_room,
        }
    }

    /// Finds the rooms on either side of the portal.
    ///
    /// Returns whether the connected pair changed.
    pub fn refresh_rooms(&mut self, index: &RoomIndex, epsilon: f32) -> bool {
        self.needs_refresh = false;
        let axis = self.pose.right();
        let reach = self.half_extents.x + epsilon.max(0.01) * 2.0;
        let front_point = self.pose.position + axis * reach;
        let back_point = self.pose.position - axis * reach;

        let spatial_rooms = |point: Vec3| -> Vec<RoomId> {
            index
                .rooms_containing(point, epsilon)
                .into_iter()
                .filter(|r| r.spatial_audio)
                .map(|r| r.id)
                .collect()
        };
        let front_candidates = spatial_rooms(front_point);
        let back_candidates = spatial_rooms(back_point);

        let front = front_candidates.first().copied();
        let back = back_candidates.iter().copied().find(|id| Some(*id) != front);

        let changed = front != self.front_room || back != self.back_room;
        if changed {
            log::debug!(
                "{} now connects {:?} (front) and {:?} (back)",
                self.id,
                front,
                back
            );
        }
        self.front_room = front;
        self.back_room = back;
        changed
    }

    /// Tells the engine about the portal if anything changed since the last
    /// call that went through.
    pub fn sync(&mut self, audio: &AudioContext) {
        let params = self.params();
        if self.last_sent.as_ref() == Some(&params) {
            return;
        }
        let Some(engine) = audio.engine() else {
            return;
        };
        if engine::succeeded(engine.set_portal(self.id, &params), "SetPortal").is_some() {
            self.last_sent = Some(params);
        }
    }

    /// Withdraws the portal from the engine.
    pub fn remove(&mut self, audio: &AudioContext) {
        if self.last_sent.take().is_none() {
            return;
        }
        if let Some(engine) = audio.engine() {
            engine::succeeded(engine.remove_portal(self.id), "RemovePortal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChannelSoundEngine, EngineCommand};
    use crate::geometry::VolumeShape;
    use crate::room::IndexedRoom;
    use std::sync::Arc;

    fn room(id: u64, min: Vec3, max: Vec3) -> IndexedRoom {
        IndexedRoom::new(RoomId(id), VolumeShape::aabb(min, max), None, 1.0, true)
    }

    #[test]
    fn doorway_connects_both_sides() {
        let mut index = RoomIndex::new();
        index.index_room(room(1, Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 5.0, 10.0)));
        index.index_room(room(2, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 10.0)));

        let mut portal = Portal::new(
            PortalId(1),
            Pose::from_position(Vec3::new(0.0, 2.0, 5.0)),
            Vec3::new(0.5, 2.0, 1.0),
        );
        assert!(portal.refresh_rooms(&index, 0.01));
        assert_eq!(portal.front_room(), Some(RoomId(1)));
        assert_eq!(portal.back_room(), Some(RoomId(2)));
        assert!(!portal.refresh_rooms(&index, 0.01));
    }

    #[test]
    fn engine_is_told_only_about_changes() {
        let (engine, commands) = ChannelSoundEngine::new();
        let audio = AudioContext::new(Arc::new(engine));
        let mut portal = Portal::new(PortalId(2), Pose::identity(), Vec3::ONE);

        portal.sync(&audio);
        portal.sync(&audio);
        portal.set_enabled(false);
        portal.sync(&audio);
        portal.remove(&audio);
        portal.remove(&audio);

        let sent: Vec<_> = commands.try_iter().collect();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2], EngineCommand::RemovePortal(PortalId(2)));
    }
}
