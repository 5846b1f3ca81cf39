use crate::engine::{GeometrySetId, SoundEngine};
use crate::error::EngineResult;

/// Acoustic geometry backing a room.
///
/// A room either uses a full geometry set (possibly one it created itself
/// because its actor had none), or a surface reflector set. A reflector set
/// with reflections enabled manages its own registration; the room only sends
/// it when reflections are off and the set is needed purely for the room
/// shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomGeometry {
    GeometrySet {
        id: GeometrySetId,
        added_by_room: bool,
        geometry_sent: bool,
        instance_sent: bool,
    },
    SurfaceReflectorSet {
        id: GeometrySetId,
        reflectors_enabled: bool,
        geometry_sent: bool,
        instance_sent: bool,
    },
}

impl RoomGeometry {
    pub fn geometry_set(id: GeometrySetId) -> Self {
        Self::GeometrySet {
            id,
            added_by_room: false,
            geometry_sent: false,
            instance_sent: false,
        }
    }

    /// Geometry set created by the room for an actor that had none
    pub fn created_by_room(id: GeometrySetId) -> Self {
        Self::GeometrySet {
            id,
            added_by_room: true,
            geometry_sent: false,
            instance_sent: false,
        }
    }

    pub fn surface_reflector_set(id: GeometrySetId, reflectors_enabled: bool) -> Self {
        Self::SurfaceReflectorSet {
            id,
            reflectors_enabled,
            geometry_sent: false,
            instance_sent: false,
        }
    }

    pub fn id(&self) -> GeometrySetId {
        match self {
            Self::GeometrySet { id, .. } | Self::SurfaceReflectorSet { id, .. } => *id,
        }
    }

    pub fn added_by_room(&self) -> bool {
        matches!(
            self,
            Self::GeometrySet {
                added_by_room: true,
                ..
            }
        )
    }

    /// Whether the room is responsible for registering this geometry
    fn managed_by_room(&self) -> bool {
        match self {
            Self::GeometrySet { .. } => true,
            Self::SurfaceReflectorSet {
                reflectors_enabled, ..
            } => !reflectors_enabled,
        }
    }

    pub fn is_sent(&self) -> bool {
        match self {
            Self::GeometrySet {
                geometry_sent,
                instance_sent,
                ..
            }
            | Self::SurfaceReflectorSet {
                geometry_sent,
                instance_sent,
                ..
            } => *geometry_sent && *instance_sent,
        }
    }

    /// Sends whatever part of the geometry the engine does not have yet.
    pub fn send(&mut self, engine: &dyn SoundEngine) -> EngineResult {
        if !self.managed_by_room() {
            return Ok(());
        }
        let id = self.id();
        let (geometry_sent, instance_sent) = self.sent_flags();
        if !*geometry_sent {
            engine.set_geometry(id)?;
            *geometry_sent = true;
        }
        if !*instance_sent {
            engine.set_geometry_instance(id)?;
            *instance_sent = true;
        }
        Ok(())
    }

    /// Removes the geometry from the engine if the room owns its registration.
    ///
    /// Geometry sets the room did not create belong to another component and
    /// stay registered.
    pub fn remove(&mut self, engine: &dyn SoundEngine) -> EngineResult {
        let owned = match self {
            Self::GeometrySet { added_by_room, .. } => *added_by_room,
            Self::SurfaceReflectorSet {
                reflectors_enabled, ..
            } => !*reflectors_enabled,
        };
        if !owned {
            return Ok(());
        }
        let id = self.id();
        let (geometry_sent, instance_sent) = self.sent_flags();
        if *instance_sent {
            engine.remove_geometry_instance(id)?;
            *instance_sent = false;
        }
        if *geometry_sent {
            engine.remove_geometry(id)?;
            *geometry_sent = false;
        }
        Ok(())
    }

    fn sent_flags(&mut self) -> (&mut bool, &mut bool) {
        match self {
            Self::GeometrySet {
                geometry_sent,
                instance_sent,
                ..
            }
            | Self::SurfaceReflectorSet {
                geometry_sent,
                instance_sent,
                ..
            } => (geometry_sent, instance_sent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChannelSoundEngine, EngineCommand};

    #[test]
    fn geometry_set_is_sent_once() {
        let (engine, commands) = ChannelSoundEngine::new();
        let mut geometry = RoomGeometry::created_by_room(GeometrySetId(5));
        assert!(!geometry.is_sent());

        geometry.send(&engine).unwrap();
        geometry.send(&engine).unwrap();
        assert!(geometry.is_sent());
        assert_eq!(
            commands.try_iter().collect::<Vec<_>>(),
            vec![
                EngineCommand::SetGeometry(GeometrySetId(5)),
                EngineCommand::SetGeometryInstance(GeometrySetId(5)),
            ]
        );
    }

    #[test]
    fn foreign_geometry_set_is_not_removed() {
        let (engine, commands) = ChannelSoundEngine::new();
        let mut geometry = RoomGeometry::geometry_set(GeometrySetId(5));
        geometry.send(&engine).unwrap();
        commands.try_iter().count();

        geometry.remove(&engine).unwrap();
        assert!(geometry.is_sent());
        assert_eq!(commands.try_iter().count(), 0);
    }

    #[test]
    fn reflector_set_with_reflections_is_left_alone() {
        let (engine, commands) = ChannelSoundEngine::new();
        let mut reflectors = RoomGeometry::surface_reflector_set(GeometrySetId(9), true);
        reflectors.send(&engine).unwrap();
        assert_eq!(commands.try_iter().count(), 0);

        let mut shape_only = RoomGeometry::surface_reflector_set(GeometrySetId(9), false);
        shape_only.send(&engine).unwrap();
        shape_only.remove(&engine).unwrap();
        assert!(!shape_only.is_sent());
        assert_eq!(commands.try_iter().count(), 4);
    }
}
