//! Event types for Roomverb

use crate::engine::{AuxSendValue, GameObjectId, PlayingId, RoomId};

#[derive(Debug, Clone, PartialEq)]
pub enum RoomverbEvent {
    RoomEntered {
        game_object: GameObjectId,
        room: RoomId,
    },
    RoomExited {
        game_object: GameObjectId,
        room: RoomId,
    },
    ReverbSendsChanged {
        game_object: GameObjectId,
        sends: Vec<AuxSendValue>,
    },
    ObstructionChanged {
        game_object: GameObjectId,
        listener: GameObjectId,
        obstruction: f32,
        occlusion: f32,
    },
    EventFinished {
        game_object: GameObjectId,
        playing_id: PlayingId,
    },
    RoomDisabled {
        room: RoomId,
        reason: String,
    },
    EngineUnavailable,
}

impl RoomverbEvent {
    pub fn game_object(&self) -> Option<GameObjectId> {
        match self {
            Self::RoomEntered { game_object, .. }
            | Self::RoomExited { game_object, .. }
            | Self::ReverbSendsChanged { game_object, .. }
            | Self::ObstructionChanged { game_object, .. }
            | Self::EventFinished { game_object, .. } => Some(*game_object),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::RoomDisabled { .. } | Self::EngineUnavailable)
    }

    pub fn is_room_event(&self) -> bool {
        matches!(
            self,
            Self::RoomEntered { .. } | Self::RoomExited { .. } | Self::RoomDisabled { .. }
        )
    }
}
