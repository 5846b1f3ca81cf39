mod emitter_config;
mod world_desc;

pub use emitter_config::{EmitterConfig, OcclusionChannel};
pub use world_desc::{CollisionChannel, RoomverbWorldDesc, SharedRoomObstruction};
