use crate::config::world_desc::CollisionChannel;
use crate::scene::ActorRef;

/// Which trace channel an emitter uses for obstruction queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OcclusionChannel {
    /// Take the channel from [`RoomverbWorldDesc`](crate::RoomverbWorldDesc)
    #[default]
    UseWorldDefault,
    Explicit(CollisionChannel),
}

impl OcclusionChannel {
    pub fn resolve(self, world_default: CollisionChannel) -> CollisionChannel {
        match self {
            Self::UseWorldDefault => world_default,
            Self::Explicit(channel) => channel,
        }
    }
}

/// Per-object settings for a game object registered with the world
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Seconds between line-of-sight checks against each listener. 0 disables them.
    pub occlusion_refresh_interval: f32,
    pub occlusion_channel: OcclusionChannel,
    /// Whether reverb volumes and rooms feed aux sends on this object
    pub use_reverb_volumes: bool,
    /// Whether this object is a listener other emitters can be heard by
    pub is_listener: bool,
    /// Follow the world's default listener set instead of an explicit one
    pub use_default_listeners: bool,
    /// Actor the object is attached to; ignored by its own obstruction traces
    pub owner: Option<ActorRef>,
    /// Stop everything playing on the object once `owner` is destroyed
    pub stop_when_owner_destroyed: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            occlusion_refresh_interval: 0.0,
            occlusion_channel: OcclusionChannel::UseWorldDefault,
            use_reverb_volumes: true,
            is_listener: false,
            use_default_listeners: true,
            owner: None,
            stop_when_owner_destroyed: true,
        }
    }
}

impl EmitterConfig {
    /// Configuration for a plain sound emitter
    pub fn emitter() -> Self {
        Self::default()
    }

    /// Configuration for a listener. Listeners do not receive reverb sends.
    pub fn listener() -> Self {
        Self {
            is_listener: true,
            use_reverb_volumes: false,
            ..Self::default()
        }
    }

    pub fn occlusion_refresh_interval(mut self, seconds: f32) -> Self {
        self.occlusion_refresh_interval = seconds;
        self
    }

    pub fn occlusion_channel(mut self, channel: CollisionChannel) -> Self {
        self.occlusion_channel = OcclusionChannel::Explicit(channel);
        self
    }

    pub fn use_reverb_volumes(mut self, enable: bool) -> Self {
        self.use_reverb_volumes = enable;
        self
    }

    pub fn owner(mut self, owner: ActorRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn stop_when_owner_destroyed(mut self, stop: bool) -> Self {
        self.stop_when_owner_destroyed = stop;
        self
    }
}
