//! # Roomverb
//!
//! Room membership, reverb send fading and obstruction bookkeeping for games
//! that drive an external spatial audio engine.
//!
//! Roomverb does not mix or render anything. It decides which rooms every
//! game object is in, which reverb buses it should send to and at what level,
//! and how obstructed each emitter is from each listener, and it tells the
//! sound engine only when one of those things changed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use roomverb::*;
//! use roomverb::engine::{AudioContext, AuxBusId, ChannelSoundEngine, GameObjectId, RoomId};
//! use roomverb::geometry::VolumeShape;
//! use roomverb::room::{AttachParent, LateReverb, Room};
//! use roomverb::scene::{ActorHandle, ActorId, RayHit, RayTracer, TraceQuery};
//! use std::sync::Arc;
//!
//! struct OpenField;
//!
//! impl RayTracer for OpenField {
//!     fn cast_ray(&self, _query: &TraceQuery) -> RayHit {
//!         RayHit::miss()
//!     }
//! }
//!
//! // The receiver end is drained by whoever owns the real engine
//! let (engine, commands) = ChannelSoundEngine::new();
//! let mut world = RoomverbWorld::new(
//!     RoomverbWorldDesc::default(),
//!     AudioContext::new(Arc::new(engine)),
//!     Box::new(OpenField),
//! )?;
//!
//! // A room with its own late reverb
//! let hall = ActorHandle::new(ActorId(1), "Hall");
//! world.add_room(
//!     Room::new(RoomId(1000), "Hall", VolumeShape::sphere(Vec3::ZERO, 20.0))
//!         .reverb(LateReverb::new(AuxBusId(10)).send_level(0.8)),
//!     AttachParent::Primitive(hall.downgrade()),
//!     None,
//! )?;
//!
//! // A listener and an emitter
//! world.register_game_object(GameObjectId(1), "Camera", Pose::identity(), EmitterConfig::listener())?;
//! world.add_default_listener(GameObjectId(1))?;
//! world.register_game_object(
//!     GameObjectId(2),
//!     "Fireplace",
//!     Pose::from_position(Vec3::new(3.0, 0.0, 0.0)),
//!     EmitterConfig::emitter(),
//! )?;
//!
//! world.begin_play();
//! loop {
//!     world.tick(1.0 / 60.0, SimulationMode::Play);
//!     for event in world.poll_events() {
//!         if let RoomverbEvent::RoomEntered { game_object, room } = event {
//!             println!("{} entered {}", game_object, room);
//!         }
//!     }
//!     # break;
//! }
//! # drop(commands);
//! # Ok::<(), RoomverbError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`RoomverbWorld`]**: Owns rooms, portals and game objects; ticked once per frame
//! - **[`EmitterGameObject`]**: Per-object room membership, reverb sends and obstruction
//! - **[`RoomIndex`](room::RoomIndex)**: Spatial lookup of the rooms containing a point
//! - **[`ReverbSendTable`](reverb::ReverbSendTable)**: Fading, budgeted reverb sends of one emitter
//! - **[`ObstructionOcclusionService`](obstruction::ObstructionOcclusionService)**: Rate-limited line-of-sight traces
//! - **[`SoundEngine`](engine::SoundEngine)**: The calls Roomverb issues to the external engine
//! - **[`RayTracer`](scene::RayTracer)**: Trait the host implements for line traces
//!
//! ## Threading
//!
//! The world lives on the simulation thread and is only touched from there.
//! Engine calls never block: [`ChannelSoundEngine`](engine::ChannelSoundEngine)
//! queues them on a channel for the thread that owns the engine. Listener sets
//! are the one piece of state shared with other threads and are guarded by
//! a lock that is never held across an engine call.

pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod listener;
pub mod math;
pub mod obstruction;
pub mod reverb;
pub mod room;
pub mod scene;
pub mod world;

pub use config::{EmitterConfig, RoomverbWorldDesc};
pub use emitter::EmitterGameObject;
pub use error::{EngineFailure, RoomverbError};
pub use events::RoomverbEvent;
pub use math::{Pose, Quat, Vec3};
pub use world::{RoomverbWorld, SimulationMode};
