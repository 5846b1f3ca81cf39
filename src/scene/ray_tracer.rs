//! Line-of-sight tracing against host geometry.
//!
//! Roomverb never owns collision geometry. Obstruction queries are answered by
//! the host through the [`RayTracer`] trait.

use crate::config::CollisionChannel;
use crate::math::Vec3;
use crate::scene::ActorId;

/// A single line trace request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceQuery {
    /// Ray starting position in world space
    pub origin: Vec3,
    /// Normalized ray direction
    pub direction: Vec3,
    /// Maximum distance to test
    pub max_distance: f32,
    /// Collision channel the trace runs against
    pub channel: CollisionChannel,
    /// Actor whose own geometry must not block the trace
    pub ignored_actor: Option<ActorId>,
}

impl TraceQuery {
    /// Builds a query running from `from` to `to`. Returns `None` when the
    /// two points coincide.
    pub fn between(
        from: Vec3,
        to: Vec3,
        channel: CollisionChannel,
        ignored_actor: Option<ActorId>,
    ) -> Option<Self> {
        let offset = to - from;
        let max_distance = offset.length();
        let direction = offset.try_normalize()?;
        Some(Self {
            origin: from,
            direction,
            max_distance,
            channel,
            ignored_actor,
        })
    }
}

/// Result of a ray intersection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Whether the ray hit any geometry
    pub hit: bool,

    /// Distance from ray origin to hit point
    ///
    /// Only meaningful if `hit` is true
    pub distance: f32,

    /// Surface normal at the hit point (normalized)
    ///
    /// Only meaningful if `hit` is true
    pub normal: Vec3,

    /// Actor owning the hit geometry, if the host knows it
    pub actor: Option<ActorId>,

    /// How much the hit surface blocks sound, in [0, 1]
    ///
    /// Hosts map physical materials to this; unknown materials block fully.
    pub occlusion: f32,
}

impl RayHit {
    /// Creates a miss result (no hit)
    pub fn miss() -> Self {
        Self {
            hit: false,
            distance: 0.0,
            normal: Vec3::ZERO,
            actor: None,
            occlusion: 0.0,
        }
    }

    /// Creates a hit result
    pub fn new(distance: f32, normal: Vec3) -> Self {
        Self {
            hit: true,
            distance,
            normal,
            actor: None,
            occlusion: 1.0,
        }
    }

    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_occlusion(mut self, occlusion: f32) -> Self {
        self.occlusion = occlusion.clamp(0.0, 1.0);
        self
    }

    /// Whether this hit blocks the segment the query describes.
    ///
    /// Hits on the ignored actor and hits at or beyond the segment end
    /// (within `tolerance`) do not block.
    pub fn blocks(&self, query: &TraceQuery, tolerance: f32) -> bool {
        if !self.hit {
            return false;
        }
        if self.actor.is_some() && self.actor == query.ignored_actor {
            return false;
        }
        self.distance < query.max_distance - tolerance
    }
}

impl Default for RayHit {
    fn default() -> Self {
        Self::miss()
    }
}

/// Trait for providing line traces to the obstruction service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a world can be moved to whichever
/// thread runs the simulation tick.
///
/// # Example
///
/// ```
/// use roomverb::scene::{RayHit, RayTracer, TraceQuery};
///
/// struct OpenField;
///
/// impl RayTracer for OpenField {
///     fn cast_ray(&self, _query: &TraceQuery) -> RayHit {
///         RayHit::miss()
///     }
/// }
/// ```
pub trait RayTracer: Send + Sync {
    /// Returns the closest hit along the query ray, or a miss.
    ///
    /// Traces should ignore geometry owned by `query.ignored_actor` when the
    /// host can filter it; the obstruction service also discards such hits
    /// when [`RayHit::actor`] is reported.
    fn cast_ray(&self, query: &TraceQuery) -> RayHit;

    /// Called once per tick before any obstruction traces (optional).
    fn begin_frame(&mut self) {}

    /// Called once per tick after all obstruction traces (optional).
    fn end_frame(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_hit_miss() {
        let miss = RayHit::miss();
        assert!(!miss.hit);
        assert_eq!(miss.distance, 0.0);
    }

    #[test]
    fn query_between_coincident_points_is_none() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(TraceQuery::between(p, p, CollisionChannel::Visibility, None).is_none());
    }

    #[test]
    fn hits_past_the_listener_do_not_block() {
        let query = TraceQuery::between(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            CollisionChannel::Visibility,
            None,
        )
        .unwrap();
        assert!(RayHit::new(5.0, -Vec3::X).blocks(&query, 0.01));
        assert!(!RayHit::new(10.0, -Vec3::X).blocks(&query, 0.01));
        assert!(!RayHit::miss().blocks(&query, 0.01));
    }

    #[test]
    fn hits_on_the_owner_do_not_block() {
        let owner = ActorId(7);
        let query = TraceQuery::between(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            CollisionChannel::Visibility,
            Some(owner),
        )
        .unwrap();
        assert!(!RayHit::new(0.5, -Vec3::X).with_actor(owner).blocks(&query, 0.01));
        assert!(RayHit::new(0.5, -Vec3::X).with_actor(ActorId(8)).blocks(&query, 0.01));
    }
}
