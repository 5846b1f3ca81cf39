//! Containment queries against room and portal volumes.
//!
//! Every shape answers the same three questions: does it contain a point
//! (inclusively, with a small tolerance), how far is a point from its surface,
//! and how large is it. Room ordering in the [`RoomIndex`](crate::room::RoomIndex)
//! relies on the volume, so all shapes report an exact volume.

use crate::error::{Result, RoomverbError};
use crate::math::{Quat, Vec3};
use std::cmp::Ordering;

/// Tolerance used when deciding whether a brush vertex lies on a plane
const PLANE_TOLERANCE: f32 = 1e-3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self::new(center - half_extents, center + half_extents)
    }

    /// Smallest box around all `points`, or `None` if there are none
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        point.cmpge(self.min - Vec3::splat(epsilon)).all()
            && point.cmple(self.max + Vec3::splat(epsilon)).all()
    }

    pub fn volume(&self) -> f32 {
        let size = self.max - self.min;
        size.x * size.y * size.z
    }
}

/// Half-space boundary. Points with `normal · p <= distance` are inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Outward unit normal
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Creates a plane, normalizing `normal`. Returns `None` for a zero normal.
    pub fn new(normal: Vec3, distance: f32) -> Option<Self> {
        let length = normal.length();
        if length <= f32::EPSILON {
            return None;
        }
        Some(Self {
            normal: normal / length,
            distance: distance / length,
        })
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Option<Self> {
        let normal = normal.try_normalize()?;
        Some(Self {
            normal,
            distance: normal.dot(point),
        })
    }

    /// Positive outside, negative inside
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Convex volume bounded by planes, as produced by level-editor brushes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexBrush {
    planes: Vec<Plane>,
    vertices: Vec<Vec3>,
    bounds: Aabb,
    volume: f32,
}

impl ConvexBrush {
    /// Builds a brush from its bounding planes.
    ///
    /// Fails if the planes do not enclose a finite, non-degenerate volume.
    pub fn from_planes(planes: Vec<Plane>) -> Result<Self> {
        if planes.len() < 4 {
            return Err(RoomverbError::Configuration(format!(
                "Convex brush needs at least 4 planes, got {}",
                planes.len()
            )));
        }

        let vertices = brush_vertices(&planes);
        if vertices.len() < 4 {
            return Err(RoomverbError::Configuration(
                "Convex brush planes do not enclose a volume".into(),
            ));
        }

        let interior = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
        let mut volume = 0.0;
        let mut closure = Vec3::ZERO;
        let mut total_area = 0.0;
        for plane in &planes {
            let area = face_area(plane, &vertices);
            if area <= 0.0 {
                continue;
            }
            closure += plane.normal * area;
            total_area += area;
            volume += area * -plane.signed_distance(interior) / 3.0;
        }

        // A closed surface has area-weighted normals summing to zero.
        if total_area <= 0.0 || closure.length() > 1e-3 * total_area || volume <= 0.0 {
            return Err(RoomverbError::Configuration(
                "Convex brush is unbounded or degenerate".into(),
            ));
        }

        let bounds = Aabb::from_points(vertices.iter().copied())
            .ok_or_else(|| RoomverbError::Configuration("Convex brush has no vertices".into()))?;

        Ok(Self {
            planes,
            vertices,
            bounds,
            volume,
        })
    }

    /// Six-plane brush equivalent to an axis-aligned box
    pub fn from_box(center: Vec3, half_extents: Vec3) -> Result<Self> {
        let h = half_extents.abs();
        let planes = [Vec3::X, Vec3::Y, Vec3::Z]
            .into_iter()
            .zip([h.x, h.y, h.z])
            .flat_map(|(axis, extent)| {
                [
                    Plane::from_point_normal(center + axis * extent, axis),
                    Plane::from_point_normal(center - axis * extent, -axis),
                ]
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| RoomverbError::Configuration("Invalid box axis".into()))?;
        Self::from_planes(planes)
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Negative inside. Exact inside the brush and in front of faces;
    /// near edges and corners outside it underestimates the true distance.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.planes
            .iter()
            .map(|plane| plane.signed_distance(point))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

fn brush_vertices(planes: &[Plane]) -> Vec<Vec3> {
    let mut vertices: Vec<Vec3> = Vec::new();
    for i in 0..planes.len() {
        for j in i + 1..planes.len() {
            for k in j + 1..planes.len() {
                let (a, b, c) = (planes[i], planes[j], planes[k]);
                let bc = b.normal.cross(c.normal);
                let det = a.normal.dot(bc);
                if det.abs() < 1e-6 {
                    continue;
                }
                let point = (bc * a.distance
                    + c.normal.cross(a.normal) * b.distance
                    + a.normal.cross(b.normal) * c.distance)
                    / det;
                let inside = planes
                    .iter()
                    .all(|plane| plane.signed_distance(point) <= PLANE_TOLERANCE);
                if inside && !vertices.iter().any(|v| v.distance(point) <= PLANE_TOLERANCE) {
                    vertices.push(point);
                }
            }
        }
    }
    vertices
}

/// Area of the brush face lying on `plane`, zero if the plane only touches
/// the brush along an edge or not at all.
fn face_area(plane: &Plane, vertices: &[Vec3]) -> f32 {
    let face: Vec<Vec3> = vertices
        .iter()
        .copied()
        .filter(|v| plane.signed_distance(*v).abs() <= PLANE_TOLERANCE)
        .collect();
    if face.len() < 3 {
        return 0.0;
    }

    let centroid = face.iter().copied().sum::<Vec3>() / face.len() as f32;
    let Some(u) = (face[0] - centroid).try_normalize() else {
        return 0.0;
    };
    let w = plane.normal.cross(u);
    let angle = |v: &Vec3| {
        let offset = *v - centroid;
        offset.dot(w).atan2(offset.dot(u))
    };
    let mut ordered = face.clone();
    ordered.sort_by(|a, b| angle(a).partial_cmp(&angle(b)).unwrap_or(Ordering::Equal));

    let mut twice_area = Vec3::ZERO;
    for (index, vertex) in ordered.iter().enumerate() {
        let next = ordered[(index + 1) % ordered.len()];
        twice_area += (*vertex - centroid).cross(next - centroid);
    }
    (twice_area.dot(plane.normal) * 0.5).abs()
}

/// Bounding shape of a room or portal volume
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeShape {
    /// Oriented box
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Brush(ConvexBrush),
}

impl VolumeShape {
    pub fn aabb(min: Vec3, max: Vec3) -> Self {
        let aabb = Aabb::new(min, max);
        Self::Box {
            center: aabb.center(),
            half_extents: aabb.half_extents(),
            rotation: Quat::IDENTITY,
        }
    }

    pub fn oriented_box(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self::Box {
            center,
            half_extents: half_extents.abs(),
            rotation,
        }
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere {
            center,
            radius: radius.abs(),
        }
    }

    /// Signed distance from `point` to the surface, negative inside
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        match self {
            Self::Box {
                center,
                half_extents,
                rotation,
            } => {
                let local = rotation.inverse() * (point - *center);
                let q = local.abs() - *half_extents;
                if q.max_element() <= 0.0 {
                    q.max_element()
                } else {
                    q.max(Vec3::ZERO).length()
                }
            }
            Self::Sphere { center, radius } => point.distance(*center) - radius,
            Self::Brush(brush) => brush.signed_distance(point),
        }
    }

    /// Inclusive containment test. Points up to `epsilon` outside the surface count as inside.
    pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
        self.signed_distance(point) <= epsilon
    }

    /// Unsigned distance from `point` to the surface
    pub fn distance_to_surface(&self, point: Vec3) -> f32 {
        self.signed_distance(point).abs()
    }

    pub fn volume(&self) -> f32 {
        match self {
            Self::Box { half_extents, .. } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Self::Sphere { radius, .. } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            Self::Brush(brush) => brush.volume,
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Self::Box {
                center,
                half_extents,
                rotation,
            } => {
                let h = *half_extents;
                let corners = [-1.0f32, 1.0].into_iter().flat_map(|x| {
                    [-1.0f32, 1.0].into_iter().flat_map(move |y| {
                        [-1.0f32, 1.0]
                            .into_iter()
                            .map(move |z| Vec3::new(x * h.x, y * h.y, z * h.z))
                    })
                });
                Aabb::from_points(corners.map(|corner| *center + *rotation * corner))
                    .unwrap_or_else(|| Aabb::new(*center, *center))
            }
            Self::Sphere { center, radius } => {
                Aabb::from_center_half_extents(*center, Vec3::splat(*radius))
            }
            Self::Brush(brush) => brush.bounds,
        }
    }

    /// Up and front vectors of the volume, as reported to the sound engine
    pub fn up_and_front(&self) -> (Vec3, Vec3) {
        match self {
            Self::Box { rotation, .. } => (*rotation * Vec3::Y, *rotation * -Vec3::Z),
            _ => (Vec3::Y, -Vec3::Z),
        }
    }
}
