//! Collider shapes and their analytic queries

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Collision shape, positioned by its owner's center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere
    Sphere { radius: f32 },
    /// Axis-aligned box
    Cuboid { half_extents: Vec3 },
}

impl ColliderShape {
    /// Check the shape has a positive size
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Sphere { radius } => radius > 0.0,
            Self::Cuboid { half_extents } => half_extents.min_element() > 0.0,
        }
    }

    /// Same shape grown by `amount` in every direction
    pub fn inflated(&self, amount: f32) -> Self {
        match *self {
            Self::Sphere { radius } => Self::Sphere {
                radius: radius + amount,
            },
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents + Vec3::splat(amount),
            },
        }
    }

    /// Closest point on or inside the shape
    pub fn closest_point(&self, center: Vec3, point: Vec3) -> Vec3 {
        match *self {
            Self::Sphere { radius } => {
                let offset = point - center;
                if offset.length_squared() <= radius * radius {
                    point
                } else {
                    center + offset.normalize() * radius
                }
            }
            Self::Cuboid { half_extents } => {
                point.clamp(center - half_extents, center + half_extents)
            }
        }
    }

    /// Check whether a point lies inside the shape
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        match *self {
            Self::Sphere { radius } => (point - center).length_squared() < radius * radius,
            Self::Cuboid { half_extents } => {
                let d = (point - center).abs();
                d.x < half_extents.x && d.y < half_extents.y && d.z < half_extents.z
            }
        }
    }

    /// Check whether a sphere touches the shape
    pub fn overlaps_sphere(&self, center: Vec3, sphere_center: Vec3, radius: f32) -> bool {
        let closest = self.closest_point(center, sphere_center);
        (closest - sphere_center).length_squared() <= radius * radius
    }

    /// Ray query. `dir` must be normalized. A ray starting inside the shape
    /// does not hit it. Returns distance and surface normal.
    pub fn raycast(&self, center: Vec3, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        if self.contains(center, origin) {
            return None;
        }

        let hit = match *self {
            Self::Sphere { radius } => ray_sphere(origin, dir, center, radius).map(|t| {
                let normal = (origin + dir * t - center).normalize_or_zero();
                (t, normal)
            }),
            Self::Cuboid { half_extents } => {
                ray_aabb_with_normal(origin, dir, center - half_extents, center + half_extents)
            }
        };

        hit.filter(|(t, _)| *t <= max_distance)
    }

    /// Swept sphere query. A sphere already touching the shape at `origin`
    /// does not hit it. Returns distance, normal and contact point.
    pub fn sphere_cast(
        &self,
        center: Vec3,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
    ) -> Option<(f32, Vec3, Vec3)> {
        if self.overlaps_sphere(center, origin, radius) {
            return None;
        }

        // Cast a ray against the shape grown by the sphere radius
        let (t, normal) = self.inflated(radius).raycast(center, origin, dir, max_distance)?;
        let point = origin + dir * t - normal * radius;
        Some((t, normal, point))
    }
}

/// Ray-sphere intersection, nearest positive distance
fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = -b - sqrt_d;
    let t2 = -b + sqrt_d;
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Slab-method ray/box test with the face normal that was hit
fn ray_aabb_with_normal(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);

    let t1 = (min - origin) * inv;
    let t2 = (max - origin) * inv;
    let t_near = t1.min(t2);
    let t_far = t1.max(t2);

    let tmin = t_near.max_element();
    let tmax = t_far.min_element();
    if tmax < 0.0 || tmin > tmax || tmin.is_nan() {
        return None;
    }

    let t = tmin.max(0.0);
    // The entering axis is the one whose near distance is largest
    let normal = if tmin == t_near.x {
        Vec3::new(-dir.x.signum(), 0.0, 0.0)
    } else if tmin == t_near.y {
        Vec3::new(0.0, -dir.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, -dir.z.signum())
    };

    Some((t, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ray_hits_sphere() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let (t, n) = shape
            .raycast(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Z, 10.0)
            .expect("hit");
        assert_abs_diff_eq!(t, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(n.z, -1.0, epsilon = 1e-5);

        assert!(shape
            .raycast(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Z, 3.0)
            .is_none());
    }

    #[test]
    fn test_ray_hits_box_top() {
        let ground = ColliderShape::Cuboid {
            half_extents: Vec3::new(10.0, 0.5, 10.0),
        };
        let (t, n) = ground
            .raycast(Vec3::new(0.0, -0.5, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::NEG_Y, 5.0)
            .expect("hit");
        assert_abs_diff_eq!(t, 1.0, epsilon = 1e-5);
        assert_eq!(n, Vec3::Y);
    }

    #[test]
    fn test_ray_from_inside_is_ignored() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        assert!(shape.raycast(Vec3::ZERO, Vec3::ZERO, Vec3::X, 10.0).is_none());
    }

    #[test]
    fn test_sphere_overlap() {
        let shape = ColliderShape::Cuboid {
            half_extents: Vec3::splat(1.0),
        };
        assert!(shape.overlaps_sphere(Vec3::ZERO, Vec3::new(1.4, 0.0, 0.0), 0.5));
        assert!(!shape.overlaps_sphere(Vec3::ZERO, Vec3::new(1.6, 0.0, 0.0), 0.5));
    }

    #[test]
    fn test_sphere_cast() {
        let target = ColliderShape::Sphere { radius: 1.0 };
        let (t, n, p) = target
            .sphere_cast(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 0.5, Vec3::Z, 20.0)
            .expect("hit");
        assert_abs_diff_eq!(t, 8.5, epsilon = 1e-4);
        assert_abs_diff_eq!(n.z, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z, 9.0, epsilon = 1e-4);
    }
}
