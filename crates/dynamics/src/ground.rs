//! Ground probing seam and a planar reference ground.

use nalgebra::{Unit, Vector3};

/// Result of a successful ground probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point
    pub distance: f32,
    pub point: Vector3<f32>,
    /// Unit surface normal at the hit point
    pub normal: Vector3<f32>,
}

/// Raycast provider used by the suspension.
pub trait GroundProbe {
    /// Cast from `origin` along unit `direction`, reporting the first surface
    /// within `max_distance`.
    fn cast(&self, origin: &Vector3<f32>, direction: &Vector3<f32>, max_distance: f32)
        -> Option<RayHit>;
}

/// Infinite plane, optionally inclined so it rises toward world -Z.
#[derive(Debug, Clone, Copy)]
pub struct GroundPlane {
    point: Vector3<f32>,
    normal: Unit<Vector3<f32>>,
}

impl GroundPlane {
    /// Horizontal plane at `height`
    pub fn flat(height: f32) -> Self {
        Self::inclined(height, 0.0)
    }

    /// Plane through (0, height, 0) tilted by `slope_deg` about world X
    pub fn inclined(height: f32, slope_deg: f32) -> Self {
        let slope = slope_deg.to_radians();
        Self {
            point: Vector3::new(0.0, height, 0.0),
            normal: Unit::new_normalize(Vector3::new(0.0, slope.cos(), slope.sin())),
        }
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal.into_inner()
    }

    /// Ground height below (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let n = self.normal;
        self.point.y - (n.x * (x - self.point.x) + n.z * (z - self.point.z)) / n.y
    }
}

impl GroundProbe for GroundPlane {
    fn cast(
        &self,
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        let denom = self.normal.dot(direction);
        // Parallel, or approaching the plane from underneath
        if denom > -1e-6 {
            return None;
        }

        let distance = self.normal.dot(&(self.point - origin)) / denom;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }

        Some(RayHit {
            distance,
            point: origin + direction * distance,
            normal: self.normal(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_hit() {
        let ground = GroundPlane::flat(0.0);
        let hit = ground
            .cast(&Vector3::new(3.0, 0.4, -2.0), &-Vector3::y(), 1.0)
            .unwrap();
        assert!((hit.distance - 0.4).abs() < 1e-6);
        assert!((hit.point - Vector3::new(3.0, 0.0, -2.0)).norm() < 1e-6);
        assert_eq!(hit.normal, Vector3::y());
    }

    #[test]
    fn test_out_of_range_is_airborne() {
        let ground = GroundPlane::flat(0.0);
        assert!(ground
            .cast(&Vector3::new(0.0, 2.0, 0.0), &-Vector3::y(), 1.0)
            .is_none());
    }

    #[test]
    fn test_below_surface_misses() {
        let ground = GroundPlane::flat(0.0);
        assert!(ground
            .cast(&Vector3::new(0.0, -0.2, 0.0), &-Vector3::y(), 1.0)
            .is_none());
    }

    #[test]
    fn test_inclined_rises_toward_forward() {
        let ground = GroundPlane::inclined(0.0, 10.0);
        assert!(ground.height_at(0.0, -10.0) > 1.0);
        assert!(ground.height_at(0.0, 10.0) < -1.0);
        assert!(ground.height_at(5.0, 0.0).abs() < 1e-6);

        let origin = Vector3::new(0.0, 5.0, -4.0);
        let hit = ground.cast(&origin, &-Vector3::y(), 10.0).unwrap();
        assert!((hit.point.y - ground.height_at(0.0, -4.0)).abs() < 1e-4);
    }
}
