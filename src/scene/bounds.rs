use glam::{Mat4, Vec3};

/// Axis-aligned bounding box. An empty box has `min > max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return Aabb::EMPTY;
        }
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        Aabb::from_points(corners.iter().map(|corner| matrix.transform_point3(*corner)))
    }

    /// Slab test. Returns the entry distance along the ray (0 when the origin is
    /// inside), or `None` when the ray misses.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let inv = direction.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();
        if t_near.is_nan() || t_far.is_nan() || t_far < t_near.max(0.0) {
            return None;
        }
        Some(t_near.max(0.0))
    }
}
