//! CPU picking against the scene graph.
//!
//! A click becomes a world-space ray through the camera; every model part is
//! rejected by its world bounds first and then tested triangle by triangle
//! (Möller–Trumbore). The nearest hit wins.

use crate::render::camera::OrbitCamera;
use crate::scene::selection::Selection;
use crate::scene::{NodeId, NodeRole, SceneGraph};
use glam::Vec3;

const PARALLEL_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Unprojects a pixel of a `width` × `height` viewport (origin top-left)
    /// into a world ray starting at the eye.
    pub fn from_screen(camera: &OrbitCamera, x: f32, y: f32, width: u32, height: u32) -> Self {
        let ndc_x = (x / width.max(1) as f32) * 2.0 - 1.0;
        let ndc_y = -(y / height.max(1) as f32) * 2.0 + 1.0;
        let inverse = camera.view_projection().inverse();
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Self::new(camera.eye, far - camera.eye)
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    pub point: Vec3,
    pub distance: f32,
}

/// Nearest model part under `ray`, if any. Highlight overlays are never hit.
pub fn pick(scene: &SceneGraph, ray: &Ray) -> Option<PickHit> {
    if ray.direction == Vec3::ZERO {
        return None;
    }

    let mut best: Option<PickHit> = None;
    for item in scene.renderables() {
        if item.role != NodeRole::Model {
            continue;
        }
        let bounds = item.geometry.bounds().transformed(&item.world);
        let Some(entry) = bounds.ray_distance(ray.origin, ray.direction) else {
            continue;
        };
        if best.is_some_and(|hit| entry > hit.distance) {
            continue;
        }

        for primitive in item.geometry.primitives() {
            for [a, b, c] in primitive.triangles() {
                let a = item.world.transform_point3(a);
                let b = item.world.transform_point3(b);
                let c = item.world.transform_point3(c);
                let Some(distance) = ray_triangle_intersect(ray, a, b, c) else {
                    continue;
                };
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(PickHit {
                        node: item.node,
                        point: ray.at(distance),
                        distance,
                    });
                }
            }
        }
    }
    best
}

/// Click handling: selects the part under `ray`, or clears the selection on a miss.
pub fn select_under(
    scene: &mut SceneGraph,
    selection: &mut Selection,
    ray: &Ray,
) -> Option<PickHit> {
    let hit = pick(scene, ray);
    match hit {
        Some(hit) => {
            selection.show(scene, hit.node, Some(hit.point));
        }
        None => selection.clear(scene),
    }
    hit
}

/// Distance along `ray` to the triangle `a b c`, both faces counted.
pub fn ray_triangle_intersect(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t > PARALLEL_EPSILON).then_some(t)
}
