use crate::config::CameraConfig;
use crate::scene::Aabb;
use glam::{Mat4, Vec3};

const MIN_POLAR: f32 = 1e-4;
const MIN_RADIUS: f32 = 1e-3;
const SETTLE_EPSILON: f32 = 1e-6;
/// Base dolly factor per wheel step.
const ZOOM_BASE: f32 = 0.95;

/// Offsets applied when re-framing, in world units before scaling. +Z is up.
const FRAME_DIRECTION_LOAD: Vec3 = Vec3::new(1.0, 1.0, 0.6);
const FRAME_DIRECTION_ZOOM: Vec3 = Vec3::new(0.8, -1.0, 0.6);
const FRAME_DIRECTION_SEARCH: Vec3 = Vec3::new(1.0, -1.0, 0.5);
const FRAME_PADDING: f32 = 1.5;

/// Orbit camera around a look-at target with damped user motion.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    damping: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vec3,
    pending_scale: f32,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, -5.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y: config.fov_deg.to_radians(),
            near: config.near,
            far: config.far,
            aspect: sanitize_aspect(aspect),
            damping: config.damping.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            pan_speed: config.pan_speed,
            zoom_speed: config.zoom_speed,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vec3::ZERO,
            pending_scale: 1.0,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = sanitize_aspect(width as f32 / height.max(1) as f32);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    /// Load-time framing: the whole box fits the vertical field of view with
    /// padding, seen from above the +X/+Y corner.
    pub fn frame_bounds(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let fit =
            (bounds.max_dimension() / (2.0 * (self.fov_y / 2.0).tan())).abs() * FRAME_PADDING;
        // Point-sized or degenerate models still need the eye off the target.
        let distance = if fit.is_finite() && fit > f32::EPSILON {
            fit
        } else {
            1.0
        };
        let offset = FRAME_DIRECTION_LOAD * distance;
        self.look_from(center + offset, center);
        log::info!(
            "Framed bounds center={:?} size={:?} distance={:.3}",
            center,
            bounds.size(),
            distance
        );
    }

    /// Centres the view on `point`, pulled back relative to the current distance.
    pub fn zoom_to_point(&mut self, point: Vec3) {
        let scale = (self.eye.distance(point) * 0.3).max(1.0);
        self.look_from(point + FRAME_DIRECTION_ZOOM * scale, point);
    }

    /// Framing for a search hit.
    pub fn focus_bounds(&mut self, bounds: &Aabb) {
        let center = bounds.center();
        let scale = bounds.size().length().max(1.0);
        self.look_from(center + FRAME_DIRECTION_SEARCH * scale, center);
    }

    /// Drag rotation in pixels; a drag across the full viewport height is one turn.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        self.pending_theta -= std::f32::consts::TAU * dx / height * self.rotate_speed;
        self.pending_phi -= std::f32::consts::TAU * dy / height * self.rotate_speed;
    }

    /// Drag panning in pixels; the point under the cursor follows it.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        let half_extent = self.distance() * (self.fov_y / 2.0).tan();
        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let camera_up = right.cross(forward).normalize_or_zero();
        let world_per_pixel = 2.0 * half_extent / height * self.pan_speed;
        self.pending_pan += -right * dx * world_per_pixel + camera_up * dy * world_per_pixel;
    }

    /// Positive steps move towards the target.
    pub fn dolly(&mut self, steps: f32) {
        self.pending_scale *= ZOOM_BASE.powf(steps * self.zoom_speed);
    }

    /// Advances damped motion by one frame. Returns `true` if the view moved.
    pub fn update(&mut self) -> bool {
        let moving = self.pending_theta.abs() > SETTLE_EPSILON
            || self.pending_phi.abs() > SETTLE_EPSILON
            || self.pending_pan.length_squared() > SETTLE_EPSILON * SETTLE_EPSILON
            || (self.pending_scale - 1.0).abs() > SETTLE_EPSILON;
        if !moving {
            self.settle();
            return false;
        }

        let step = if self.damping > 0.0 { self.damping } else { 1.0 };
        let offset = self.eye - self.target;
        let radius = (offset.length() * self.pending_scale).max(MIN_RADIUS);
        let theta = offset.y.atan2(offset.x) + self.pending_theta * step;
        let polar = (offset.z / offset.length().max(MIN_RADIUS)).clamp(-1.0, 1.0).acos();
        let polar =
            (polar + self.pending_phi * step).clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);

        self.target += self.pending_pan * step;
        self.eye = self.target
            + Vec3::new(
                radius * polar.sin() * theta.cos(),
                radius * polar.sin() * theta.sin(),
                radius * polar.cos(),
            );

        let decay = 1.0 - step;
        self.pending_theta *= decay;
        self.pending_phi *= decay;
        self.pending_pan *= decay;
        self.pending_scale = 1.0;
        true
    }

    fn look_from(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
        self.settle();
    }

    fn settle(&mut self) {
        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_pan = Vec3::ZERO;
        self.pending_scale = 1.0;
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::OrbitCamera;
    use crate::config::CameraConfig;
    use crate::render::pick::Ray;
    use crate::scene::Aabb;
    use glam::Vec3;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn frame_bounds_targets_centre_at_fov_distance() {
        let mut camera = camera();
        let bounds = Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(3.0, 2.0, 1.0));
        camera.frame_bounds(&bounds);

        assert_eq!(camera.target, Vec3::new(1.0, 0.0, 0.5));
        let expected = 4.0 / (2.0 * (22.5f32).to_radians().tan()) * 1.5;
        let offset = camera.eye - camera.target;
        assert!((offset.x - expected).abs() < 1e-4);
        assert!((offset.y - expected).abs() < 1e-4);
        assert!((offset.z - expected * 0.6).abs() < 1e-4);
    }

    #[test]
    fn framing_distance_scales_with_largest_dimension() {
        let mut small = camera();
        let mut large = camera();
        small.frame_bounds(&Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.5, 0.2)));
        large.frame_bounds(&Aabb::new(Vec3::ZERO, Vec3::new(10.0, 5.0, 2.0)));
        let ratio = large.distance() / small.distance();
        assert!((ratio - 10.0).abs() < 1e-3);
    }

    #[test]
    fn point_sized_bounds_keep_a_usable_view() {
        let mut camera = camera();
        camera.frame_bounds(&Aabb::new(Vec3::splat(2.0), Vec3::splat(2.0)));

        assert_eq!(camera.target, Vec3::splat(2.0));
        assert!(camera.distance() > 0.5);
        assert!(camera.view_projection().is_finite());
        let ray = Ray::from_screen(&camera, 640.0, 360.0, 1280, 720);
        assert!(ray.direction.is_finite());
        assert!((ray.direction.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_to_point_pulls_back_at_least_one_unit() {
        let mut camera = camera();
        camera.eye = Vec3::new(0.0, 0.0, 1.0);
        let point = Vec3::new(0.0, 0.0, 0.5);
        camera.zoom_to_point(point);
        assert_eq!(camera.target, point);
        assert!((camera.eye - (point + Vec3::new(0.8, -1.0, 0.6))).length() < 1e-5);

        camera.eye = Vec3::new(0.0, 0.0, 100.0);
        camera.zoom_to_point(Vec3::ZERO);
        assert!((camera.eye - Vec3::new(0.8, -1.0, 0.6) * 30.0).length() < 1e-3);
    }

    #[test]
    fn focus_bounds_uses_box_diagonal() {
        let mut camera = camera();
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 1.0));
        camera.focus_bounds(&bounds);
        assert_eq!(camera.target, Vec3::new(1.0, 1.0, 0.5));
        assert!((camera.eye - (camera.target + Vec3::new(3.0, -3.0, 1.5))).length() < 1e-5);
    }

    #[test]
    fn centre_ray_points_at_target() {
        let mut camera = camera();
        camera.frame_bounds(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let ray = Ray::from_screen(&camera, 640.0, 360.0, 1280, 720);
        let to_target = (camera.target - camera.eye).normalize();
        assert!(ray.direction.dot(to_target) > 0.9999);
        assert_eq!(ray.origin, camera.eye);
    }

    #[test]
    fn damped_orbit_keeps_distance_and_settles() {
        let mut camera = camera();
        camera.frame_bounds(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let distance = camera.distance();
        camera.rotate(120.0, 40.0, 720);
        let mut frames = 0;
        while camera.update() {
            frames += 1;
            assert!(frames < 1000, "damping never settled");
        }
        assert!(frames > 1);
        assert!((camera.distance() - distance).abs() < 1e-3);
        assert!(camera.eye.is_finite());
    }

    #[test]
    fn dolly_in_reduces_distance() {
        let mut camera = camera();
        camera.frame_bounds(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let before = camera.distance();
        camera.dolly(3.0);
        assert!(camera.update());
        assert!(camera.distance() < before);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera = camera();
        camera.frame_bounds(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        let offset = camera.eye - camera.target;
        camera.pan(50.0, 0.0, 720);
        while camera.update() {}
        assert!(camera.target.length() > 1e-3);
        assert!(((camera.eye - camera.target) - offset).length() < 1e-3);
    }

    #[test]
    fn reframing_cancels_pending_motion() {
        let mut camera = camera();
        camera.rotate(300.0, 0.0, 720);
        camera.frame_bounds(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        assert!(!camera.update());
    }
}
