use std::time::{Duration, Instant};
use winit::window::Window;

const TITLE_REFRESH: Duration = Duration::from_millis(500);

pub struct FrameTiming {
    last_fps_time: Instant,
    frame_count: u32,
    render_ms: f32,
    base_title: String,
    status: String,
    status_dirty: bool,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_fps_time: Instant::now(),
            frame_count: 0,
            render_ms: 0.0,
            base_title,
            status: String::new(),
            status_dirty: false,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Shown between the base title and the frame rate, e.g. the model name.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_dirty = true;
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed >= TITLE_REFRESH || self.status_dirty {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32().max(1e-3);
            if let Some(window) = window {
                window.set_title(&self.title(fps));
            }
            self.frame_count = 0;
            self.last_fps_time = now;
            self.status_dirty = false;
        }
    }

    fn title(&self, fps: f32) -> String {
        let mut title = self.base_title.clone();
        if !self.status.is_empty() {
            title.push_str(" - ");
            title.push_str(&self.status);
        }
        title.push_str(&format!(" - {:.1} fps (render {:.2} ms)", fps, self.render_ms));
        title
    }
}

#[cfg(test)]
mod tests {
    use super::FrameTiming;

    #[test]
    fn title_carries_status_and_rate() {
        let mut timing = FrameTiming::new("Part Inspector".to_string());
        assert_eq!(timing.title(60.0), "Part Inspector - 60.0 fps (render 0.00 ms)");

        timing.set_status("site.gltf");
        timing.set_render_ms(1.25);
        assert_eq!(
            timing.title(59.94),
            "Part Inspector - site.gltf - 59.9 fps (render 1.25 ms)"
        );
    }
}
