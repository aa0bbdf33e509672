//! egui paint pass on top of the 3D frame.

use egui_wgpu::ScreenDescriptor;

/// One frame of tessellated UI, as produced by the egui host.
pub struct UiPaint<'a> {
    pub primitives: &'a [egui::ClippedPrimitive],
    pub textures_delta: &'a egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub struct EguiOverlay {
    renderer: egui_wgpu::Renderer,
}

impl EguiOverlay {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, target_format, None, 1, false),
        }
    }

    /// Uploads new textures and this frame's vertex data. Returns the screen
    /// descriptor for [`EguiOverlay::paint`] plus any command buffers egui
    /// callbacks produced, which must be submitted before `encoder`.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        paint: &UiPaint,
        size_px: [u32; 2],
    ) -> (ScreenDescriptor, Vec<wgpu::CommandBuffer>) {
        for (id, delta) in &paint.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let screen = ScreenDescriptor {
            size_in_pixels: size_px,
            pixels_per_point: paint.pixels_per_point,
        };
        let extra = self
            .renderer
            .update_buffers(device, queue, encoder, paint.primitives, &screen);
        (screen, extra)
    }

    pub fn paint(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        paint: &UiPaint,
        screen: &ScreenDescriptor,
    ) {
        self.renderer.render(pass, paint.primitives, screen);
    }

    /// Frees textures egui released this frame. Call after submission.
    pub fn finish(&mut self, paint: &UiPaint) {
        for id in &paint.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
