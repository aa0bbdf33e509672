mod egui_host;
mod input;
mod session;
mod timing;

use crate::assets::{AssetError, LoadEvent, LoadJob};
use crate::config::ViewerConfig;
use crate::render::{OrbitCamera, RenderContext, RenderError};
use crate::ui::{UiActions, UiState};
use egui_host::EguiHost;
use input::{PointerAction, PointerInput};
use session::Session;
use timing::FrameTiming;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Pixel-delta scrolling that counts as one wheel notch.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    session: Session,
    ui: UiState,
    pointer: PointerInput,
    load_job: Option<LoadJob>,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        Self {
            session: Session::new(OrbitCamera::new(&config.camera, aspect)),
            timing: FrameTiming::new(config.window.title.clone()),
            config,
            window: None,
            render: None,
            egui: None,
            ui: UiState::new(),
            pointer: PointerInput::default(),
            load_job: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn init_renderer(&mut self, window: Arc<Window>) -> Result<(), RenderError> {
        let render = RenderContext::new(Arc::clone(&window), &self.config)?;
        let [width, height] = render.size();
        self.session.camera.set_viewport(width, height);
        self.egui = Some(EguiHost::new(&window));
        self.render = Some(render);
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(render) = &mut self.render {
            render.resize(new_size.width, new_size.height);
        }
        self.session
            .camera
            .set_viewport(new_size.width, new_size.height);
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn start_load(&mut self, path: PathBuf) {
        if self.load_job.as_ref().is_some_and(|job| !job.is_finished()) {
            log::warn!(
                "Ignoring {}: another model is still loading",
                path.display()
            );
            return;
        }
        match LoadJob::spawn(path.clone()) {
            Ok(job) => {
                self.ui.begin_loading();
                self.timing
                    .set_status(format!("Loading {}…", display_name(&path)));
                self.load_job = Some(job);
            }
            Err(err) => self.report_load_failure(&path, &err),
        }
    }

    fn poll_load(&mut self, now: Instant) {
        let Some(job) = &mut self.load_job else {
            return;
        };
        let path = job.path().to_path_buf();
        for event in job.poll() {
            match event {
                LoadEvent::Progress(progress) => self.ui.set_progress(progress),
                LoadEvent::Finished(Ok(model)) => {
                    self.ui.finish_loading(now);
                    self.timing.set_status(display_name(&model.path));
                    self.session.replace_model(model);
                }
                LoadEvent::Finished(Err(err)) => {
                    self.ui.cancel_loading();
                    self.timing.set_status("");
                    self.report_load_failure(&path, &err);
                }
            }
        }
        if self.load_job.as_ref().is_some_and(LoadJob::is_finished) {
            self.load_job = None;
        }
    }

    fn report_load_failure(&self, path: &Path, err: &AssetError) {
        log::error!("Failed to load {}: {}", path.display(), err);
        alert(
            "Load failed",
            &format!(
                "Failed to load GLTF model.\n\nPath used: {}\n\n{}",
                path.display(),
                err
            ),
        );
    }

    fn handle_pointer(&mut self, action: PointerAction) {
        let [width, height] = self.viewport_size();
        match action {
            PointerAction::None => {}
            PointerAction::Orbit { dx, dy } => self.session.camera.rotate(dx, dy, height),
            PointerAction::Pan { dx, dy } => self.session.camera.pan(dx, dy, height),
            PointerAction::Click { x, y } => {
                if let Some(hit) = self.session.click(x, y, width, height) {
                    log::info!(
                        "Picked {:?} at {:?} (distance {:.3})",
                        hit.node,
                        hit.point,
                        hit.distance
                    );
                }
            }
        }
    }

    fn apply_actions(&mut self, actions: UiActions) {
        if actions.open_model {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("glTF", &["gltf", "glb"])
                .pick_file()
            {
                self.start_load(path);
            }
        }
        if let Some(query) = actions.search {
            if let Err(err) = self.session.search(&query) {
                log::info!("{}", err);
                alert("Search", &err.to_string());
            }
        }
        if actions.zoom {
            self.session.zoom_to_selection();
        }
        if actions.clear_selection {
            self.session.clear_selection();
        }
    }

    fn viewport_size(&self) -> [u32; 2] {
        match (&self.render, &self.window) {
            (Some(render), _) => render.size(),
            (None, Some(window)) => {
                let size = window.inner_size();
                [size.width.max(1), size.height.max(1)]
            }
            (None, None) => [self.config.window.width, self.config.window.height],
        }
    }

    fn render(&mut self) -> Result<(), RenderError> {
        let frame_start = Instant::now();
        self.poll_load(frame_start);
        self.ui.tick(frame_start);
        self.session.camera.update();

        let (Some(window), Some(egui)) = (self.window.clone(), self.egui.as_mut()) else {
            return Ok(());
        };
        let panel = self.session.selection.panel().clone();
        let can_zoom = self.session.selection.anchor().is_some();
        let ui = &mut self.ui;
        let mut actions = UiActions::default();
        let output = egui.run_ui(&window, |ctx| {
            actions = ui.draw(ctx, &panel, can_zoom);
        });
        self.apply_actions(actions);

        if let Some(render) = &mut self.render {
            render.render(&self.session.scene, &self.session.camera, &output.paint())?;
        }
        self.timing
            .set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);
        self.timing.update(Some(window.as_ref()), frame_start);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        if let Err(err) = self.init_renderer(Arc::clone(&window)) {
            log::error!("Failed to initialise renderer: {}", err);
            event_loop.exit();
            return;
        }
        self.update_target_frame_duration(&window);
        self.window = Some(window);

        if let Some(path) = self.config.model_path.clone() {
            self.start_load(path);
        } else {
            log::info!("No model configured; use \"Open model…\" to pick one");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (self.window.as_ref(), self.egui.as_mut()) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };
        let ui_owns_pointer = self.egui.as_ref().is_some_and(EguiHost::owns_pointer);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !consumed
                    && event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.session.clear_selection();
                }
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let action = self
                    .pointer
                    .cursor_moved(position.x as f32, position.y as f32);
                self.handle_pointer(action);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                if pressed && (consumed || ui_owns_pointer) {
                    return;
                }
                let action = self.pointer.button(button, pressed);
                self.handle_pointer(action);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if consumed || ui_owns_pointer {
                    return;
                }
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_WHEEL_STEP,
                };
                self.session.camera.dolly(steps);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.render() {
                    log::error!("Rendering failed: {}", err);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Blocking message box.
fn alert(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match ViewerConfig::resolve(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(2);
        }
    };

    log::info!("Part Inspector");
    log::info!("   Click a part to inspect it; close the window to exit");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {}", err);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", err);
    }

    log::info!("Goodbye");
}
