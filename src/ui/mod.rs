use crate::assets::LoadProgress;
use crate::scene::selection::AttributePanel;
use std::time::{Duration, Instant};

/// How long the completed progress bar stays up before hiding.
pub const PROGRESS_HIDE_DELAY: Duration = Duration::from_millis(700);

const PANEL_MARGIN: f32 = 12.0;

/// What the user asked for this frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiActions {
    pub search: Option<String>,
    pub zoom: bool,
    pub clear_selection: bool,
    pub open_model: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoadIndicator {
    fraction: f32,
    hide_at: Option<Instant>,
}

pub struct UiState {
    search_text: String,
    loading: Option<LoadIndicator>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            search_text: String::new(),
            loading: None,
        }
    }

    pub fn begin_loading(&mut self) {
        self.loading = Some(LoadIndicator {
            fraction: 0.0,
            hide_at: None,
        });
    }

    pub fn set_progress(&mut self, progress: LoadProgress) {
        if let Some(indicator) = &mut self.loading {
            if indicator.hide_at.is_none() {
                indicator.fraction = progress.fraction().max(indicator.fraction);
            }
        }
    }

    /// Fills the bar and schedules it to hide.
    pub fn finish_loading(&mut self, now: Instant) {
        self.loading = Some(LoadIndicator {
            fraction: 1.0,
            hide_at: Some(now + PROGRESS_HIDE_DELAY),
        });
    }

    pub fn cancel_loading(&mut self) {
        self.loading = None;
    }

    pub fn tick(&mut self, now: Instant) {
        if self
            .loading
            .is_some_and(|indicator| indicator.hide_at.is_some_and(|at| now >= at))
        {
            self.loading = None;
        }
    }

    /// Progress bar fill while it is shown.
    pub fn progress(&self) -> Option<f32> {
        self.loading.map(|indicator| indicator.fraction)
    }

    pub fn draw(
        &mut self,
        ctx: &egui::Context,
        panel: &AttributePanel,
        can_zoom: bool,
    ) -> UiActions {
        let mut actions = UiActions::default();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open model…").clicked() {
                    actions.open_model = true;
                }
                ui.separator();

                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search_text)
                        .hint_text("Search part name…")
                        .desired_width(220.0),
                );
                let submitted =
                    search.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                if ui.button("Search").clicked() || submitted {
                    actions.search = Some(self.search_text.clone());
                }

                ui.separator();
                if ui
                    .add_enabled(can_zoom, egui::Button::new("Zoom to selection"))
                    .clicked()
                {
                    actions.zoom = true;
                }
                if ui.button("Clear selection").clicked() {
                    actions.clear_selection = true;
                }

                if let Some(fraction) = self.progress() {
                    ui.separator();
                    ui.add(
                        egui::ProgressBar::new(fraction)
                            .desired_width(160.0)
                            .show_percentage(),
                    );
                }
            });
        });

        if panel.visible {
            let mut open = true;
            egui::Window::new(panel.title.as_str())
                .id(egui::Id::new("attribute_panel"))
                .open(&mut open)
                .anchor(egui::Align2::RIGHT_TOP, [-PANEL_MARGIN, PANEL_MARGIN * 4.0])
                .resizable(false)
                .collapsible(false)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().max_height(420.0).show(ui, |ui| {
                        egui::Grid::new("attribute_rows")
                            .num_columns(2)
                            .striped(true)
                            .show(ui, |ui| {
                                for row in &panel.rows {
                                    ui.strong(row.key.as_str());
                                    ui.label(row.value.as_str());
                                    ui.end_row();
                                }
                            });
                    });
                });
            if !open {
                actions.clear_selection = true;
            }
        }

        actions
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::selection::AttributeRow;

    fn run_frame(ui: &mut UiState, ctx: &egui::Context, panel: &AttributePanel) -> UiActions {
        let mut actions = UiActions::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui.draw(ctx, panel, false);
        });
        actions
    }

    #[test]
    fn progress_follows_loader_and_hides_after_delay() {
        let mut ui = UiState::new();
        assert_eq!(ui.progress(), None);

        ui.begin_loading();
        assert_eq!(ui.progress(), Some(0.0));
        ui.set_progress(LoadProgress { loaded: 1, total: 4 });
        assert_eq!(ui.progress(), Some(0.25));

        let done = Instant::now();
        ui.finish_loading(done);
        assert_eq!(ui.progress(), Some(1.0));
        ui.set_progress(LoadProgress { loaded: 2, total: 4 });
        assert_eq!(ui.progress(), Some(1.0));

        ui.tick(done + Duration::from_millis(699));
        assert_eq!(ui.progress(), Some(1.0));
        ui.tick(done + PROGRESS_HIDE_DELAY);
        assert_eq!(ui.progress(), None);
    }

    #[test]
    fn progress_ignored_when_not_loading() {
        let mut ui = UiState::new();
        ui.set_progress(LoadProgress { loaded: 3, total: 4 });
        assert_eq!(ui.progress(), None);

        ui.begin_loading();
        ui.cancel_loading();
        assert_eq!(ui.progress(), None);
    }

    #[test]
    fn idle_frame_requests_nothing() {
        let ctx = egui::Context::default();
        let mut ui = UiState::new();
        let panel = AttributePanel {
            visible: true,
            title: "Beam_A".to_string(),
            rows: vec![AttributeRow {
                key: "Type".to_string(),
                value: "Beam".to_string(),
            }],
        };
        ui.begin_loading();
        assert_eq!(run_frame(&mut ui, &ctx, &panel), UiActions::default());
        assert_eq!(run_frame(&mut ui, &ctx, &AttributePanel::default()), UiActions::default());
    }
}
