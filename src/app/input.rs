use winit::event::MouseButton;

/// Pointer travel, in physical pixels, past which a press is a drag rather
/// than a click.
pub const CLICK_SLOP_PX: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    None,
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    Click { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    button: MouseButton,
    origin: (f32, f32),
    dragged: bool,
}

/// Turns raw cursor and button events into view gestures. One button is
/// tracked at a time; presses of other buttons during a gesture are ignored.
#[derive(Debug, Default)]
pub struct PointerInput {
    position: Option<(f32, f32)>,
    press: Option<Press>,
}

impl PointerInput {
    pub fn cursor_moved(&mut self, x: f32, y: f32) -> PointerAction {
        let previous = self.position.replace((x, y));
        let (Some(press), Some((px, py))) = (self.press.as_mut(), previous) else {
            return PointerAction::None;
        };

        let (ox, oy) = press.origin;
        if (x - ox).hypot(y - oy) > CLICK_SLOP_PX {
            press.dragged = true;
        }
        let (dx, dy) = (x - px, y - py);
        match press.button {
            MouseButton::Left => PointerAction::Orbit { dx, dy },
            MouseButton::Right | MouseButton::Middle => PointerAction::Pan { dx, dy },
            _ => PointerAction::None,
        }
    }

    pub fn button(&mut self, button: MouseButton, pressed: bool) -> PointerAction {
        if pressed {
            if self.press.is_none() {
                if let Some(origin) = self.position {
                    self.press = Some(Press {
                        button,
                        origin,
                        dragged: false,
                    });
                }
            }
            return PointerAction::None;
        }

        match self.press {
            Some(press) if press.button == button => {
                self.press = None;
                match (button, press.dragged, self.position) {
                    (MouseButton::Left, false, Some((x, y))) => PointerAction::Click { x, y },
                    _ => PointerAction::None,
                }
            }
            _ => PointerAction::None,
        }
    }

    pub fn cursor_left(&mut self) {
        self.position = None;
        self.press = None;
    }
}
