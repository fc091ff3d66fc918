use spine2d_widget::PointerEventKind;

/// Turns raw DOM pointer event types into overlay pointer events.
///
/// Moves while a button is held become drags. Only the primary pointer is tracked.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    pressed: bool,
    pointer_id: Option<i32>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Returns `None` for event types the overlay ignores and for secondary pointers.
    pub fn translate(&mut self, event_type: &str, pointer_id: i32) -> Option<PointerEventKind> {
        if let Some(active) = self.pointer_id {
            if active != pointer_id {
                return None;
            }
        }
        match event_type {
            "pointerdown" => {
                self.pressed = true;
                self.pointer_id = Some(pointer_id);
                Some(PointerEventKind::Down)
            }
            "pointermove" => Some(if self.pressed {
                PointerEventKind::Drag
            } else {
                PointerEventKind::Move
            }),
            "pointerup" | "pointercancel" => {
                let was_pressed = self.pressed;
                self.release();
                was_pressed.then_some(PointerEventKind::Up)
            }
            "pointerleave" | "pointerout" => {
                self.release();
                Some(PointerEventKind::Leave)
            }
            _ => None,
        }
    }

    fn release(&mut self) {
        self.pressed = false;
        self.pointer_id = None;
    }
}

/// DOM event types a [`PointerTracker`] consumes.
pub const POINTER_EVENTS: [&str; 5] = [
    "pointerdown",
    "pointermove",
    "pointerup",
    "pointercancel",
    "pointerleave",
];
