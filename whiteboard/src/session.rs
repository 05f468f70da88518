//! Local drawing session — the pointer-event gesture state machine.
//!
//! DESIGN
//! ======
//! `Idle → Drawing → Idle`. Pointer-down begins a stroke, each pointer-move
//! extends it, pointer-up ends it. The pointer leaving the canvas is treated
//! identically to pointer-up; otherwise the session would be stuck in
//! `Drawing` with no closing event.
//!
//! The session holds the user's tool/color selection and drives a
//! [`BoardModel`]; it never talks to the network. Callers arm the sync
//! debounce when a method reports [`SessionEvent::GestureEnded`].

use crate::model::{BoardModel, Point, Tool};

/// Gesture position of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A stroke is being drawn.
    Drawing,
}

/// What a pointer event did, from the sync engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing sync-worthy happened.
    None,
    /// A gesture closed; the board should be pushed after the quiet period.
    GestureEnded,
}

/// Translates raw pointer input into board mutations.
#[derive(Debug, Default)]
pub struct DrawingSession {
    tool: Tool,
    color: String,
    state: SessionState,
}

impl DrawingSession {
    #[must_use]
    pub fn new(tool: Tool, color: impl Into<String>) -> Self {
        Self { tool, color: color.into(), state: SessionState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Select the tool for subsequent strokes. Ignored mid-gesture.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.state == SessionState::Idle {
            self.tool = tool;
        }
    }

    /// Select the color for subsequent strokes. Ignored mid-gesture.
    pub fn set_color(&mut self, color: impl Into<String>) {
        if self.state == SessionState::Idle {
            self.color = color.into();
        }
    }

    /// Pointer-down: begin a stroke. A down while already drawing is ignored
    /// (stray event from a missed up; the active gesture continues).
    pub fn pointer_down(&mut self, model: &mut BoardModel, point: Point) -> SessionEvent {
        if self.state == SessionState::Drawing {
            return SessionEvent::None;
        }
        if model.begin_stroke(self.tool, self.color.clone(), point).is_ok() {
            self.state = SessionState::Drawing;
        }
        SessionEvent::None
    }

    /// Pointer-move: extend the active stroke. No-op while idle.
    pub fn pointer_move(&mut self, model: &mut BoardModel, point: Point) -> SessionEvent {
        if self.state == SessionState::Drawing {
            model.extend_stroke(point);
        }
        SessionEvent::None
    }

    /// Pointer-up: close the gesture.
    ///
    /// Reports `GestureEnded` only when the model actually closed a gesture;
    /// if a remote replacement already aborted it there is nothing to push.
    pub fn pointer_up(&mut self, model: &mut BoardModel) -> SessionEvent {
        self.state = SessionState::Idle;
        if model.end_stroke() {
            SessionEvent::GestureEnded
        } else {
            SessionEvent::None
        }
    }

    /// Pointer leaving the canvas closes the gesture exactly like pointer-up.
    pub fn pointer_leave(&mut self, model: &mut BoardModel) -> SessionEvent {
        self.pointer_up(model)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
