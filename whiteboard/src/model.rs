//! Stroke model — the board document and its mutation primitives.
//!
//! DESIGN
//! ======
//! The board is an ordered sequence of strokes; insertion order is drawing
//! order and there is no per-stroke identity or versioning. A stroke is
//! mutable only while its gesture is active; once the gesture ends, the next
//! synced copy from the shared document is authoritative.
//!
//! `replace_all` implements the chosen last-write-wins semantics: a remote
//! snapshot replaces local state wholesale, and an in-progress local gesture
//! is lost rather than merged.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Which drawing tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Freehand pen (default).
    #[default]
    Pen,
    /// Eraser — rendered as background-colored wide strokes.
    Eraser,
}

/// A point on the board, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One continuous pen/eraser gesture: tool + color + ordered points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub tool: Tool,
    pub color: String,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke with its first point.
    #[must_use]
    pub fn new(tool: Tool, color: impl Into<String>, first: Point) -> Self {
        Self { tool, color: color.into(), points: vec![first] }
    }
}

/// Full payload of the shared remote document.
///
/// The field name `lines` is fixed for wire compatibility. A missing remote
/// document is treated as `BoardSnapshot::default()` (an empty board).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub lines: Vec<Stroke>,
}

/// Errors from board mutation primitives.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("a gesture is already active")]
    GestureAlreadyActive,
}

// =============================================================================
// BOARD MODEL
// =============================================================================

/// In-memory board state: the stroke sequence plus the active-gesture flag.
#[derive(Debug, Default)]
pub struct BoardModel {
    lines: Vec<Stroke>,
    drawing: bool,
}

impl BoardModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current strokes in drawing order.
    #[must_use]
    pub fn lines(&self) -> &[Stroke] {
        &self.lines
    }

    /// Whether a gesture is currently active.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Clone the current state as a shared-document payload.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot { lines: self.lines.clone() }
    }

    /// Begin a new stroke with a single point and mark the gesture active.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::GestureAlreadyActive`] if a gesture is already in
    /// progress; the board is left untouched.
    pub fn begin_stroke(&mut self, tool: Tool, color: impl Into<String>, point: Point) -> Result<(), ModelError> {
        if self.drawing {
            return Err(ModelError::GestureAlreadyActive);
        }
        self.lines.push(Stroke::new(tool, color, point));
        self.drawing = true;
        Ok(())
    }

    /// Append a point to the stroke of the active gesture.
    ///
    /// No-op when no gesture is active. This makes it safe for a remote
    /// replacement to land mid-gesture: the aborted gesture's trailing moves
    /// simply do nothing.
    pub fn extend_stroke(&mut self, point: Point) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.lines.last_mut() {
            stroke.points.push(point);
        }
    }

    /// End the active gesture. Returns `true` if a gesture was actually
    /// closed, i.e. the caller should request a sync.
    pub fn end_stroke(&mut self) -> bool {
        let was_drawing = self.drawing;
        self.drawing = false;
        was_drawing
    }

    /// Empty the board. Any active gesture is aborted — the stroke being
    /// drawn was part of the state that was cleared.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.drawing = false;
    }

    /// Wholesale replacement with a remote snapshot.
    ///
    /// Safe to call while a gesture is active: the in-progress stroke is lost
    /// and the remote state is adopted verbatim (last-write-wins, no merge).
    pub fn replace_all(&mut self, lines: Vec<Stroke>) {
        self.lines = lines;
        self.drawing = false;
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
