//! Shared-whiteboard state and synchronization engine for StudySphere.
//!
//! This crate owns the client-side logic of a group's whiteboard: translating
//! pointer input into strokes, holding the board document, and reconciling it
//! with the shared remote copy under a last-write-wins, debounced,
//! full-snapshot protocol. The hosting layer is responsible only for feeding
//! pointer events in and providing a [`sync::RemoteBoard`] implementation that
//! reaches the backend.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Stroke types and the in-memory board document |
//! | [`session`] | Pointer-event gesture state machine |
//! | [`sync`] | Debounced outbound writes and the inbound subscription |

pub mod model;
pub mod session;
pub mod sync;

pub use model::{BoardModel, BoardSnapshot, Point, Stroke, Tool};
pub use session::{DrawingSession, SessionEvent, SessionState};
pub use sync::{BoardInput, RemoteBoard, Subscription, SyncEngine, SyncError};
