//! # Gesture Arbitration
//!
//! Swipe navigation and pull-to-refresh for a single view, driven from one
//! thread. The recognizer classifies pointer sessions; the arbiter decides
//! whether a navigation or a refresh may run.

pub mod arbiter;
pub mod config;
pub mod controller;
pub mod errors;
pub mod recognizer;

pub use arbiter::{NavigationArbiter, NavigationTarget, RefreshOutcome, RefreshTicket};
pub use config::GestureConfig;
pub use controller::GestureController;
pub use errors::{GestureError, GestureResult};
pub use recognizer::{
    Axis, GestureIntent, GestureOutput, GestureRecognizer, GestureSession, Point, PointerEvent,
    ScrollPolicy, SessionContext,
};
