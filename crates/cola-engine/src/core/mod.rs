//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and a session,
//! plus the driver that sequences a session's lifecycle hooks.

mod app;
mod ctx;
mod lifecycle;

pub use app::{AppControl, Session};
pub use ctx::UpdateCtx;
pub use lifecycle::Lifecycle;
