//! Domain models for confessions.
//!
//! - [`ConfessionRecord`]: A persisted message addressed from a sender to a
//!   recipient. Created once, read any number of times, never edited.
//! - [`FlowConfig`]: Data describing one variant of the interactive
//!   experience (reveal steps, decision copy, success copy, theme and media).

mod confession;
mod flow;

pub use confession::*;
pub use flow::*;
