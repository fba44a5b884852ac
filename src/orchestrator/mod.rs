//! Application-level orchestration.
//!
//! The controller owns the live session (definition + engine + bindings) and
//! serialises every transition; post-processing merges a finished or abandoned
//! attempt into the run file.

mod controller;
mod post_process;

pub(crate) use controller::{Outcome, SegmentEdit, Session};
