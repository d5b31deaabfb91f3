//! Analytics aggregation over tasks, pomodoro sessions, focus periods, and
//! brief logs.
//!
//! Each aggregation is split into a thin orchestrator that fetches rows from
//! [`crate::db::Database`] and a pure `compute_*` function over those rows,
//! so the arithmetic is testable without a database or a mocked clock.
//!
//! Any repository error aborts the whole aggregation; there are no partial
//! results.

mod completion;
mod focus;
mod habits;
mod window;

pub use completion::*;
pub use focus::*;
pub use habits::*;
pub use window::*;
