//! Domain models for pomotrack.
//!
//! # Core Concepts
//!
//! - [`Task`]: the unit of planning. Soft-deleted, owner-scoped, carries
//!   rolled-up focus accumulators.
//! - [`PomodoroSession`]: a timed work session, optionally against a task.
//!   At most one open session per user.
//! - [`FocusPeriod`]: a contiguous stretch of focus inside a session. At most
//!   one open period per session.
//! - [`BriefLog`]: append-only annotation explaining a task edit or deletion.
//!   Types 1-4 feed the habit analytics.
//! - [`User`]: account with a monthly make-up check-in quota.
//!
//! Every task, session, period, and brief log belongs to exactly one user;
//! all queries filter by owner.

mod brieflog;
mod focus;
mod pomodoro;
mod task;
mod user;

pub use brieflog::*;
pub use focus::*;
pub use pomodoro::*;
pub use task::*;
pub use user::*;
