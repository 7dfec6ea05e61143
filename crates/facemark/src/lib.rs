//! facemark — Attendance by whole-image face matching.
//!
//! Register reference images under a name, then verify probe images against
//! them. A probe whose nearest reference is within the distance threshold is
//! recorded in the attendance ledger.
//!
//! [`AttendanceService`] is the synchronous orchestrator; [`spawn_engine`]
//! moves it onto a single writer thread for hosts with concurrent callers.

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError, DEFAULT_DISTANCE_THRESHOLD};
pub use engine::{spawn_engine, EngineError, EngineHandle};
pub use events::{AttendanceEvent, Observer, Subscribers};
pub use service::{AttendanceService, ServiceError, Verification};

pub use facemark_core::{AttendanceEntry, ImageSource, MatchCandidate, Reference};
pub use facemark_store::{Storage, StoredReference};
