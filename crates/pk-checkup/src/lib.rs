//! `pk-checkup` — deferred parked-vehicle checkups.
//!
//! Viewport updates push parked-vehicle ids into a [`DeferredCheckupQueue`];
//! one [`CheckupWorker`] thread drains it and hands each id to a
//! [`CheckupHandler`].  An id waits in the queue at most once.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`queue`]  | `DeferredCheckupQueue`                                     |
//! | [`worker`] | `CheckupWorker`, `CheckupHandler`, `Sleeper`, `ThreadSleeper` |
//! | [`stats`]  | `stats_label`, `load_color`                                |
//! | [`error`]  | `CheckupError`, `CheckupResult<T>`                         |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                  |
//! |-----------|---------------------------------------------------------|
//! | `fx-hash` | FxHash instead of SipHash for the queue membership set. |

pub mod error;
pub mod queue;
pub mod stats;
pub mod worker;


pub use error::{CheckupError, CheckupResult};
pub use queue::DeferredCheckupQueue;
pub use stats::{Rgb, load_color, stats_label};
pub use worker::{CheckupHandler, CheckupWorker, Sleeper, ThreadSleeper, WORKER_THREAD_NAME};
