// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transition layer of the parking operations core.
//!
//! Turns session commands, controller toggles, blacklist selections and
//! policy resets into validated changes plus exactly one audit event each.
//! Nothing here performs I/O; the persistence layer writes the change and
//! the event in one transaction.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod apply;
mod command;
mod error;
mod state;

#[cfg(test)]
mod tests;

pub use apply::{apply, apply_blacklist_selection, apply_controller_toggle, apply_policy_reset};
pub use command::Command;
pub use error::CoreError;
pub use state::{ControllerClaim, SessionChange, TransitionResult};
