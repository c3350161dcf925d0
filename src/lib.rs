//! upmon - systemd offline update monitoring
//!
//! Detects a staged systemd offline update through the `system-update`
//! sentinel, identifies the package manager backend that staged it, and can
//! cancel it before the reboot applies it. Shared by the `upmond` daemon and
//! by embedders that bring their own event loop.

// Production-ready clippy configuration
#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::suspicious)]
// Allow documentation lints - internal code, not public API
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Allow some pedantic lints that are too strict for this codebase
#![allow(clippy::module_name_repetitions)]

pub mod backends;
pub mod config;
pub mod controller;
pub mod core;
pub mod monitor;
pub mod power;
