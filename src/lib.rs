//! MT7687 low-power core.
//!
//! Two independent pieces of power management:
//!
//! - [`tickless`] suppresses the periodic RTOS tick while the system is
//!   idle and keeps kernel time exact across the sleep.
//! - [`mesh`] duty-cycles the radio along the node's own and its parent's
//!   mesh wake schedules.
//!
//! Both talk to the outside world only through the traits in
//! [`app::ports`], so the whole crate runs against mocks on the host.
//! Register-level adapters live in [`adapters`].

#![cfg_attr(not(test), no_std)]
#![deny(unused_must_use)]

extern crate alloc;

pub mod adapters;
pub mod app;
pub mod config;
pub mod mesh;
pub mod tickless;

mod error;

pub use error::{Error, Result, TlvError};
