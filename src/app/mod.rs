//! Boundary types shared by both low-power components.
//!
//! Port traits in [`ports`] describe every collaborator the core needs
//! (RTOS kernel, counters, timers, radio, neighbor table); [`events`]
//! holds what the core emits.  Neither the tickless controller nor the
//! schedule manager touches hardware outside these traits.

pub mod events;
pub mod ports;
