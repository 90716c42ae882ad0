//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements        | Connects to                    |
//! |-------------|-------------------|--------------------------------|
//! | `log_sink`  | MeshEventSink     | Serial log output              |
//! | `systick`   | TickCounterPort   | Cortex-M SysTick               |
//! |             | CpuPort           | SysTick `TICKINT`, `wfi`       |
//!
//! The RTOS, GPT, sleep-manager and mesh-stack ports are implemented by
//! the board support crate that links this one.

#[cfg(feature = "cortex-m")]
pub mod systick;
pub mod log_sink;
