//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one component against
//! the mock adapters in `mock_hw`.  All tests run on the host with no
//! real hardware required.

mod channel_tests;
mod tickless_tests;
