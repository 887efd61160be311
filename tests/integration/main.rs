//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one part of the agent against the mock
//! adapters in `mock_hw`.  All tests run on the host with no hardware.

mod agent_tests;
mod dispatcher_tests;
mod mock_hw;
mod publisher_tests;
mod remote_tests;
