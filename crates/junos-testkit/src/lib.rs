//! Test infrastructure for Junos configuration lifecycles
//!
//! Provides:
//! - An in-memory device with a shared candidate lock and running configuration
//! - Sample resource records for every key arity
//! - Device state verification helpers
//! - A harness wiring device, client and dispatchers together

pub mod fixtures;
pub mod harness;
pub mod mock_device;
mod verification;

pub use fixtures::*;
pub use harness::{live_config, offline_config, TestHarness};
pub use mock_device::{DeviceCall, MockDevice, MockLink};
pub use verification::*;
