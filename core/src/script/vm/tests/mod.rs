//! Tests for the VM
//!
//! Organized by feature area

mod basic_tests;
mod control_flow_tests;
mod helpers;
mod stdlib_tests;
