//! Tests for the script host
//!
//! Organized by feature area

mod helpers;
