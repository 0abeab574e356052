//! Common test utilities and infrastructure
//!
//! Shared fixtures, builders and a scripted Model Service used across the
//! planner test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{PlannerBuilder, ScriptedService, TestHelpers};
