//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the flight software: the messages exchanged
//! with the estimator, planner, vehicle link and ground, and the network layer carrying them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Ground requests (goals and yaw overrides) and their responses
pub mod tc;

/// Message definitions for equipment (estimator, planner, vehicle link)
pub mod eqpt;

/// Network module
pub mod net;
