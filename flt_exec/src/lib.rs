//! # Flight library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the flight executive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuation client - sends commands to the vehicle link
pub mod act_client;

/// Blackboard - state shared between the estimate loop and the input handlers
pub mod blackboard;

/// Command publisher - stamps and sends actuation demands
pub mod cmd_pub;

/// Estimate conversion and discontinuity filtering
pub mod est;

/// Flight phase tracking - grounded or flying
pub mod flight_phase;

/// Input handlers - apply plans, edges, node poses, vehicle status and TCs to the blackboard
pub mod handlers;

/// Input client - subscribes to every input stream
pub mod input_client;

/// Input router - splits the input stream into per-stream channels
pub mod input_router;

/// Mode dispatcher - chooses between hover and waypoint following
pub mod mode_disp;

/// Executable parameters
pub mod params;

/// Path ingestion - converts and sparsifies planner output
pub mod path_ingest;

/// Path publisher - re-publishes simplified paths for inspection
pub mod path_pub;

/// Estimate pipeline - the real-time path from estimate to command
pub mod pipeline;

/// Reference frame reprojection
pub mod reproj;

/// Telecommand client - recieves goals and yaw requests
pub mod tc_client;

/// Trajectory control module - turns targets into actuation demands
pub mod traj_ctrl;
