//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Each call into a port is atomic on its own; handlers order their steps so
//! that re-running a partially applied sequence converges.

pub mod handlers;
