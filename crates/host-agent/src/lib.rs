//! Host process for a "who is human" game session.
//!
//! Wires the `coordination` phase scheduler to concrete collaborators:
//! scripted persona agents, a simulated or file-backed game state, JSON-lines
//! event output and session telemetry.

pub mod agents;
pub mod config;
pub mod output;
pub mod prompts;
pub mod simulator;
pub mod state_file;
pub mod telemetry;
pub mod tools;
