//! Skirmish Engine - request arbitration and objective scheduling for an RTS agent
//!
//! Each tick, producers ask for things to build, the arbitrator spends the
//! three resource pools on the most urgent of them, and tactical objectives
//! claim units, stage, fight and fall back.

pub mod allocation;
pub mod combat;
pub mod core;
pub mod engine;
pub mod objective;
pub mod producers;
pub mod requests;
pub mod scenario;
pub mod world;

pub use crate::engine::{Engine, TickReport};
