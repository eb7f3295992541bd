//! Party arcade server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod beat;
pub mod config;
pub mod controller;
pub mod entity;
pub mod game_loop;
pub mod input;
pub mod ledger;
pub mod player;
pub mod scores;
pub mod session;
pub mod simulator;
pub mod state;
pub mod timer;
pub mod wheel;
pub mod ws;
