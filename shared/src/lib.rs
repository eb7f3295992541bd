//! Types shared between the party server and the browser client.

pub mod config;
pub mod protocol;
pub mod vec3;
