//! HTTP surface: client identification, response decoration, the gate
//! middleware and the server hosting it.

pub mod client;
mod gate;
pub mod response;
mod server;

pub use client::identify;
pub use gate::{admission_control, now_millis, Gate, Verdict};
pub use server::{router, HttpServer};
