//! Core types for canopy.

pub mod message;
pub mod request;

pub use message::*;
pub use request::*;
