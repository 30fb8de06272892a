//! API request handlers

mod events;
mod health;

pub use events::*;
pub use health::*;
