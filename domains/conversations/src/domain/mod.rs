//! Domain model: entities, state machine, and webhook event validation

pub mod entities;
pub mod events;
pub mod state;
