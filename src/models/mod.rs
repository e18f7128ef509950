//! Domain model module declarations.

pub mod agent;
pub mod message;
pub mod tool;
