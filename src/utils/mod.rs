// Utility functions

pub mod logger;
pub mod naming;

pub use logger::*;
