//! Ports implemented by the infrastructure layer.

pub mod hash;
pub mod store;
