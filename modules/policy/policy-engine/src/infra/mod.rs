//! Infrastructure implementations of the sdk contracts.

pub mod memory;
