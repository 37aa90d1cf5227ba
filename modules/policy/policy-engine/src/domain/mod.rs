//! Domain logic of the policy engine.

pub(crate) mod catalog;
pub(crate) mod compiler;
pub(crate) mod evaluator;
pub mod service;
pub mod token;
