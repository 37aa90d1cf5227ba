#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod access_scope;
pub mod principal;

pub use access_scope::{AccessScope, RowProperty, ScopeConstraint, ScopeFilter, ScopeValue};
pub use principal::{Principal, PrincipalKind};
