#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy engine
//!
//! The implementation behind [`policy_sdk`]'s contracts:
//!
//! - [`PolicyService`] - the decision point ([`policy_sdk::PolicyClient`])
//! - [`TokenService`] - token-scoped guest access
//!   ([`policy_sdk::TokenAccessResolver`])
//! - [`PrincipalResolver`] - credentials to [`trova_security::Principal`]
//! - [`TracingAuditSink`], [`MemoryAuditSink`] - audit destinations
//! - [`InMemoryRelationshipStore`] - reference store for tests and embedders
//! - [`PolicyConfig`] - timeouts and token lifetime
//!
//! Wiring:
//!
//! ```
//! use std::sync::Arc;
//! use policy_engine::{
//!     InMemoryRelationshipStore, PolicyConfig, PolicyService, TracingAuditSink,
//! };
//!
//! let store = Arc::new(InMemoryRelationshipStore::new());
//! let policy = PolicyService::new(
//!     store,
//!     Arc::new(TracingAuditSink::new()),
//!     PolicyConfig::default(),
//! );
//! ```

pub mod audit;
pub mod config;
pub mod domain;
pub mod infra;
pub mod resolver;

pub use audit::{MemoryAuditSink, TracingAuditSink};
pub use config::PolicyConfig;
pub use domain::service::PolicyService;
pub use domain::token::TokenService;
pub use infra::memory::InMemoryRelationshipStore;
pub use resolver::{Credentials, PrincipalResolver};
