//! # dbward - Trust and Workflow Core for Database Assistants
//!
//! The security core behind a natural-language database assistant:
//! - **Vault**: encrypted, time-bounded session registry for connection credentials
//! - **Workflow**: schema-change proposals gated behind an approval pipeline
//! - **Audit**: append-only, capacity-bounded trail of security-relevant actions
//! - **Reaper**: background reclamation of expired sessions
//!
//! Transport, database drivers, and text-generation models live outside this
//! crate and plug in through the traits in [`connectors`].
//!
//! ## Quick Start
//!
//! ```rust
//! use dbward::audit::AuditTrail;
//! use dbward::vault::SessionVault;
//!
//! let vault = SessionVault::default();
//! let session = vault.create("user-1", "postgres://db.example.neon.tech/app", "Neon");
//!
//! let trail = AuditTrail::default();
//! trail.log_session_create("user-1", session.as_str(), "Neon");
//! assert_eq!(trail.len(), 1);
//! ```

pub mod audit;
pub mod connectors;
pub mod core;
pub mod reaper;
pub mod system;
pub mod vault;
pub mod workflow;

pub use crate::core::error::{Error, ErrorKind, Result};
