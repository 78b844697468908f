//! Mirror identity-service user records into a reviewable file tree and back.
//!
//! The crate follows a ports-and-adapters layout:
//!
//! - [`domain`] holds the record model, the canonical document mapping, the
//!   comparator, and the [`domain::SyncOrchestrator`] together with the
//!   ports it drives.
//! - [`outbound`] implements those ports against the local filesystem and a
//!   JSON-backed identity store.
//! - [`inbound`] exposes the command-line surface.
//! - [`app`] wires adapters into an orchestrator from [`settings`].

pub mod app;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
