//! Job-status tracking for asynchronous page transformations.
//!
//! The [`registry::JobRegistry`] keeps one record per process inside a
//! [`cache::TtlCache`] and is the only source of truth for page state.
//! [`service::JobService`] is the surface the HTTP layer talks to: it
//! registers pages and hands each one to the [`runner::TaskRunner`], which
//! drives a [`pipeline::PagePipeline`] in the background. Polling goes
//! through the read-only [`status`] projector.
//!
//! External work (image fetch, face masking, synthesis, durable storage) is
//! reached through the traits in [`capability`].

pub mod cache;
pub mod capability;
pub mod convert;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod service;
pub mod status;
pub mod sweeper;
