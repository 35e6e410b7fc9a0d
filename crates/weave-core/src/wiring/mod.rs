//! # Weave Wiring
//!
//! Turns a populated [`FeatureRegistry`](crate::feature::FeatureRegistry)
//! into bus subscriptions ([`aggregate`]) and then drops every feature that
//! cannot be reached from the root interfaces ([`prune`]).
//!
//! Reachability is forward only: starting from `log` and `start`, every
//! feature bound to a visited interface is used, and every interface a used
//! feature emits is visited in turn.
pub mod aggregate;
pub mod prune;
pub mod trace;

pub use aggregate::{Bindings, wire};
pub use prune::prune;
pub use trace::Trace;
