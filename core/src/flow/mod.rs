// crafthub-checkout/src/flow/mod.rs

//! A small asynchronous step engine.
//!
//! A [`Flow`] is an ordered list of stages. Each stage owns `before`, `on` and
//! `after` handler lists that operate on a [`SharedState`]. The checkout
//! reconciler is expressed as one of these flows.

pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod state;

pub use control::{FlowControl, FlowOutcome};
pub use definition::{Flow, Handler, SkipCondition};
pub use state::SharedState;
