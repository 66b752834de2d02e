// crafthub-checkout/src/flow/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::error::FlowError;
use crate::flow::control::FlowControl;
use crate::flow::definition::{Flow, Handler};
use crate::flow::state::SharedState;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<S, T, E> Flow<S, T, E>
where
  S: Copy + Eq + Hash + Debug + Send + Sync + 'static,
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a handler that runs before the `on` handlers of `stage`.
  ///
  /// The handler may fail with any error convertible into the flow's `E`.
  pub fn before<F, HandlerErr>(&mut self, stage: S, handler_fn: impl Fn(SharedState<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push(Phase::Before, stage, handler_fn);
  }

  /// Registers a main handler for `stage`.
  pub fn on<F, HandlerErr>(&mut self, stage: S, handler_fn: impl Fn(SharedState<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push(Phase::On, stage, handler_fn);
  }

  /// Registers a handler that runs after the `on` handlers of `stage`.
  pub fn after<F, HandlerErr>(&mut self, stage: S, handler_fn: impl Fn(SharedState<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push(Phase::After, stage, handler_fn);
  }

  fn push<F, HandlerErr>(&mut self, phase: Phase, stage: S, handler_fn: impl Fn(SharedState<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_declared(stage);
    let handler: Handler<T, E> = Box::new(move |state| {
      let fut = handler_fn(state);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });

    let table = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    table.entry(stage).or_default().push(handler);
    event!(Level::TRACE, flow = self.name, ?stage, ?phase, "Handler registered.");
  }
}
