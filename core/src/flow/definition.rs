// crafthub-checkout/src/flow/definition.rs

//! Contains the `Flow<S, T, E>` struct and its construction.

use crate::error::FlowError;
use crate::flow::control::FlowControl;
use crate::flow::state::SharedState;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;

/// A stage handler.
///
/// Receives a clone of the flow's [`SharedState`] and resolves to the control
/// signal for the run, or to the flow's error type `E`.
pub type Handler<T, E> =
  Box<dyn Fn(SharedState<T>) -> Pin<Box<dyn Future<Output = Result<FlowControl, E>> + Send>> + Send + Sync>;

/// Predicate evaluated before a stage runs. When it returns `true` the stage is
/// skipped, handlers included.
pub type SkipCondition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// An ordered, named sequence of stages.
///
/// - `S` labels the stages (usually a fieldless enum).
/// - `T` is the data every handler operates on.
/// - `E` is what handlers fail with; it must absorb engine errors
///   (`From<FlowError>`), e.g. a stage that was declared but never given a handler.
pub struct Flow<S, T, E>
where
  S: Copy + Eq + Hash + Debug + Send + Sync + 'static,
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: &'static str,
  pub(crate) stages: Vec<S>,
  pub(crate) before: HashMap<S, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<S, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<S, Vec<Handler<T, E>>>,
  pub(crate) skip_if: HashMap<S, SkipCondition<T>>,
}

impl<S, T, E> Flow<S, T, E>
where
  S: Copy + Eq + Hash + Debug + Send + Sync + 'static,
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares a flow with its stages in execution order.
  ///
  /// Panics on a duplicated stage: that is a setup bug, not a runtime condition.
  pub fn new(name: &'static str, stages: &[S]) -> Self {
    for (idx, stage) in stages.iter().enumerate() {
      if stages[..idx].contains(stage) {
        panic!("Flow setup error: stage {:?} declared twice in flow '{}'.", stage, name);
      }
    }

    Self {
      name,
      stages: stages.to_vec(),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      skip_if: HashMap::new(),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn stages(&self) -> &[S] {
    &self.stages
  }

  /// Skips `stage` whenever `condition` holds for the state at run time.
  /// Replaces any condition set earlier for the same stage.
  pub fn skip_if(&mut self, stage: S, condition: impl Fn(&T) -> bool + Send + Sync + 'static) {
    self.ensure_declared(stage);
    self.skip_if.insert(stage, Arc::new(condition));
  }

  pub(crate) fn ensure_declared(&self, stage: S) {
    if !self.stages.contains(&stage) {
      panic!(
        "Flow setup error: stage {:?} is not declared in flow '{}'.",
        stage, self.name
      );
    }
  }

  pub(crate) fn has_handlers(&self, stage: S) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(&stage).map_or(false, |handlers| !handlers.is_empty()))
  }
}
