// crafthub-checkout/src/flow/execution.rs

//! `Flow::run()`: executes the stages in declared order.

use crate::error::FlowError;
use crate::flow::control::{FlowControl, FlowOutcome};
use crate::flow::definition::{Flow, Handler};
use crate::flow::state::SharedState;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{event, instrument, Instrument, Level};

impl<S, T, E> Flow<S, T, E>
where
  S: Copy + Eq + Hash + Debug + Send + Sync + 'static,
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every stage against `state`.
  ///
  /// Returns `Halted` as soon as any handler asks for it, and returns the first
  /// handler error unchanged. A stage without any handler fails the run with
  /// [`FlowError::HandlerMissing`].
  #[instrument(name = "Flow::run", skip_all, fields(flow = self.name, num_stages = self.stages.len()), err(Display))]
  pub async fn run(&self, state: SharedState<T>) -> Result<FlowOutcome, E> {
    event!(Level::DEBUG, "Flow execution starting.");

    for (stage_idx, stage) in self.stages.iter().copied().enumerate() {
      if let Some(condition) = self.skip_if.get(&stage) {
        let skip = condition(&*state.read());
        if skip {
          event!(Level::DEBUG, ?stage, "Stage skipped by its skip condition.");
          continue;
        }
      }

      if !self.has_handlers(stage) {
        event!(Level::ERROR, ?stage, "Stage has no handlers.");
        return Err(E::from(FlowError::HandlerMissing {
          flow: self.name,
          stage: format!("{:?}", stage),
        }));
      }

      let stage_span = tracing::info_span!("flow_stage", stage = ?stage, stage_index = stage_idx);
      let outcome = self
        .run_stage(stage, &state)
        .instrument(stage_span)
        .await?;
      if outcome == FlowControl::Halt {
        event!(Level::INFO, ?stage, "Flow halted by a handler.");
        return Ok(FlowOutcome::Halted);
      }
    }

    event!(Level::DEBUG, "Flow execution completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn run_stage(&self, stage: S, state: &SharedState<T>) -> Result<FlowControl, E> {
    for (phase, table) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = table.get(&stage) {
        if run_handlers(phase, handlers, state).await? == FlowControl::Halt {
          return Ok(FlowControl::Halt);
        }
      }
    }
    Ok(FlowControl::Continue)
  }
}

async fn run_handlers<T, E>(phase: &'static str, handlers: &[Handler<T, E>], state: &SharedState<T>) -> Result<FlowControl, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler) in handlers.iter().enumerate() {
    match handler(state.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Halt) => {
        event!(Level::DEBUG, phase, handler_index = handler_idx, "Handler requested halt.");
        return Ok(FlowControl::Halt);
      }
      Err(e) => {
        event!(Level::ERROR, phase, handler_index = handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(FlowControl::Continue)
}
