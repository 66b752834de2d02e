// crafthub-checkout/src/flow/control.rs

//! Signals for controlling flow execution and the outcome of a run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Keep going with the remaining handlers and stages.
  Continue,
  /// Stop immediately. Nothing after the current handler runs.
  Halt,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every stage ran to the end.
  Completed,
  /// A handler returned [`FlowControl::Halt`].
  Halted,
}
