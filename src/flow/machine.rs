//! The recipient-facing state machine.
//!
//! ```text
//! Narrating(0) --advance--> ... Narrating(n-1) --advance--> Deciding(offset) --accept--> Accepted
//! ```
//!
//! An empty step sequence starts directly in `Deciding` at the zero offset.
//! `Accepted` is terminal: the index and offset are frozen and every further
//! input leaves the state untouched.

use std::sync::Arc;

use thiserror::Error;

use super::evasion::{compute_offset, Bounds, Offset, Point};
use crate::models::{DecisionCopy, FlowConfig, FlowStep, SuccessCopy};

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowPhase {
    Narrating { index: usize },
    Deciding { offset: Offset },
    Accepted,
}

impl FlowPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Narrating { .. } => "narrating",
            Self::Deciding { .. } => "deciding",
            Self::Accepted => "accepted",
        }
    }
}

/// An input that is not valid in the current phase. The flow is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} while {phase}")]
pub struct FlowError {
    pub action: &'static str,
    pub phase: &'static str,
}

/// What the renderer should draw. Derived from state alone.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowView<'a> {
    Narrating {
        step: &'a FlowStep,
        index: usize,
        total: usize,
    },
    Deciding {
        decision: &'a DecisionCopy,
        decline_offset: Offset,
    },
    Accepted {
        success: &'a SuccessCopy,
    },
}

/// A single flow instance. Each recipient session owns its own.
#[derive(Debug, Clone)]
pub struct ConfessionFlow {
    config: Arc<FlowConfig>,
    phase: FlowPhase,
}

impl ConfessionFlow {
    pub fn new(config: impl Into<Arc<FlowConfig>>) -> Self {
        let config = config.into();
        let phase = if config.steps.is_empty() {
            FlowPhase::Deciding {
                offset: Offset::ZERO,
            }
        } else {
            FlowPhase::Narrating { index: 0 }
        };
        Self { config, phase }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn step_count(&self) -> usize {
        self.config.steps.len()
    }

    /// Index of the step on screen; equals the step count once the sequence
    /// is exhausted.
    pub fn current_index(&self) -> usize {
        match self.phase {
            FlowPhase::Narrating { index } => index,
            FlowPhase::Deciding { .. } | FlowPhase::Accepted => self.step_count(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.phase, FlowPhase::Accepted)
    }

    /// Current displacement of the decline control, only while deciding.
    pub fn decline_offset(&self) -> Option<Offset> {
        match self.phase {
            FlowPhase::Deciding { offset } => Some(offset),
            _ => None,
        }
    }

    /// Move to the next step, or to the decision screen after the last one.
    pub fn advance(&mut self) -> Result<FlowPhase, FlowError> {
        let FlowPhase::Narrating { index } = self.phase else {
            return Err(self.reject("advance"));
        };

        let next = index + 1;
        self.phase = if next >= self.step_count() {
            FlowPhase::Deciding {
                offset: Offset::ZERO,
            }
        } else {
            FlowPhase::Narrating { index: next }
        };
        tracing::debug!(from = index, to = ?self.phase, "Flow advanced");
        Ok(self.phase)
    }

    /// Recompute the decline control's offset for a pointer move.
    ///
    /// Ignored outside the decision screen. Each call replaces the previous
    /// offset outright; nothing is queued.
    pub fn report_pointer_move(&mut self, pointer: Point, container: Bounds) -> Option<Offset> {
        let FlowPhase::Deciding { offset } = &mut self.phase else {
            return None;
        };
        *offset = compute_offset(pointer, container);
        Some(*offset)
    }

    /// Accept, whatever the decline control's position.
    pub fn accept(&mut self) -> Result<(), FlowError> {
        if !matches!(self.phase, FlowPhase::Deciding { .. }) {
            return Err(self.reject("accept"));
        }
        self.phase = FlowPhase::Accepted;
        tracing::debug!("Flow accepted");
        Ok(())
    }

    /// A click that actually landed on the decline control.
    ///
    /// Declining has no outcome: the control stays reachable but the click is
    /// a no-op and the recipient remains on the decision screen.
    pub fn decline(&self) {
        tracing::debug!(phase = self.phase.name(), "Decline ignored");
    }

    pub fn view(&self) -> FlowView<'_> {
        match self.phase {
            FlowPhase::Narrating { index } => FlowView::Narrating {
                step: &self.config.steps[index],
                index,
                total: self.step_count(),
            },
            FlowPhase::Deciding { offset } => FlowView::Deciding {
                decision: &self.config.decision,
                decline_offset: offset,
            },
            FlowPhase::Accepted => FlowView::Accepted {
                success: &self.config.success,
            },
        }
    }

    fn reject(&self, action: &'static str) -> FlowError {
        FlowError {
            action,
            phase: self.phase.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: Bounds = Bounds::new(400.0, 300.0);

    fn flow_with_steps(n: usize) -> ConfessionFlow {
        let mut config = FlowConfig::question_only();
        config.steps = (0..n)
            .map(|i| FlowStep::new(format!("Step {i}"), format!("Body {i}")))
            .collect();
        ConfessionFlow::new(config)
    }

    #[test]
    fn starts_narrating_at_first_step() {
        let flow = flow_with_steps(3);
        assert_eq!(flow.phase(), FlowPhase::Narrating { index: 0 });
        assert_eq!(flow.current_index(), 0);
        assert!(!flow.is_accepted());
    }

    #[test]
    fn empty_sequence_starts_deciding_at_origin() {
        let flow = ConfessionFlow::new(FlowConfig::question_only());
        assert_eq!(
            flow.phase(),
            FlowPhase::Deciding {
                offset: Offset::ZERO
            }
        );
        assert_eq!(flow.current_index(), 0);
    }

    #[test]
    fn reaches_decision_exactly_on_last_advance() {
        for n in 1..=5 {
            let mut flow = flow_with_steps(n);
            for i in 1..n {
                assert_eq!(flow.advance().unwrap(), FlowPhase::Narrating { index: i });
            }
            assert_eq!(
                flow.advance().unwrap(),
                FlowPhase::Deciding {
                    offset: Offset::ZERO
                }
            );
            assert_eq!(flow.current_index(), n);
        }
    }

    #[test]
    fn advance_outside_narrating_is_rejected() {
        let mut flow = flow_with_steps(1);
        flow.advance().unwrap();
        let err = flow.advance().unwrap_err();
        assert_eq!(err.to_string(), "cannot advance while deciding");
        assert_eq!(flow.current_index(), 1);
    }

    #[test]
    fn pointer_moves_are_ignored_while_narrating() {
        let mut flow = flow_with_steps(2);
        assert_eq!(flow.report_pointer_move(Point::new(10.0, 10.0), CARD), None);
        assert_eq!(flow.phase(), FlowPhase::Narrating { index: 0 });
    }

    #[test]
    fn last_pointer_move_wins() {
        let mut flow = flow_with_steps(0);
        flow.report_pointer_move(Point::new(10.0, 10.0), CARD);
        let latest = flow.report_pointer_move(Point::new(390.0, 290.0), CARD);
        assert_eq!(latest, Some(Offset::new(-100.0, -50.0)));
        assert_eq!(flow.decline_offset(), Some(Offset::new(-100.0, -50.0)));
    }

    #[test]
    fn accept_works_regardless_of_offset() {
        let mut flow = flow_with_steps(0);
        flow.report_pointer_move(Point::new(10.0, 10.0), CARD);
        flow.accept().unwrap();
        assert!(flow.is_accepted());
        assert_eq!(flow.decline_offset(), None);
    }

    #[test]
    fn accept_is_only_valid_while_deciding() {
        let mut flow = flow_with_steps(2);
        assert!(flow.accept().is_err());
        assert_eq!(flow.phase(), FlowPhase::Narrating { index: 0 });
    }

    #[test]
    fn accepted_is_terminal() {
        let mut flow = flow_with_steps(1);
        flow.advance().unwrap();
        flow.accept().unwrap();

        assert!(flow.advance().is_err());
        assert_eq!(flow.report_pointer_move(Point::new(1.0, 1.0), CARD), None);
        assert!(flow.accept().is_err());
        flow.decline();

        assert_eq!(flow.phase(), FlowPhase::Accepted);
        assert_eq!(flow.current_index(), 1);
    }

    #[test]
    fn decline_changes_nothing() {
        let mut flow = flow_with_steps(0);
        flow.report_pointer_move(Point::new(10.0, 10.0), CARD);
        let before = flow.phase();
        flow.decline();
        assert_eq!(flow.phase(), before);
    }

    #[test]
    fn view_projects_each_phase() {
        let mut flow = flow_with_steps(1);
        match flow.view() {
            FlowView::Narrating { step, index, total } => {
                assert_eq!(step.title, "Step 0");
                assert_eq!((index, total), (0, 1));
            }
            other => panic!("unexpected view {other:?}"),
        }

        flow.advance().unwrap();
        flow.report_pointer_move(Point::new(10.0, 10.0), CARD);
        match flow.view() {
            FlowView::Deciding {
                decision,
                decline_offset,
            } => {
                assert_eq!(decision.accept_label, "Iya");
                assert_eq!(decline_offset, Offset::new(100.0, 50.0));
            }
            other => panic!("unexpected view {other:?}"),
        }

        flow.accept().unwrap();
        assert!(matches!(
            flow.view(),
            FlowView::Accepted { success } if success.title == "I Love You! ❤️"
        ));
    }
}
