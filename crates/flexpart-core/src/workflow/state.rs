//! States of the multi-date workflow and the pure transition table over them.

use crate::domain::{FlexpartError, WorkflowResult};
use crate::models::DispatchGates;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    AwaitDate,
    StageMeteoRegional,
    RunRegional,
    StageMeteoGlobal,
    RunGlobal,
    RunOfflineContinuation,
    PostProcess,
    Done,
}

impl WorkflowState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitDate => "await_date",
            Self::StageMeteoRegional => "stage_meteo_regional",
            Self::RunRegional => "run_regional",
            Self::StageMeteoGlobal => "stage_meteo_global",
            Self::RunGlobal => "run_global",
            Self::RunOfflineContinuation => "run_offline_continuation",
            Self::PostProcess => "post_process",
            Self::Done => "done",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator observed while executing the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    DatesRemaining,
    DatesExhausted,
    StagingSucceeded,
    StagingFailed,
    /// A simulation or post-processing job finished ok. Failed jobs never
    /// reach the table: they abort the workflow.
    JobFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepContext {
    pub gates: DispatchGates,
    /// A primary simulation already finished for the current date.
    pub primary_done: bool,
}

impl StepContext {
    /// The next global staging/run pair serves an offline continuation.
    pub const fn continuation_pending(&self) -> bool {
        self.primary_done && self.gates.offline_continuation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: WorkflowState,
    pub advance_index: bool,
}

impl Transition {
    const fn to(next: WorkflowState) -> Self {
        Self {
            next,
            advance_index: false,
        }
    }

    const fn next_date() -> Self {
        Self {
            next: WorkflowState::AwaitDate,
            advance_index: true,
        }
    }
}

pub fn transition(
    state: WorkflowState,
    context: StepContext,
    event: StepEvent,
) -> WorkflowResult<Transition> {
    use StepEvent as E;
    use WorkflowState as S;

    let gates = context.gates;
    let transition = match (state, event) {
        (S::AwaitDate, E::DatesExhausted) => Transition::to(S::Done),
        (S::AwaitDate, E::DatesRemaining) if gates.run_regional => {
            Transition::to(S::StageMeteoRegional)
        }
        (S::AwaitDate, E::DatesRemaining) if gates.run_global => Transition::to(S::StageMeteoGlobal),
        (S::AwaitDate, E::DatesRemaining) => Transition::next_date(),

        (S::StageMeteoRegional, E::StagingSucceeded) => Transition::to(S::RunRegional),
        (S::StageMeteoGlobal, E::StagingSucceeded) if context.continuation_pending() => {
            Transition::to(S::RunOfflineContinuation)
        }
        (S::StageMeteoGlobal, E::StagingSucceeded) => Transition::to(S::RunGlobal),
        (S::StageMeteoRegional | S::StageMeteoGlobal, E::StagingFailed) => Transition::next_date(),

        (S::RunRegional, E::JobFinished) if gates.run_global => Transition::to(S::StageMeteoGlobal),
        (S::RunGlobal, E::JobFinished) if gates.offline_continuation => {
            Transition::to(S::StageMeteoGlobal)
        }
        (S::RunRegional | S::RunGlobal | S::RunOfflineContinuation, E::JobFinished) => {
            Transition::to(S::PostProcess)
        }
        (S::PostProcess, E::JobFinished) => Transition::next_date(),

        (state, event) => {
            return Err(FlexpartError::internal(
                "SYS.WORKFLOW_TRANSITION",
                format!("no transition from '{state}' on {event:?}"),
            ));
        }
    };
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::{StepContext, StepEvent, Transition, WorkflowState, transition};
    use crate::models::DispatchGates;

    fn context(run_regional: bool, run_global: bool, offline: bool, primary_done: bool) -> StepContext {
        StepContext {
            gates: DispatchGates {
                run_regional,
                run_global,
                offline_continuation: offline,
            },
            primary_done,
        }
    }

    fn next(state: WorkflowState, context: StepContext, event: StepEvent) -> Transition {
        transition(state, context, event).expect("transition should exist")
    }

    #[test]
    fn exhausted_dates_finish_the_workflow() {
        let step = next(
            WorkflowState::AwaitDate,
            context(true, false, false, false),
            StepEvent::DatesExhausted,
        );
        assert_eq!(step.next, WorkflowState::Done);
        assert!(!step.advance_index);
    }

    #[test]
    fn regional_family_is_staged_before_global() {
        let step = next(
            WorkflowState::AwaitDate,
            context(true, true, false, false),
            StepEvent::DatesRemaining,
        );
        assert_eq!(step.next, WorkflowState::StageMeteoRegional);

        let step = next(
            WorkflowState::AwaitDate,
            context(false, true, false, false),
            StepEvent::DatesRemaining,
        );
        assert_eq!(step.next, WorkflowState::StageMeteoGlobal);
    }

    #[test]
    fn no_selected_family_skips_the_date() {
        let step = next(
            WorkflowState::AwaitDate,
            context(false, false, true, false),
            StepEvent::DatesRemaining,
        );
        assert_eq!(step.next, WorkflowState::AwaitDate);
        assert!(step.advance_index);
    }

    #[test]
    fn staging_failure_skips_to_next_date() {
        for state in [WorkflowState::StageMeteoRegional, WorkflowState::StageMeteoGlobal] {
            let step = next(state, context(true, true, true, true), StepEvent::StagingFailed);
            assert_eq!(step.next, WorkflowState::AwaitDate);
            assert!(step.advance_index);
        }
    }

    #[test]
    fn regional_run_chains_into_offline_continuation() {
        let gates = context(true, true, true, false);
        let step = next(WorkflowState::StageMeteoRegional, gates, StepEvent::StagingSucceeded);
        assert_eq!(step.next, WorkflowState::RunRegional);

        let step = next(WorkflowState::RunRegional, gates, StepEvent::JobFinished);
        assert_eq!(step.next, WorkflowState::StageMeteoGlobal);

        let done = context(true, true, true, true);
        let step = next(WorkflowState::StageMeteoGlobal, done, StepEvent::StagingSucceeded);
        assert_eq!(step.next, WorkflowState::RunOfflineContinuation);

        let step = next(WorkflowState::RunOfflineContinuation, done, StepEvent::JobFinished);
        assert_eq!(step.next, WorkflowState::PostProcess);
        assert!(!step.advance_index);
    }

    #[test]
    fn global_primary_without_offline_goes_to_post_processing() {
        let gates = context(false, true, false, false);
        let step = next(WorkflowState::StageMeteoGlobal, gates, StepEvent::StagingSucceeded);
        assert_eq!(step.next, WorkflowState::RunGlobal);
        let step = next(WorkflowState::RunGlobal, context(false, true, false, true), StepEvent::JobFinished);
        assert_eq!(step.next, WorkflowState::PostProcess);
    }

    #[test]
    fn global_primary_with_offline_stages_again_for_continuation() {
        let step = next(
            WorkflowState::RunGlobal,
            context(false, true, true, true),
            StepEvent::JobFinished,
        );
        assert_eq!(step.next, WorkflowState::StageMeteoGlobal);
    }

    #[test]
    fn post_processing_advances_index_by_one() {
        let step = next(
            WorkflowState::PostProcess,
            context(true, false, false, true),
            StepEvent::JobFinished,
        );
        assert_eq!(step.next, WorkflowState::AwaitDate);
        assert!(step.advance_index);
    }

    #[test]
    fn undefined_pairs_are_internal_errors() {
        let error = transition(
            WorkflowState::Done,
            StepContext::default(),
            StepEvent::JobFinished,
        )
        .expect_err("done is terminal");
        assert_eq!(error.placeholder(), "SYS.WORKFLOW_TRANSITION");

        assert!(
            transition(
                WorkflowState::RunRegional,
                StepContext::default(),
                StepEvent::StagingSucceeded
            )
            .is_err()
        );
    }
}
