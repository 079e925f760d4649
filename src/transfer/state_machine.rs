use crate::transfer::error::{QueueError, QueueResult};
use crate::transfer::types::TransferStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    Start,
    Pause,
    Resume,
    Cancel,
    Complete,
    Fail,
    /// The destination already exists; wait for a decision.
    Conflict,
    ResolveConflict,
}

impl JobTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobTransition::Start => "start",
            JobTransition::Pause => "pause",
            JobTransition::Resume => "resume",
            JobTransition::Cancel => "cancel",
            JobTransition::Complete => "complete",
            JobTransition::Fail => "fail",
            JobTransition::Conflict => "raise a conflict on",
            JobTransition::ResolveConflict => "resolve a conflict on",
        }
    }
}

/// The only legal edges of a job's lifecycle.
pub struct JobStateMachine;

impl JobStateMachine {
    pub fn transition(from: TransferStatus, event: &JobTransition) -> QueueResult<TransferStatus> {
        use TransferStatus::*;

        let to = match (from, event) {
            (Pending, JobTransition::Start) => Active,

            (Active, JobTransition::Pause) => Paused,
            (Paused, JobTransition::Resume) => Active,

            (Active, JobTransition::Conflict) => Paused,
            (Paused, JobTransition::ResolveConflict) => Active,

            (Pending | Active | Paused, JobTransition::Cancel) => Cancelled,

            (Active, JobTransition::Complete) => Completed,
            (Active, JobTransition::Fail) => Error,

            _ => {
                return Err(QueueError::InvalidTransition {
                    from,
                    event: event.as_str(),
                });
            }
        };

        Ok(to)
    }

    pub fn can(from: TransferStatus, event: &JobTransition) -> bool {
        Self::transition(from, event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransferStatus::*;

    const ALL_STATUSES: [TransferStatus; 6] = [Pending, Active, Paused, Completed, Error, Cancelled];

    fn all_events() -> Vec<JobTransition> {
        vec![
            JobTransition::Start,
            JobTransition::Pause,
            JobTransition::Resume,
            JobTransition::Cancel,
            JobTransition::Complete,
            JobTransition::Fail,
            JobTransition::Conflict,
            JobTransition::ResolveConflict,
        ]
    }

    #[test]
    fn test_only_listed_edges_are_legal() {
        let legal = [
            (Pending, JobTransition::Start, Active),
            (Active, JobTransition::Pause, Paused),
            (Paused, JobTransition::Resume, Active),
            (Active, JobTransition::Conflict, Paused),
            (Paused, JobTransition::ResolveConflict, Active),
            (Pending, JobTransition::Cancel, Cancelled),
            (Active, JobTransition::Cancel, Cancelled),
            (Paused, JobTransition::Cancel, Cancelled),
            (Active, JobTransition::Complete, Completed),
            (Active, JobTransition::Fail, Error),
        ];

        for from in ALL_STATUSES {
            for event in all_events() {
                let expected = legal
                    .iter()
                    .find(|(f, e, _)| *f == from && *e == event)
                    .map(|(_, _, to)| *to);
                let actual = JobStateMachine::transition(from, &event).ok();
                assert_eq!(actual, expected, "{from} --{}-->", event.as_str());
            }
        }
    }

    #[test]
    fn test_terminal_states_never_leave() {
        for from in [Completed, Error, Cancelled] {
            for event in all_events() {
                assert!(!JobStateMachine::can(from, &event));
            }
        }
    }

    #[test]
    fn test_error_message() {
        let err = JobStateMachine::transition(Completed, &JobTransition::Pause).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot pause a completed job"
        );
    }
}
