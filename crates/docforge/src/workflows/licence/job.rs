use serde_json::Value;

use super::editing::{EditRequest, JobStatus, LayerEdit, SubmittedJob};
use super::storage::AssetReference;

/// Lifecycle of one remote edit: `Submitted -> Polling -> {Succeeded | Failed}`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitted,
    Polling { attempts: u32, last_status: String },
    Succeeded(AssetReference),
    Failed(Value),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JobTransitionError {
    #[error("job at {status_url} already reached a terminal state")]
    AlreadyTerminal { status_url: String },
}

/// One submitted edit job, owned by a single orchestrator invocation.
#[derive(Debug, Clone)]
pub struct EditJob {
    input_refs: Vec<AssetReference>,
    field_edits: Vec<LayerEdit>,
    output_target: AssetReference,
    status_url: String,
    state: JobState,
    attempts: u32,
}

impl EditJob {
    pub fn submitted(request: &EditRequest, submitted: SubmittedJob) -> Self {
        let mut input_refs = vec![request.template.clone()];
        input_refs.extend(request.edits.iter().filter_map(|edit| match edit {
            LayerEdit::Image { source, .. } => Some(source.clone()),
            LayerEdit::Text { .. } => None,
        }));

        Self {
            input_refs,
            field_edits: request.edits.clone(),
            output_target: request.output_target.clone(),
            status_url: submitted.status_url,
            state: JobState::Submitted,
            attempts: 0,
        }
    }

    /// Applies one status report. A success without an explicit output falls
    /// back to the output target the job was submitted with.
    pub fn observe(&mut self, status: JobStatus) -> Result<&JobState, JobTransitionError> {
        if self.state.is_terminal() {
            return Err(JobTransitionError::AlreadyTerminal {
                status_url: self.status_url.clone(),
            });
        }

        self.attempts += 1;
        self.state = match status {
            JobStatus::InProgress(label) => JobState::Polling {
                attempts: self.attempts,
                last_status: label,
            },
            JobStatus::Succeeded { output } => {
                JobState::Succeeded(output.unwrap_or_else(|| self.output_target.clone()))
            }
            JobStatus::Failed { detail } => JobState::Failed(detail),
        };
        Ok(&self.state)
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn input_refs(&self) -> &[AssetReference] {
        &self.input_refs
    }

    pub fn field_edits(&self) -> &[LayerEdit] {
        &self.field_edits
    }

    pub fn output_target(&self) -> &AssetReference {
        &self.output_target
    }
}
