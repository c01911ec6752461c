use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{dto::section::SectionSummary, state::run_actor::RunAction};

/// Messages accepted from run WebSocket clients.
#[derive(Debug, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RunInboundMessage {
    /// Broadcast the current state.
    Status,
    /// Restart from the first section.
    Start,
    /// Freeze the countdown.
    Pause,
    /// Continue a frozen countdown.
    Resume,
    /// Jump to a section index.
    Step {
        /// Target index; required.
        #[serde(default)]
        step: Option<i32>,
    },
    /// Any other `action` value.
    #[serde(other)]
    Unknown,
}

/// Reasons an inbound frame cannot be turned into a run command.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame is not a JSON object with a string `action`.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The `action` value is not one of the known commands.
    #[error("command not recognized")]
    UnrecognizedAction,
    /// A `step` action arrived without a target.
    #[error("step action requires a `step` value")]
    MissingStep,
}

impl TryFrom<RunInboundMessage> for RunAction {
    type Error = CodecError;

    fn try_from(message: RunInboundMessage) -> Result<Self, Self::Error> {
        match message {
            RunInboundMessage::Status => Ok(RunAction::Status),
            RunInboundMessage::Start => Ok(RunAction::Start),
            RunInboundMessage::Pause => Ok(RunAction::Pause),
            RunInboundMessage::Resume => Ok(RunAction::Resume),
            RunInboundMessage::Step { step: Some(target) } => Ok(RunAction::Step { target }),
            RunInboundMessage::Step { step: None } => Err(CodecError::MissingStep),
            RunInboundMessage::Unknown => Err(CodecError::UnrecognizedAction),
        }
    }
}

/// Decode one inbound frame (text or binary) into a run command.
pub fn decode_command(payload: &[u8]) -> Result<RunAction, CodecError> {
    let message: RunInboundMessage = serde_json::from_slice(payload)?;
    message.try_into()
}

/// Whether the countdown is currently moving.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    /// Counting down.
    Running,
    /// Idle, paused or finished.
    Stopped,
}

/// State pushed to run subscribers after every observable change.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct RunSnapshot {
    /// Whether the countdown is moving.
    pub state: RunningState,
    /// Current section; null only when the presentation has no sections.
    pub step: Option<SectionSummary>,
    /// Milliseconds left on the current section.
    pub ms_left: i64,
    /// Present on replies to a rejected command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSnapshot {
    /// Attach the reason a command was rejected.
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Reply sent to the originating client when its frame could not be decoded.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Why the frame was rejected.
    pub error: String,
}

impl From<CodecError> for ErrorResponse {
    fn from(value: CodecError) -> Self {
        Self {
            error: value.to_string(),
        }
    }
}
