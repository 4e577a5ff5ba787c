use serde::{Deserialize, Serialize};

use crate::{MonodeployError, MonodeployResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The publish state of a service or storage during one deployment attempt.
///
/// States only move forward: `NotStarted → InProgress → Verifying → Published | Failed`.
/// `Verifying` may be skipped and a state may jump straight to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// Nothing has happened yet.
    NotStarted,

    /// The pipeline is running.
    InProgress,

    /// The image is being verified locally.
    Verifying,

    /// The entry is part of the deployed state.
    Published,

    /// The pipeline failed for this entry.
    Failed,
}

/// The stage of the build and verify pipeline an entry is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// The pipeline has not started.
    NotStarted,

    /// Stale local instances are being stopped.
    Stopping,

    /// The image is being built.
    Building,

    /// The image is being booted locally and health checked.
    Verifying,

    /// The image is ready for upload.
    Ready,

    /// The pipeline failed.
    Failed,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PublishState {
    /// Returns `true` for `Published` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Verifying => 2,
            Self::Published | Self::Failed => 3,
        }
    }

    /// Moves to `next`, refusing to move backwards or out of a terminal state.
    ///
    /// Moving to the current state is a no-op.
    ///
    /// ## Examples
    ///
    /// ```
    /// use monodeploy::deploy::PublishState;
    ///
    /// let state = PublishState::NotStarted.advance(PublishState::InProgress).unwrap();
    /// let state = state.advance(PublishState::Published).unwrap();
    /// assert!(state.advance(PublishState::InProgress).is_err());
    /// ```
    pub fn advance(self, next: PublishState) -> MonodeployResult<PublishState> {
        if self == next {
            return Ok(self);
        }

        if self.is_terminal() || next.rank() <= self.rank() {
            return Err(MonodeployError::InvalidStateTransition {
                from: self,
                to: next,
            });
        }

        Ok(next)
    }
}

impl PipelineStage {
    /// Returns the publish state an entry moves to when it enters this stage, if any.
    pub fn publish_state(self) -> Option<PublishState> {
        match self {
            Self::Stopping | Self::Building => Some(PublishState::InProgress),
            Self::Verifying => Some(PublishState::Verifying),
            Self::Failed => Some(PublishState::Failed),
            Self::NotStarted | Self::Ready => None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
