use std::fmt;

use forksync_chain::{ChainError, ImpersonatedActor};
use forksync_core::{Address, FinalizeError, PoolIdentity};
use tracing::{error, info, warn};

/// Which pool operation committed the corrected balances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitPath {
    /// `sync()`: reserves re-derived from balances.
    Sync,
    /// `skim(recipient)`: balance above reserves sent to the fallback recipient.
    Skim,
}

impl fmt::Display for CommitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Skim => f.write_str("skim"),
        }
    }
}

/// Two-step commit: primary first, the secondary only after a primary failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalizeState {
    NotStarted,
    PrimaryAttempted(Result<(), ChainError>),
    Finalized {
        path: CommitPath,
        primary_error: Option<ChainError>,
    },
    Failed(FinalizeError),
}

impl FinalizeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized { .. } | Self::Failed(_))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Finalized { .. })
    }

    pub fn commit_path(&self) -> Option<CommitPath> {
        match self {
            Self::Finalized { path, .. } => Some(*path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FinalizeError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Terminal failure for a run that never obtained the pool actor, so
    /// neither commit could be sent.
    pub fn without_actor(pool: Address, cause: &ChainError) -> Self {
        let err = FinalizeError {
            primary: format!("cannot act as {pool}: {cause}"),
            secondary: "not attempted".into(),
        };
        error!(pool = %pool, error = %err, "pool commit skipped");
        Self::Failed(err)
    }
}

/// Drive the commit state machine to a terminal state.
pub async fn finalize(
    actor: &ImpersonatedActor,
    identity: &PoolIdentity,
    fallback_recipient: Address,
) -> FinalizeState {
    let pool = identity.pool();
    let mut state = FinalizeState::NotStarted;
    while !state.is_terminal() {
        state = match state {
            FinalizeState::NotStarted => {
                FinalizeState::PrimaryAttempted(actor.sync(pool).await.map(|_| ()))
            }
            FinalizeState::PrimaryAttempted(Ok(())) => {
                info!(pool = %pool, "pool accounting committed via sync");
                FinalizeState::Finalized {
                    path: CommitPath::Sync,
                    primary_error: None,
                }
            }
            FinalizeState::PrimaryAttempted(Err(primary)) => {
                warn!(
                    pool = %pool,
                    error = %primary,
                    recipient = %fallback_recipient,
                    "sync failed; falling back to skim"
                );
                match actor.skim(pool, fallback_recipient).await {
                    Ok(_) => {
                        warn!(
                            pool = %pool,
                            recipient = %fallback_recipient,
                            "pool accounting committed via skim fallback"
                        );
                        FinalizeState::Finalized {
                            path: CommitPath::Skim,
                            primary_error: Some(primary),
                        }
                    }
                    Err(secondary) => {
                        let err = FinalizeError {
                            primary: primary.to_string(),
                            secondary: secondary.to_string(),
                        };
                        error!(pool = %pool, error = %err, "pool commit failed");
                        FinalizeState::Failed(err)
                    }
                }
            }
            terminal => terminal,
        };
    }
    state
}
