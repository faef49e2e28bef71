use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    DeletedVote, PollVotesResponse, ReconcileReport, RepairedOption, Vote,
};
use crate::store::{PollStore, StoreError};

/// Enforces at-most-one vote per (poll, voter) and keeps the denormalized
/// per-option counter in step with the vote rows. A vote is never left
/// recorded without its counter increment; compensation deletes the row
/// when the counter write fails.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn PollStore>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    pub async fn cast_vote(&self, poll_id: i64, option_id: i64, voter: Uuid) -> ApiResult<Vote> {
        if self.store.find_vote(poll_id, voter).await?.is_some() {
            return Err(ApiError::conflict("user has already voted on this poll"));
        }

        let option = self
            .store
            .get_option(option_id)
            .await?
            .ok_or_else(|| ApiError::validation("invalid option"))?;
        if option.poll_id != poll_id {
            return Err(ApiError::validation(
                "option does not belong to the specified poll",
            ));
        }

        let vote = match self.store.insert_vote(poll_id, option_id, voter).await {
            Ok(vote) => vote,
            // The application-level check above can race; the storage
            // constraint on (poll_id, user_id) is the authority.
            Err(StoreError::UniqueViolation) => {
                return Err(ApiError::conflict("user has already voted on this poll"));
            }
            Err(source) => return Err(ApiError::Internal(source)),
        };

        let current = match self.store.get_option(option_id).await {
            Ok(Some(option)) => option.vote_count,
            Ok(None) => {
                let source = StoreError::Storage("option row disappeared".into());
                return Err(self
                    .rollback_vote(vote.id, "failed to fetch current vote count", source)
                    .await);
            }
            Err(source) => {
                return Err(self
                    .rollback_vote(vote.id, "failed to fetch current vote count", source)
                    .await);
            }
        };

        if let Err(source) = self.store.set_option_count(option_id, current + 1).await {
            return Err(self
                .rollback_vote(vote.id, "failed to update vote count", source)
                .await);
        }

        info!(poll_id, option_id, vote_id = vote.id, "vote cast");
        Ok(vote)
    }

    async fn rollback_vote(
        &self,
        vote_id: i64,
        message: &'static str,
        source: StoreError,
    ) -> ApiError {
        match self.store.delete_vote(vote_id).await {
            Ok(()) => warn!(vote_id, "rolled back vote after counter failure"),
            Err(cleanup) => error!(
                vote_id,
                error = %cleanup,
                "compensation failed, vote row left without counter increment"
            ),
        }
        ApiError::counter_update(message, source)
    }

    /// Counter first, row second: a failure between the two writes leaves
    /// the counter decremented but restorable, never an under-counted
    /// option with its vote row already gone.
    pub async fn delete_vote(&self, vote_id: i64, requester: Uuid) -> ApiResult<DeletedVote> {
        let vote = self
            .store
            .get_vote(vote_id)
            .await?
            .ok_or_else(|| ApiError::not_found("vote not found"))?;
        if vote.user_id != requester {
            return Err(ApiError::forbidden("you can only delete your own votes"));
        }

        let current = match self.store.get_option(vote.option_id).await {
            Ok(Some(option)) => option.vote_count,
            Ok(None) => {
                let source = StoreError::Storage("option row disappeared".into());
                return Err(ApiError::counter_update(
                    "failed to fetch current vote count",
                    source,
                ));
            }
            Err(source) => {
                return Err(ApiError::counter_update(
                    "failed to fetch current vote count",
                    source,
                ));
            }
        };

        let decremented = (current - 1).max(0);
        self.store
            .set_option_count(vote.option_id, decremented)
            .await
            .map_err(|source| ApiError::counter_update("failed to update vote count", source))?;

        if let Err(source) = self.store.delete_vote(vote_id).await {
            match self.store.set_option_count(vote.option_id, current).await {
                Ok(()) => warn!(vote_id, "restored counter after vote deletion failure"),
                Err(cleanup) => error!(
                    vote_id,
                    error = %cleanup,
                    "compensation failed, counter under-counts an existing vote"
                ),
            }
            return Err(ApiError::deletion("failed to delete vote", source));
        }

        info!(vote_id, "vote deleted");
        Ok(DeletedVote { id: vote_id })
    }

    pub async fn get_poll_votes(&self, poll_id: i64) -> ApiResult<PollVotesResponse> {
        let votes = self.store.votes_for_poll(poll_id).await?;
        Ok(PollVotesResponse {
            poll_id,
            total_votes: votes.len() as i64,
            votes,
        })
    }

    /// Recomputes each option's counter from the vote rows and rewrites any
    /// tally that has drifted (e.g. after a crash inside a compensation
    /// window). Owner-only.
    pub async fn reconcile_poll(&self, poll_id: i64, requester: Uuid) -> ApiResult<ReconcileReport> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or_else(|| ApiError::not_found("poll not found"))?;
        if poll.created_by != requester {
            return Err(ApiError::forbidden(
                "you can only reconcile polls you created",
            ));
        }

        let options = self.store.options_for_poll(poll_id).await?;
        let mut repaired = Vec::new();
        for option in &options {
            let actual = self.store.count_votes_for_option(option.id).await? as i32;
            if actual != option.vote_count {
                self.store
                    .set_option_count(option.id, actual)
                    .await
                    .map_err(|source| {
                        ApiError::counter_update("failed to repair vote count", source)
                    })?;
                warn!(
                    option_id = option.id,
                    previous = option.vote_count,
                    actual,
                    "repaired drifted vote counter"
                );
                repaired.push(RepairedOption {
                    option_id: option.id,
                    previous_count: option.vote_count,
                    actual_count: actual,
                });
            }
        }

        Ok(ReconcileReport {
            poll_id,
            options_checked: options.len(),
            repaired,
        })
    }
}
