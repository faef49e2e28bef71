use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{CreatePollResponse, DeletedPoll, Poll, PollPatch, PollWithOptions};
use crate::store::PollStore;

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 500;
const OPTION_TEXT_MAX: usize = 100;
const MIN_OPTIONS: usize = 2;

/// Creates, updates, and tears down polls together with their dependent
/// records. Creation is poll-then-options with a compensating poll delete;
/// deletion cascades votes, then options, then the poll row.
#[derive(Clone)]
pub struct PollManager {
    store: Arc<dyn PollStore>,
}

impl PollManager {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    pub async fn create_poll(
        &self,
        title: &str,
        description: Option<&str>,
        options: &[String],
        owner: Uuid,
    ) -> ApiResult<CreatePollResponse> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::validation("title must not be blank"));
        }
        if title.len() > TITLE_MAX {
            return Err(ApiError::validation(format!(
                "title must be at most {TITLE_MAX} characters"
            )));
        }
        if let Some(description) = description {
            if description.len() > DESCRIPTION_MAX {
                return Err(ApiError::validation(format!(
                    "description must be at most {DESCRIPTION_MAX} characters"
                )));
            }
        }

        let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
        if options.len() < MIN_OPTIONS {
            return Err(ApiError::validation("at least 2 options are required"));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err(ApiError::validation("options must not be blank"));
        }
        if options.iter().any(|o| o.len() > OPTION_TEXT_MAX) {
            return Err(ApiError::validation(format!(
                "options must be at most {OPTION_TEXT_MAX} characters"
            )));
        }
        let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
        if distinct.len() != options.len() {
            return Err(ApiError::validation("options must be distinct"));
        }

        let poll = self
            .store
            .insert_poll(title, description, owner)
            .await
            .map_err(|source| ApiError::creation("poll creation failed", source))?;

        match self.store.insert_options(poll.id, &options).await {
            Ok(created) => {
                info!(poll_id = poll.id, options = created.len(), "poll created");
                Ok(CreatePollResponse {
                    poll,
                    options: created,
                })
            }
            Err(source) => {
                // Undo the poll insert so no poll exists without its options.
                match self.store.delete_poll(poll.id).await {
                    Ok(()) => warn!(poll_id = poll.id, "rolled back poll after option failure"),
                    Err(cleanup) => error!(
                        poll_id = poll.id,
                        error = %cleanup,
                        "compensation failed, poll row left without options"
                    ),
                }
                Err(ApiError::creation("failed to create poll options", source))
            }
        }
    }

    pub async fn list_polls(&self) -> ApiResult<Vec<PollWithOptions>> {
        Ok(self.store.list_polls().await?)
    }

    pub async fn get_poll(&self, poll_id: i64) -> ApiResult<PollWithOptions> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or_else(|| ApiError::not_found("poll not found"))?;
        let poll_options = self.store.options_for_poll(poll_id).await?;
        Ok(PollWithOptions { poll, poll_options })
    }

    pub async fn update_poll(
        &self,
        poll_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        requester: Uuid,
    ) -> ApiResult<Poll> {
        if title.is_none() && description.is_none() {
            return Err(ApiError::validation(
                "at least one field (title or description) is required",
            ));
        }
        let title = title.map(str::trim);
        if let Some(title) = title {
            if title.is_empty() {
                return Err(ApiError::validation("title must not be blank"));
            }
            if title.len() > TITLE_MAX {
                return Err(ApiError::validation(format!(
                    "title must be at most {TITLE_MAX} characters"
                )));
            }
        }
        if let Some(description) = description {
            if description.len() > DESCRIPTION_MAX {
                return Err(ApiError::validation(format!(
                    "description must be at most {DESCRIPTION_MAX} characters"
                )));
            }
        }

        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or_else(|| ApiError::not_found("poll not found"))?;
        if poll.created_by != requester {
            return Err(ApiError::forbidden("you can only update polls you created"));
        }

        let patch = PollPatch {
            title: title.map(str::to_string),
            description: description.map(str::to_string),
        };
        let updated = self.store.update_poll(poll_id, &patch).await?;
        info!(poll_id, "poll updated");
        Ok(updated)
    }

    /// Dependent rows go first: votes reference options and the poll, so
    /// the order votes -> options -> poll is fixed by the foreign keys.
    /// A failed step is reported by layer; earlier deletions are not undone.
    pub async fn delete_poll(&self, poll_id: i64, requester: Uuid) -> ApiResult<DeletedPoll> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or_else(|| ApiError::not_found("poll not found"))?;
        if poll.created_by != requester {
            return Err(ApiError::forbidden("you can only delete polls you created"));
        }

        self.store
            .delete_votes_for_poll(poll_id)
            .await
            .map_err(|source| ApiError::deletion("failed to delete poll votes", source))?;
        self.store
            .delete_options_for_poll(poll_id)
            .await
            .map_err(|source| ApiError::deletion("failed to delete poll options", source))?;
        self.store
            .delete_poll(poll_id)
            .await
            .map_err(|source| ApiError::deletion("failed to delete poll", source))?;

        info!(poll_id, "poll deleted");
        Ok(DeletedPoll {
            id: poll_id,
            title: poll.title,
        })
    }
}
