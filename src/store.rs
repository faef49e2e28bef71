use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Poll, PollOption, PollPatch, PollWithOptions, Vote, VoteDetail};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A structural uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Single-operation access to the three record sets. Each call is one
/// request/response round trip; sequencing and compensation live in the
/// callers.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(
        &self,
        title: &str,
        description: Option<&str>,
        created_by: Uuid,
    ) -> StoreResult<Poll>;
    async fn insert_options(&self, poll_id: i64, texts: &[String]) -> StoreResult<Vec<PollOption>>;
    async fn list_polls(&self) -> StoreResult<Vec<PollWithOptions>>;
    async fn get_poll(&self, poll_id: i64) -> StoreResult<Option<Poll>>;
    async fn update_poll(&self, poll_id: i64, patch: &PollPatch) -> StoreResult<Poll>;
    async fn delete_poll(&self, poll_id: i64) -> StoreResult<()>;
    async fn delete_votes_for_poll(&self, poll_id: i64) -> StoreResult<()>;
    async fn delete_options_for_poll(&self, poll_id: i64) -> StoreResult<()>;

    async fn get_option(&self, option_id: i64) -> StoreResult<Option<PollOption>>;
    async fn options_for_poll(&self, poll_id: i64) -> StoreResult<Vec<PollOption>>;
    async fn set_option_count(&self, option_id: i64, vote_count: i32) -> StoreResult<()>;

    async fn find_vote(&self, poll_id: i64, user_id: Uuid) -> StoreResult<Option<Vote>>;
    async fn get_vote(&self, vote_id: i64) -> StoreResult<Option<Vote>>;
    async fn insert_vote(&self, poll_id: i64, option_id: i64, user_id: Uuid) -> StoreResult<Vote>;
    async fn delete_vote(&self, vote_id: i64) -> StoreResult<()>;
    async fn votes_for_poll(&self, poll_id: i64) -> StoreResult<Vec<VoteDetail>>;
    async fn count_votes_for_option(&self, option_id: i64) -> StoreResult<i64>;
}

#[cfg(test)]
pub(crate) mod mem {
    //! In-memory gateway used by the unit tests. Mirrors the relational
    //! schema, including the (poll_id, user_id) uniqueness constraint, and
    //! supports per-operation failure injection so compensation paths can
    //! be exercised.

    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    enum FailMode {
        Always,
        /// Fail the nth call to the operation, 1-based.
        Nth(u32),
    }

    #[derive(Default)]
    struct Tables {
        polls: BTreeMap<i64, Poll>,
        options: BTreeMap<i64, PollOption>,
        votes: BTreeMap<i64, Vote>,
        next_id: i64,
    }

    #[derive(Default)]
    pub struct MemStore {
        tables: Mutex<Tables>,
        failures: Mutex<HashMap<&'static str, (FailMode, u32)>>,
        hide_existing_vote: AtomicBool,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call to `op` fail.
        pub fn fail_on(&self, op: &'static str) {
            self.failures
                .lock()
                .unwrap()
                .insert(op, (FailMode::Always, 0));
        }

        /// Make only the `n`th call (1-based) to `op` fail.
        pub fn fail_nth(&self, op: &'static str, n: u32) {
            self.failures
                .lock()
                .unwrap()
                .insert(op, (FailMode::Nth(n), 0));
        }

        /// Make the next `find_vote` miss an existing row, simulating the
        /// window between two concurrent uniqueness checks.
        pub fn hide_existing_vote_once(&self) {
            self.hide_existing_vote.store(true, Ordering::SeqCst);
        }

        fn check(&self, op: &'static str) -> StoreResult<()> {
            let mut failures = self.failures.lock().unwrap();
            if let Some((mode, seen)) = failures.get_mut(op) {
                *seen += 1;
                let fail = match mode {
                    FailMode::Always => true,
                    FailMode::Nth(n) => *seen == *n,
                };
                if fail {
                    return Err(StoreError::Storage(format!("injected failure: {op}")));
                }
            }
            Ok(())
        }

        fn next_id(tables: &mut Tables) -> i64 {
            tables.next_id += 1;
            tables.next_id
        }
    }

    #[async_trait]
    impl PollStore for MemStore {
        async fn insert_poll(
            &self,
            title: &str,
            description: Option<&str>,
            created_by: Uuid,
        ) -> StoreResult<Poll> {
            self.check("insert_poll")?;
            let mut tables = self.tables.lock().unwrap();
            let id = Self::next_id(&mut tables);
            let now = Utc::now();
            let poll = Poll {
                id,
                title: title.to_string(),
                description: description.map(str::to_string),
                created_by,
                created_at: now,
                updated_at: now,
            };
            tables.polls.insert(id, poll.clone());
            Ok(poll)
        }

        async fn insert_options(
            &self,
            poll_id: i64,
            texts: &[String],
        ) -> StoreResult<Vec<PollOption>> {
            self.check("insert_options")?;
            let mut tables = self.tables.lock().unwrap();
            let mut created = Vec::with_capacity(texts.len());
            for text in texts {
                let id = Self::next_id(&mut tables);
                let option = PollOption {
                    id,
                    poll_id,
                    option_text: text.clone(),
                    vote_count: 0,
                    created_at: Utc::now(),
                };
                tables.options.insert(id, option.clone());
                created.push(option);
            }
            Ok(created)
        }

        async fn list_polls(&self) -> StoreResult<Vec<PollWithOptions>> {
            self.check("list_polls")?;
            let tables = self.tables.lock().unwrap();
            let mut polls: Vec<Poll> = tables.polls.values().cloned().collect();
            polls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(polls
                .into_iter()
                .map(|poll| {
                    let poll_options = tables
                        .options
                        .values()
                        .filter(|o| o.poll_id == poll.id)
                        .cloned()
                        .collect();
                    PollWithOptions { poll, poll_options }
                })
                .collect())
        }

        async fn get_poll(&self, poll_id: i64) -> StoreResult<Option<Poll>> {
            self.check("get_poll")?;
            Ok(self.tables.lock().unwrap().polls.get(&poll_id).cloned())
        }

        async fn update_poll(&self, poll_id: i64, patch: &PollPatch) -> StoreResult<Poll> {
            self.check("update_poll")?;
            let mut tables = self.tables.lock().unwrap();
            let poll = tables
                .polls
                .get_mut(&poll_id)
                .ok_or_else(|| StoreError::Storage("poll not found".into()))?;
            if let Some(title) = &patch.title {
                poll.title = title.clone();
            }
            if let Some(description) = &patch.description {
                poll.description = Some(description.clone());
            }
            poll.updated_at = Utc::now();
            Ok(poll.clone())
        }

        async fn delete_poll(&self, poll_id: i64) -> StoreResult<()> {
            self.check("delete_poll")?;
            self.tables.lock().unwrap().polls.remove(&poll_id);
            Ok(())
        }

        async fn delete_votes_for_poll(&self, poll_id: i64) -> StoreResult<()> {
            self.check("delete_votes_for_poll")?;
            let mut tables = self.tables.lock().unwrap();
            tables.votes.retain(|_, v| v.poll_id != poll_id);
            Ok(())
        }

        async fn delete_options_for_poll(&self, poll_id: i64) -> StoreResult<()> {
            self.check("delete_options_for_poll")?;
            let mut tables = self.tables.lock().unwrap();
            tables.options.retain(|_, o| o.poll_id != poll_id);
            Ok(())
        }

        async fn get_option(&self, option_id: i64) -> StoreResult<Option<PollOption>> {
            self.check("get_option")?;
            Ok(self.tables.lock().unwrap().options.get(&option_id).cloned())
        }

        async fn options_for_poll(&self, poll_id: i64) -> StoreResult<Vec<PollOption>> {
            self.check("options_for_poll")?;
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .options
                .values()
                .filter(|o| o.poll_id == poll_id)
                .cloned()
                .collect())
        }

        async fn set_option_count(&self, option_id: i64, vote_count: i32) -> StoreResult<()> {
            self.check("set_option_count")?;
            let mut tables = self.tables.lock().unwrap();
            let option = tables
                .options
                .get_mut(&option_id)
                .ok_or_else(|| StoreError::Storage("option not found".into()))?;
            option.vote_count = vote_count;
            Ok(())
        }

        async fn find_vote(&self, poll_id: i64, user_id: Uuid) -> StoreResult<Option<Vote>> {
            self.check("find_vote")?;
            if self.hide_existing_vote.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .votes
                .values()
                .find(|v| v.poll_id == poll_id && v.user_id == user_id)
                .cloned())
        }

        async fn get_vote(&self, vote_id: i64) -> StoreResult<Option<Vote>> {
            self.check("get_vote")?;
            Ok(self.tables.lock().unwrap().votes.get(&vote_id).cloned())
        }

        async fn insert_vote(
            &self,
            poll_id: i64,
            option_id: i64,
            user_id: Uuid,
        ) -> StoreResult<Vote> {
            self.check("insert_vote")?;
            let mut tables = self.tables.lock().unwrap();
            let duplicate = tables
                .votes
                .values()
                .any(|v| v.poll_id == poll_id && v.user_id == user_id);
            if duplicate {
                return Err(StoreError::UniqueViolation);
            }
            let id = Self::next_id(&mut tables);
            let vote = Vote {
                id,
                poll_id,
                option_id,
                user_id,
                created_at: Utc::now(),
            };
            tables.votes.insert(id, vote.clone());
            Ok(vote)
        }

        async fn delete_vote(&self, vote_id: i64) -> StoreResult<()> {
            self.check("delete_vote")?;
            self.tables.lock().unwrap().votes.remove(&vote_id);
            Ok(())
        }

        async fn votes_for_poll(&self, poll_id: i64) -> StoreResult<Vec<VoteDetail>> {
            self.check("votes_for_poll")?;
            let tables = self.tables.lock().unwrap();
            let mut votes: Vec<VoteDetail> = tables
                .votes
                .values()
                .filter(|v| v.poll_id == poll_id)
                .map(|v| VoteDetail {
                    id: v.id,
                    option_id: v.option_id,
                    user_id: v.user_id,
                    created_at: v.created_at,
                    option_text: tables
                        .options
                        .get(&v.option_id)
                        .map(|o| o.option_text.clone())
                        .unwrap_or_default(),
                })
                .collect();
            votes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(votes)
        }

        async fn count_votes_for_option(&self, option_id: i64) -> StoreResult<i64> {
            self.check("count_votes_for_option")?;
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .votes
                .values()
                .filter(|v| v.option_id == option_id)
                .count() as i64)
        }
    }
}
