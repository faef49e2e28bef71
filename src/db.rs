use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use crate::models::{Poll, PollOption, PollPatch, PollWithOptions, Vote, VoteDetail};
use crate::store::{PollStore, StoreError, StoreResult};

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

// Foreign keys deliberately lack ON DELETE CASCADE: dependent rows are
// removed explicitly, votes before options before the poll. The unique
// constraint on (poll_id, user_id) is the structural at-most-one-vote
// invariant.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        created_by UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS poll_options (
        id BIGSERIAL PRIMARY KEY,
        poll_id BIGINT NOT NULL REFERENCES polls (id),
        option_text TEXT NOT NULL,
        vote_count INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id BIGSERIAL PRIMARY KEY,
        poll_id BIGINT NOT NULL REFERENCES polls (id),
        option_id BIGINT NOT NULL REFERENCES poll_options (id),
        user_id UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT votes_poll_user_unique UNIQUE (poll_id, user_id)
    )
    "#,
];

const POLL_COLUMNS: &str = "id, title, description, created_by, created_at, updated_at";
const OPTION_COLUMNS: &str = "id, poll_id, option_text, vote_count, created_at";
const VOTE_COLUMNS: &str = "id, poll_id, option_id, user_id, created_at";

#[derive(Clone)]
pub struct PgPollStore {
    pool: PgPool,
}

impl PgPollStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn vote_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl PollStore for PgPollStore {
    async fn insert_poll(
        &self,
        title: &str,
        description: Option<&str>,
        created_by: Uuid,
    ) -> StoreResult<Poll> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            "INSERT INTO polls (title, description, created_by) \
             VALUES ($1, $2, $3) RETURNING {POLL_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(poll)
    }

    async fn insert_options(&self, poll_id: i64, texts: &[String]) -> StoreResult<Vec<PollOption>> {
        let mut created = Vec::with_capacity(texts.len());
        for text in texts {
            let option = sqlx::query_as::<_, PollOption>(&format!(
                "INSERT INTO poll_options (poll_id, option_text, vote_count) \
                 VALUES ($1, $2, 0) RETURNING {OPTION_COLUMNS}"
            ))
            .bind(poll_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;
            created.push(option);
        }
        Ok(created)
    }

    async fn list_polls(&self) -> StoreResult<Vec<PollWithOptions>> {
        let polls = sqlx::query_as::<_, Poll>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, PollOption>(&format!(
            "SELECT {OPTION_COLUMNS} FROM poll_options ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(polls
            .into_iter()
            .map(|poll| {
                let poll_options = options
                    .iter()
                    .filter(|o| o.poll_id == poll.id)
                    .cloned()
                    .collect();
                PollWithOptions { poll, poll_options }
            })
            .collect())
    }

    async fn get_poll(&self, poll_id: i64) -> StoreResult<Option<Poll>> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"
        ))
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(poll)
    }

    async fn update_poll(&self, poll_id: i64, patch: &PollPatch) -> StoreResult<Poll> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            "UPDATE polls SET title = COALESCE($2, title), \
             description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $1 RETURNING {POLL_COLUMNS}"
        ))
        .bind(poll_id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(poll)
    }

    async fn delete_poll(&self, poll_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_votes_for_poll(&self, poll_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM votes WHERE poll_id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_options_for_poll(&self, poll_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM poll_options WHERE poll_id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_option(&self, option_id: i64) -> StoreResult<Option<PollOption>> {
        let option = sqlx::query_as::<_, PollOption>(&format!(
            "SELECT {OPTION_COLUMNS} FROM poll_options WHERE id = $1"
        ))
        .bind(option_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    async fn options_for_poll(&self, poll_id: i64) -> StoreResult<Vec<PollOption>> {
        let options = sqlx::query_as::<_, PollOption>(&format!(
            "SELECT {OPTION_COLUMNS} FROM poll_options WHERE poll_id = $1 ORDER BY id ASC"
        ))
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn set_option_count(&self, option_id: i64, vote_count: i32) -> StoreResult<()> {
        sqlx::query("UPDATE poll_options SET vote_count = $2 WHERE id = $1")
            .bind(option_id)
            .bind(vote_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_vote(&self, poll_id: i64, user_id: Uuid) -> StoreResult<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE poll_id = $1 AND user_id = $2"
        ))
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn get_vote(&self, vote_id: i64) -> StoreResult<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE id = $1"
        ))
        .bind(vote_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn insert_vote(&self, poll_id: i64, option_id: i64, user_id: Uuid) -> StoreResult<Vote> {
        sqlx::query_as::<_, Vote>(&format!(
            "INSERT INTO votes (poll_id, option_id, user_id) \
             VALUES ($1, $2, $3) RETURNING {VOTE_COLUMNS}"
        ))
        .bind(poll_id)
        .bind(option_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(vote_insert_error)
    }

    async fn delete_vote(&self, vote_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(vote_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn votes_for_poll(&self, poll_id: i64) -> StoreResult<Vec<VoteDetail>> {
        let votes = sqlx::query_as::<_, VoteDetail>(
            "SELECT v.id, v.option_id, v.user_id, v.created_at, o.option_text \
             FROM votes v JOIN poll_options o ON o.id = v.option_id \
             WHERE v.poll_id = $1 ORDER BY v.created_at DESC, v.id DESC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(votes)
    }

    async fn count_votes_for_option(&self, option_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE option_id = $1")
            .bind(option_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
