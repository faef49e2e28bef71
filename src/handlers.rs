use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    ApiResponse, CastVoteRequest, CreatePollRequest, CreatePollResponse, DeletePollRequest,
    DeleteVoteRequest, DeletedPoll, DeletedVote, Poll, PollVotesResponse, PollWithOptions,
    ReconcileReport, ReconcileRequest, UpdatePollRequest, Vote,
};
use crate::state::AppState;

pub async fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::ok(serde_json::json!({ "status": "ok" }), "ok"))
}

pub async fn create_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePollRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreatePollResponse>>)> {
    let user = state.auth.verify(&headers).await?;
    let CreatePollRequest {
        title,
        description,
        options,
        user_id,
    } = payload;

    let (Some(title), Some(options), Some(_)) = (title, options, user_id) else {
        warn!("create poll rejected, missing fields");
        return Err(ApiError::validation(
            "title, options, and user_id are required",
        ));
    };

    let result = state
        .polls
        .create_poll(&title, description.as_deref(), &options, user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(result, "Poll created successfully")),
    ))
}

pub async fn list_polls(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<PollWithOptions>>>> {
    let polls = state.polls.list_polls().await?;
    Ok(Json(ApiResponse::ok(
        polls,
        "Polls retrieved successfully",
    )))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
) -> ApiResult<Json<ApiResponse<PollWithOptions>>> {
    let poll = state.polls.get_poll(poll_id).await?;
    Ok(Json(ApiResponse::ok(poll, "Poll retrieved successfully")))
}

pub async fn update_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePollRequest>,
) -> ApiResult<Json<ApiResponse<Poll>>> {
    let user = state.auth.verify(&headers).await?;
    if payload.user_id.is_none() {
        warn!(poll_id, "update poll rejected, missing user_id");
        return Err(ApiError::validation("user_id is required"));
    }

    let poll = state
        .polls
        .update_poll(
            poll_id,
            payload.title.as_deref(),
            payload.description.as_deref(),
            user.id,
        )
        .await?;

    Ok(Json(ApiResponse::ok(poll, "Poll updated successfully")))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<DeletePollRequest>,
) -> ApiResult<Json<ApiResponse<DeletedPoll>>> {
    let user = state.auth.verify(&headers).await?;
    if payload.user_id.is_none() {
        warn!(poll_id, "delete poll rejected, missing user_id");
        return Err(ApiError::validation("user_id is required"));
    }

    let deleted = state.polls.delete_poll(poll_id, user.id).await?;
    Ok(Json(ApiResponse::ok(deleted, "Poll deleted successfully")))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CastVoteRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Vote>>)> {
    let user = state.auth.verify(&headers).await?;
    let CastVoteRequest {
        poll_id,
        option_id,
        user_id,
    } = payload;

    let (Some(poll_id), Some(option_id), Some(_)) = (poll_id, option_id, user_id) else {
        warn!("cast vote rejected, missing fields");
        return Err(ApiError::validation(
            "poll_id, option_id, and user_id are required",
        ));
    };

    let vote = state.votes.cast_vote(poll_id, option_id, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(vote, "Vote cast successfully")),
    ))
}

pub async fn delete_vote(
    State(state): State<AppState>,
    Path(vote_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<DeleteVoteRequest>,
) -> ApiResult<Json<ApiResponse<DeletedVote>>> {
    let user = state.auth.verify(&headers).await?;
    if payload.user_id.is_none() {
        warn!(vote_id, "delete vote rejected, missing user_id");
        return Err(ApiError::validation("user_id is required"));
    }

    let deleted = state.votes.delete_vote(vote_id, user.id).await?;
    Ok(Json(ApiResponse::ok(deleted, "Vote deleted successfully")))
}

pub async fn get_poll_votes(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
) -> ApiResult<Json<ApiResponse<PollVotesResponse>>> {
    let votes = state.votes.get_poll_votes(poll_id).await?;
    Ok(Json(ApiResponse::ok(
        votes,
        "Poll votes retrieved successfully",
    )))
}

pub async fn reconcile_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<ReconcileRequest>,
) -> ApiResult<Json<ApiResponse<ReconcileReport>>> {
    let user = state.auth.verify(&headers).await?;
    if payload.user_id.is_none() {
        warn!(poll_id, "reconcile rejected, missing user_id");
        return Err(ApiError::validation("user_id is required"));
    }

    let report = state.votes.reconcile_poll(poll_id, user.id).await?;
    Ok(Json(ApiResponse::ok(
        report,
        "Poll counters reconciled successfully",
    )))
}
