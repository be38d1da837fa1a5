use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ticketdb::TicketExt, userdb::UserExt},
    dtos::{ticketdtos::*, userdtos::Response},
    error::{ErrorMessage, HttpError},
    middleware::{role_check, JWTAuthUser},
    models::{
        ticketmodel::{Ticket, TicketPriority, TicketStatus},
        usermodel::UserRole,
    },
    service::{policy, stats},
    AppState,
};

pub fn ticket_handler() -> Router {
    Router::new()
        .route("/", get(get_tickets).post(create_ticket))
        .route(
            "/stats",
            get(get_ticket_stats).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/:ticket_id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route("/:ticket_id/status", put(update_ticket_status))
        .route("/:ticket_id/assign", put(assign_ticket))
        .route("/:ticket_id/escalate", put(escalate_ticket))
        .route(
            "/:ticket_id/comments",
            get(get_ticket_comments).post(add_comment),
        )
}

/// A ticket that vanished between the permission check and the update is
/// a 404, not a store failure.
fn ticket_db_error(err: sqlx::Error) -> HttpError {
    match err {
        sqlx::Error::RowNotFound => HttpError::not_found(ErrorMessage::TicketNotFound.to_string()),
        err => HttpError::from_db_error(err),
    }
}

async fn load_ticket(app_state: &AppState, ticket_id: Uuid) -> Result<Ticket, HttpError> {
    app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(HttpError::from_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::TicketNotFound.to_string()))
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    policy::ensure_create(&auth.user)?;

    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .db_client
        .save_ticket(
            auth.user.id,
            body.title,
            body.description,
            body.category,
            body.priority.unwrap_or(TicketPriority::Medium),
        )
        .await
        .map_err(HttpError::from_db_error)?;

    tracing::info!(ticket_id = %ticket.id, submitter = %auth.user.id, "ticket created");

    Ok((
        StatusCode::CREATED,
        Json(TicketResponseDto {
            status: "success".to_string(),
            data: ticket,
        }),
    ))
}

pub async fn get_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Query(query_params): Query<TicketQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(20);
    let offset = ((page - 1) * limit) as i64;

    let scope = policy::list_scope(&auth.user);

    let tickets = app_state
        .db_client
        .get_tickets(&scope, query_params.status, limit as i64, offset)
        .await
        .map_err(HttpError::from_db_error)?;

    Ok(Json(TicketListResponseDto {
        status: "success".to_string(),
        count: tickets.len() as i64,
        data: tickets,
    }))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state
        .db_client
        .get_ticket_with_comments(ticket_id)
        .await
        .map_err(HttpError::from_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::TicketNotFound.to_string()))?;

    policy::ensure_view(&auth.user, &detail.ticket.ticket)?;

    Ok(Json(TicketDetailResponseDto {
        status: "success".to_string(),
        data: detail,
    }))
}

pub async fn update_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_update_content(&auth.user, &ticket)?;

    let ticket = app_state
        .db_client
        .update_ticket_content(ticket_id, body.title, body.description, body.category)
        .await
        .map_err(ticket_db_error)?;

    Ok(Json(TicketResponseDto {
        status: "success".to_string(),
        data: ticket,
    }))
}

pub async fn update_ticket_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_status_change(&auth.user, &ticket, body.status)?;

    tracing::debug!(
        ticket_id = %ticket_id,
        from = ticket.status.to_str(),
        to = body.status.to_str(),
        "ticket status change"
    );

    let newly_resolved =
        body.status == TicketStatus::Resolved && ticket.status != TicketStatus::Resolved;

    let updated = app_state
        .db_client
        .update_ticket_status(ticket_id, body.status)
        .await
        .map_err(ticket_db_error)?;

    // Resolution leaves a trace in the conversation.
    if newly_resolved {
        app_state
            .db_client
            .add_ticket_comment(
                ticket_id,
                auth.user.id,
                policy::resolution_note(auth.user.role),
            )
            .await
            .map_err(ticket_db_error)?;

        tracing::info!(ticket_id = %ticket_id, resolver = %auth.user.id, "ticket resolved");
    }

    Ok(Json(TicketResponseDto {
        status: "success".to_string(),
        data: updated,
    }))
}

pub async fn assign_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<AssignTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = load_ticket(&app_state, ticket_id).await?;

    let assignee = app_state
        .db_client
        .get_user(Some(body.assigned_to), None)
        .await
        .map_err(HttpError::from_db_error)?
        .ok_or_else(|| HttpError::not_found("Assigned user not found"))?;

    policy::ensure_assign(&auth.user, &ticket, &assignee, body.support_level)?;

    let ticket = app_state
        .db_client
        .assign_ticket(ticket_id, assignee.id, body.support_level)
        .await
        .map_err(ticket_db_error)?;

    tracing::info!(
        ticket_id = %ticket_id,
        assignee = %assignee.id,
        tier = body.support_level.to_str(),
        "ticket assigned"
    );

    Ok(Json(TicketResponseDto {
        status: "success".to_string(),
        data: ticket,
    }))
}

pub async fn escalate_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_escalate(&auth.user, &ticket)?;

    let ticket = app_state
        .db_client
        .escalate_ticket(ticket_id)
        .await
        .map_err(ticket_db_error)?;

    tracing::info!(ticket_id = %ticket_id, by = %auth.user.id, "ticket escalated to secondline");

    Ok(Json(TicketResponseDto {
        status: "success".to_string(),
        data: ticket,
    }))
}

pub async fn delete_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_delete(&auth.user, &ticket)?;

    app_state
        .db_client
        .delete_ticket(ticket_id)
        .await
        .map_err(HttpError::from_db_error)?;

    Ok(Json(Response {
        status: "success",
        message: "Ticket deleted".to_string(),
    }))
}

pub async fn add_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<CreateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_comment(&auth.user, &ticket)?;

    let comment = app_state
        .db_client
        .add_ticket_comment(ticket_id, auth.user.id, body.text)
        .await
        .map_err(ticket_db_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponseDto {
            status: "success".to_string(),
            data: comment,
        }),
    ))
}

pub async fn get_ticket_comments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = load_ticket(&app_state, ticket_id).await?;

    policy::ensure_view(&auth.user, &ticket)?;

    let comments = app_state
        .db_client
        .get_ticket_comments(ticket_id)
        .await
        .map_err(HttpError::from_db_error)?;

    Ok(Json(CommentListResponseDto {
        status: "success".to_string(),
        data: comments,
    }))
}

pub async fn get_ticket_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let status_counts = app_state
        .db_client
        .get_status_counts()
        .await
        .map_err(HttpError::from_db_error)?;

    let firstline_staff = app_state
        .db_client
        .count_users_by_role(UserRole::Firstline)
        .await
        .map_err(HttpError::from_db_error)?;

    let secondline_staff = app_state
        .db_client
        .count_users_by_role(UserRole::Secondline)
        .await
        .map_err(HttpError::from_db_error)?;

    let categories = app_state
        .db_client
        .get_category_counts()
        .await
        .map_err(HttpError::from_db_error)?;

    let priorities = app_state
        .db_client
        .get_priority_counts()
        .await
        .map_err(HttpError::from_db_error)?;

    let data = stats::assemble(
        status_counts,
        stats::SupportCounts {
            firstline_staff,
            secondline_staff,
        },
        categories,
        priorities,
    );

    Ok(Json(TicketStatsResponseDto {
        status: "success".to_string(),
        data,
    }))
}
