//! Notification inbox endpoints and the live notification stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use common::{NotificationId, OrderId, UserId};
use domain::{Notification, NotificationCategory, NotificationKind, OrderStatus};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use store::MarketplaceStore;
use tokio::sync::broadcast::error::RecvError;
use workflow::ManualNotification;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::Issues;

const INVALID_NOTIFICATION_MESSAGE: &str = "Datos inválidos en la creación de la notificación";

/// SSE event name for pushed notifications.
pub const STREAM_EVENT: &str = "notificacion";

// -- Request types --

/// Body of `POST /notificaciones`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: String,
    pub tipo: String,
    pub pedido_id: Option<String>,
    pub pedido_numero: Option<String>,
    pub categoria: Option<String>,
}

impl CreateNotificationRequest {
    fn into_manual(self) -> Result<ManualNotification, ApiError> {
        let kind: NotificationKind = self
            .tipo
            .parse()
            .map_err(|_| ApiError::BadRequest("Tipo de notificación inválido".to_string()))?;

        let mut issues = Issues::new();
        let recipient = issues.id::<UserId>("userId", &self.user_id);
        let order = self
            .pedido_id
            .as_deref()
            .and_then(|id| issues.id::<OrderId>("pedidoId", id));
        let category = self.categoria.as_deref().and_then(|c| {
            issues.parse::<NotificationCategory>("categoria", c, "compra o venta")
        });

        let recipient = match recipient {
            Some(recipient) if issues.is_empty() => recipient,
            _ => {
                return Err(ApiError::Validation {
                    message: INVALID_NOTIFICATION_MESSAGE.to_string(),
                    issues: issues.into_vec(),
                });
            }
        };

        let mut manual = ManualNotification::new(recipient, kind);
        manual.order = order;
        manual.order_number = self.pedido_numero.filter(|n| !n.trim().is_empty());
        manual.category = category;
        Ok(manual)
    }
}

// -- Response types --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub tipo: NotificationKind,
    pub pedido_id: Option<OrderId>,
    pub pedido_numero: Option<String>,
    pub producto: Option<String>,
    pub estado: Option<OrderStatus>,
    pub categoria: Option<NotificationCategory>,
    pub mensaje: String,
    pub leida: bool,
    pub fecha_creacion: DateTime<Utc>,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.recipient,
            tipo: n.kind,
            pedido_id: n.order,
            pedido_numero: n.order_number.clone(),
            producto: n.product_title.clone(),
            estado: n.order_status,
            categoria: n.category,
            mensaje: n.message.clone(),
            leida: n.read,
            fecha_creacion: n.created_at,
        }
    }
}

fn to_responses(notifications: &[Notification]) -> Json<Vec<NotificationResponse>> {
    Json(notifications.iter().map(NotificationResponse::from).collect())
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::BadRequest("Usuario inválido.".to_string()))
}

// -- Handlers --

/// POST /notificaciones: create a notification with the fixed text for its kind.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NotificationResponse>), ApiError> {
    let Json(req) =
        body.map_err(|e| ApiError::from_json_rejection(INVALID_NOTIFICATION_MESSAGE, e))?;
    let manual = req.into_manual()?;

    let notification = state.notifications.create_manual(manual).await?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse::from(&notification)),
    ))
}

/// GET /notificaciones/usuario/{id}: every notification, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let user = parse_user(&user_id)?;
    let notifications = state.notifications.list_for_user(user).await?;
    Ok(to_responses(&notifications))
}

/// GET /notificaciones/no-leidas/{id}
#[tracing::instrument(skip(state))]
pub async fn list_unread<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let user = parse_user(&user_id)?;
    let notifications = state.notifications.list_unread(user).await?;
    Ok(to_responses(&notifications))
}

/// GET /notificaciones/leidas/{id}
#[tracing::instrument(skip(state))]
pub async fn list_read<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let user = parse_user(&user_id)?;
    let notifications = state.notifications.list_read(user).await?;
    Ok(to_responses(&notifications))
}

/// PATCH /notificaciones/{id}/leida
#[tracing::instrument(skip(state))]
pub async fn mark_read<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let not_found = || ApiError::NotFound("Notificación no encontrada".to_string());

    let id = NotificationId::parse(&id).map_err(|_| not_found())?;
    let notification = state
        .notifications
        .mark_read(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(NotificationResponse::from(&notification)))
}

/// GET /notificaciones/stream/{id}: Server-Sent Events for one recipient.
///
/// Only notifications published after the client connects are sent.
#[tracing::instrument(skip(state))]
pub async fn stream<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let user = parse_user(&user_id)?;
    let receiver = state.bus.subscribe();
    tracing::debug!(%user, "notification stream opened");

    let events = futures_util::stream::unfold(receiver, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(notification) if notification.recipient == user => {
                    match Event::default()
                        .event(STREAM_EVENT)
                        .json_data(NotificationResponse::from(&notification))
                    {
                        Ok(event) => return Some((Ok(event), rx)),
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode notification event");
                        }
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%user, skipped, "notification stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
