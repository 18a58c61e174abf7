//! Routes for the Order bounded context.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use niespro_core::repository::StoredEvent;
use niespro_order::application::command_handlers::{self, OrderCommandResult};
use niespro_order::application::query_handlers::{self, OrderView};
use niespro_order::domain::commands;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Client-chosen order ID; a fresh one is generated when omitted.
    #[serde(default)]
    pub order_id: Option<Uuid>,
    /// The customer placing the order.
    pub customer_id: Uuid,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Request body for POST /add-item.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// The target order.
    pub order_id: Uuid,
    /// The product to add.
    pub product_id: Uuid,
    /// Units to add.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Request body for POST /remove-item.
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    /// The target order.
    pub order_id: Uuid,
    /// The product to remove.
    pub product_id: Uuid,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Request body for POST /confirm.
#[derive(Debug, Deserialize)]
pub struct ConfirmOrderRequest {
    /// The target order.
    pub order_id: Uuid,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Request body for POST /ship.
#[derive(Debug, Deserialize)]
pub struct ShipOrderRequest {
    /// The target order.
    pub order_id: Uuid,
    /// Carrier tracking number.
    pub tracking_number: String,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Request body for POST /cancel.
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    /// The target order.
    pub order_id: Uuid,
    /// Why the order is being cancelled.
    pub reason: String,
    /// Correlation ID propagated into event metadata.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The order the command applied to.
    pub order_id: Uuid,
    /// IDs of the stored events produced by the command.
    pub event_ids: Vec<Uuid>,
    /// The order's version after the append.
    pub version: i64,
}

impl CommandResponse {
    fn from_result(result: &OrderCommandResult) -> Self {
        Self {
            order_id: result.aggregate_id,
            event_ids: result.stored_events.iter().map(|e| e.id).collect(),
            version: result.stored_events.last().map_or(0, |e| e.version),
        }
    }
}

async fn publish_and_respond(
    state: &AppState,
    result: OrderCommandResult,
) -> Json<CommandResponse> {
    publish(state, &result.stored_events).await;
    Json(CommandResponse::from_result(&result))
}

async fn publish(state: &AppState, events: &[StoredEvent]) {
    let failures = state.dispatcher.publish(events).await;
    if failures > 0 {
        info!(failures, "events stored but some subscribers failed");
    }
}

/// POST /
#[instrument(skip(state, request), fields(customer_id = %request.customer_id))]
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::CreateOrder {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id.unwrap_or_else(Uuid::new_v4),
        customer_id: request.customer_id,
        currency: request.currency,
    };

    info!(
        correlation_id = %command.correlation_id,
        order_id = %command.order_id,
        "handling create_order command"
    );

    let result =
        command_handlers::handle_create_order(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// POST /add-item
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::AddItem {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id,
        product_id: request.product_id,
        quantity: request.quantity,
        unit_price_cents: request.unit_price_cents,
    };

    info!(correlation_id = %command.correlation_id, "handling add_item command");

    let result =
        command_handlers::handle_add_item(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// POST /remove-item
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn remove_item(
    State(state): State<AppState>,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::RemoveItem {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id,
        product_id: request.product_id,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_item command");

    let result =
        command_handlers::handle_remove_item(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// POST /confirm
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn confirm_order(
    State(state): State<AppState>,
    Json(request): Json<ConfirmOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::ConfirmOrder {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id,
    };

    info!(correlation_id = %command.correlation_id, "handling confirm_order command");

    let result =
        command_handlers::handle_confirm_order(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// POST /ship
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn ship_order(
    State(state): State<AppState>,
    Json(request): Json<ShipOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::ShipOrder {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id,
        tracking_number: request.tracking_number,
    };

    info!(correlation_id = %command.correlation_id, "handling ship_order command");

    let result =
        command_handlers::handle_ship_order(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// POST /cancel
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn cancel_order(
    State(state): State<AppState>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::CancelOrder {
        correlation_id: request.correlation_id.unwrap_or_else(Uuid::new_v4),
        order_id: request.order_id,
        reason: request.reason,
    };

    info!(correlation_id = %command.correlation_id, "handling cancel_order command");

    let result =
        command_handlers::handle_cancel_order(&command, state.clock.as_ref(), &state.event_store)
            .await?;

    Ok(publish_and_respond(&state, result).await)
}

/// GET /{order_id}
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    let view = query_handlers::get_order_by_id(order_id, &state.event_store).await?;
    Ok(Json(view))
}

/// Returns the router for the order context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/add-item", post(add_item))
        .route("/remove-item", post(remove_item))
        .route("/confirm", post(confirm_order))
        .route("/ship", post(ship_order))
        .route("/cancel", post(cancel_order))
        .route("/{order_id}", get(get_order))
}
