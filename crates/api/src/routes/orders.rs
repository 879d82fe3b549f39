//! Order placement, cancellation, shipment and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{
    CancelOrder, Currency, DeliveryAddress, LineItem, MarkShipped, Money, Order, OrderStatus,
    PlaceOrder, RequestedItem, StatusChange, UserRole,
};
use serde::{Deserialize, Serialize};
use store::MarketplaceStore;

use super::DataResponse;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{Issues, ValidationIssue};

/// Header carrying the client's retry key for `POST /pedidos`.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const INVALID_ORDER_MESSAGE: &str = "Datos inválidos en la creación del pedido";

// -- Request types --

/// Body of `POST /pedidos`.
///
/// Every field is optional at the serde level so that missing fields are
/// reported as validation issues instead of a decoding failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub comprador: String,
    pub vendedor: String,
    pub items: Vec<OrderItemRequest>,
    pub moneda: String,
    pub direccion_entrega: Option<DeliveryAddressRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub producto: String,
    pub cantidad: Option<i64>,
    /// Unit price in cents, zero allowed; the catalog price is used when absent.
    pub precio_unitario: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryAddressRequest {
    pub calle: String,
    pub altura: Option<i64>,
    pub piso: Option<String>,
    pub departamento: Option<String>,
    pub codigo_postal: String,
    pub ciudad: String,
    pub provincia: String,
    pub pais: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

impl CreateOrderRequest {
    /// Validates the body, collecting every invalid field.
    pub fn into_command(
        self,
        idempotency_key: Option<String>,
    ) -> Result<PlaceOrder, Vec<ValidationIssue>> {
        let mut issues = Issues::new();

        let buyer = issues.id::<UserId>("comprador", &self.comprador);
        let seller = issues.id::<UserId>("vendedor", &self.vendedor);
        let currency = issues.parse::<Currency>("moneda", &self.moneda, "PESO_ARG, DOLAR_USA o REAL");

        if self.items.is_empty() {
            issues.push("items", "Debe contener al menos 1 elemento");
        }
        let items: Vec<Option<RequestedItem>> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| item.validate(i, &mut issues))
            .collect();

        let address = match self.direccion_entrega {
            Some(address) => address.validate(&mut issues),
            None => {
                issues.push("direccionEntrega", "Requerido");
                None
            }
        };

        if !issues.is_empty() {
            return Err(issues.into_vec());
        }

        // All present once no issue was recorded.
        match (buyer, seller, currency, address, items.into_iter().collect::<Option<Vec<_>>>()) {
            (Some(buyer), Some(seller), Some(currency), Some(address), Some(items)) => {
                let mut cmd = PlaceOrder::new(buyer, seller, currency, address, items);
                cmd.idempotency_key = idempotency_key;
                Ok(cmd)
            }
            _ => Err(vec![ValidationIssue {
                path: String::new(),
                message: INVALID_ORDER_MESSAGE.to_string(),
            }]),
        }
    }
}

impl OrderItemRequest {
    fn validate(&self, index: usize, issues: &mut Issues) -> Option<RequestedItem> {
        let product = issues.id(&format!("items.{index}.producto"), &self.producto);
        let quantity = issues.positive(&format!("items.{index}.cantidad"), self.cantidad);

        let price = match self.precio_unitario {
            Some(cents) if cents < 0 => {
                issues.push(
                    format!("items.{index}.precioUnitario"),
                    "Debe ser mayor o igual a 0",
                );
                return None;
            }
            other => other.map(Money::from_cents),
        };

        let mut item = RequestedItem::new(product?, quantity?);
        if let Some(price) = price {
            item = item.at_price(price);
        }
        Some(item)
    }
}

impl DeliveryAddressRequest {
    fn validate(self, issues: &mut Issues) -> Option<DeliveryAddress> {
        let street = issues.text("direccionEntrega.calle", &self.calle);
        let number = issues.positive("direccionEntrega.altura", self.altura);
        let postal_code = issues.text("direccionEntrega.codigoPostal", &self.codigo_postal);
        let city = issues.text("direccionEntrega.ciudad", &self.ciudad);
        let province = issues.text("direccionEntrega.provincia", &self.provincia);
        let country = issues.text("direccionEntrega.pais", &self.pais);
        let lat = issues.number("direccionEntrega.lat", self.lat);
        let long = issues.number("direccionEntrega.long", self.long);

        Some(DeliveryAddress {
            street: street?,
            number: number?,
            floor: self.piso.filter(|p| !p.trim().is_empty()),
            unit: self.departamento.filter(|d| !d.trim().is_empty()),
            postal_code: postal_code?,
            city: city?,
            province: province?,
            country: country?,
            lat: lat?,
            long: long?,
        })
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub numero: String,
    pub comprador: UserId,
    pub vendedor: UserId,
    pub items: Vec<OrderItemResponse>,
    pub moneda: Currency,
    /// Cents.
    pub total: i64,
    pub estado: OrderStatus,
    pub historial_estados: Vec<StatusChangeResponse>,
    pub direccion_entrega: DeliveryAddressResponse,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub producto: common::ProductId,
    pub titulo: String,
    pub cantidad: u32,
    pub precio_unitario: i64,
    pub subtotal: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub fecha: DateTime<Utc>,
    pub estado: OrderStatus,
    pub usuario: UserId,
    pub motivo: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddressResponse {
    pub calle: String,
    pub altura: u32,
    pub piso: Option<String>,
    pub departamento: Option<String>,
    pub codigo_postal: String,
    pub ciudad: String,
    pub provincia: String,
    pub pais: String,
    pub lat: f64,
    pub long: f64,
}

/// `{"success": true, "message": ..., "pedido": ...}` envelope for commands.
#[derive(Debug, Serialize)]
pub struct OrderCommandResponse {
    pub success: bool,
    pub message: &'static str,
    pub pedido: OrderResponse,
}

impl OrderCommandResponse {
    fn new(message: &'static str, order: &Order) -> Json<Self> {
        Json(Self {
            success: true,
            message,
            pedido: OrderResponse::from(order),
        })
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            numero: order.display_number(),
            comprador: order.buyer(),
            vendedor: order.seller(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            moneda: order.currency(),
            total: order.total().cents(),
            estado: order.status(),
            historial_estados: order
                .status_history()
                .iter()
                .map(StatusChangeResponse::from)
                .collect(),
            direccion_entrega: DeliveryAddressResponse::from(order.delivery_address()),
            fecha_creacion: order.created_at(),
        }
    }
}

impl From<&LineItem> for OrderItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            producto: item.product,
            titulo: item.title.clone(),
            cantidad: item.quantity,
            precio_unitario: item.unit_price.cents(),
            subtotal: item.subtotal().cents(),
        }
    }
}

impl From<&StatusChange> for StatusChangeResponse {
    fn from(change: &StatusChange) -> Self {
        Self {
            fecha: change.at,
            estado: change.status,
            usuario: change.actor,
            motivo: change.reason.clone(),
        }
    }
}

impl From<&DeliveryAddress> for DeliveryAddressResponse {
    fn from(address: &DeliveryAddress) -> Self {
        Self {
            calle: address.street.clone(),
            altura: address.number,
            piso: address.floor.clone(),
            departamento: address.unit.clone(),
            codigo_postal: address.postal_code.clone(),
            ciudad: address.city.clone(),
            provincia: address.province.clone(),
            pais: address.country.clone(),
            lat: address.lat,
            long: address.long,
        }
    }
}

// -- Handlers --

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(raw).map_err(|_| ApiError::NotFound("Pedido no encontrado.".to_string()))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::NotFound("Usuario no encontrado.".to_string()))
}

/// POST /pedidos: validate the cart, reserve stock and place the order.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCommandResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::from_json_rejection(INVALID_ORDER_MESSAGE, e))?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    let cmd = req
        .into_command(idempotency_key)
        .map_err(|issues| ApiError::Validation {
            message: INVALID_ORDER_MESSAGE.to_string(),
            issues,
        })?;

    let order = state.workflow.create_order(cmd).await?;
    tracing::info!(order_id = %order.id(), total = %order.total(), "order created");

    Ok((
        StatusCode::CREATED,
        OrderCommandResponse::new("Pedido creado con éxito", &order),
    ))
}

/// PUT /pedidos/{id}/cancelacion: cancel a pending order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderCommandResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.workflow.cancel_order(CancelOrder::new(order_id)).await?;

    Ok(OrderCommandResponse::new("Pedido cancelado con éxito", &order))
}

/// PATCH /pedidos/{id}/enviar/{usuarioId}: the seller marks the order shipped.
#[tracing::instrument(skip(state))]
pub async fn ship<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<OrderCommandResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let acting_user = parse_user_id(&user_id)?;
    let order = state
        .workflow
        .mark_as_shipped(MarkShipped::new(order_id, acting_user))
        .await?;

    Ok(OrderCommandResponse::new("Pedido marcado como enviado", &order))
}

/// GET /pedidos/{tipoUsuario}: the caller's purchases or sales, newest first.
#[tracing::instrument(skip(state, identity), fields(user = %identity.user))]
pub async fn list<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(identity): Authenticated,
    Path(user_type): Path<String>,
) -> Result<Json<DataResponse<Vec<OrderResponse>>>, ApiError> {
    let role: UserRole = user_type
        .parse()
        .map_err(|_| ApiError::BadRequest("Tipo de usuario inválido.".to_string()))?;

    let orders = state
        .workflow
        .list_orders_for_user(identity.user, role)
        .await?;

    Ok(Json(DataResponse::new(
        orders.iter().map(OrderResponse::from).collect(),
    )))
}

/// GET /pedidos/detalle/{id}
#[tracing::instrument(skip(state, _identity))]
pub async fn detail<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(_identity): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<OrderResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.workflow.get_order(order_id).await?;

    Ok(Json(DataResponse::new(OrderResponse::from(&order))))
}
