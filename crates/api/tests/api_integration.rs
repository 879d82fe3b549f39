//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::auth::{Identity, StaticTokenVerifier};
use api::config::Config;
use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ProductId, UserId};
use domain::{Currency, Money, Product, User, UserRole};
use futures_util::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{InMemoryStore, ProductStore, UserStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

const BUYER_TOKEN: &str = "buyer-token";
const SELLER_TOKEN: &str = "seller-token";

struct TestApp {
    app: Router,
    state: Arc<AppState<InMemoryStore>>,
    buyer: User,
    seller: User,
    mate: Product,
    yerba: Product,
}

impl TestApp {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let buyer = User::new("Lucía", "lucia@example.com", vec![UserRole::Buyer]);
        let seller = User::new("Martín", "martin@example.com", vec![UserRole::Seller]);
        store.insert_user(buyer.clone()).await.unwrap();
        store.insert_user(seller.clone()).await.unwrap();

        let mate = Product::new(
            seller.id,
            "Mate de calabaza",
            Money::from_cents(1_500_000),
            Currency::ArgentinePeso,
            10,
        );
        let yerba = Product::new(
            seller.id,
            "Yerba 1kg",
            Money::from_cents(450_000),
            Currency::ArgentinePeso,
            5,
        );
        store.insert_product(mate.clone()).await.unwrap();
        store.insert_product(yerba.clone()).await.unwrap();

        let config = Config {
            auth_tokens: StaticTokenVerifier::new()
                .with_token(
                    BUYER_TOKEN,
                    Identity {
                        user: buyer.id,
                        roles: buyer.roles.clone(),
                    },
                )
                .with_token(
                    SELLER_TOKEN,
                    Identity {
                        user: seller.id,
                        roles: seller.roles.clone(),
                    },
                ),
            ..Config::default()
        };

        let state = api::create_state(store, &config);
        let app = api::create_app(state.clone(), get_metrics_handle());

        Self {
            app,
            state,
            buyer,
            seller,
            mate,
            yerba,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn empty(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    fn order_body(&self, items: Value) -> Value {
        json!({
            "comprador": self.buyer.id,
            "vendedor": self.seller.id,
            "items": items,
            "moneda": "PESO_ARG",
            "direccionEntrega": {
                "calle": "Av. Belgrano",
                "altura": 1020,
                "piso": "4",
                "departamento": "C",
                "codigoPostal": "C1092",
                "ciudad": "CABA",
                "provincia": "Buenos Aires",
                "pais": "Argentina",
                "lat": -34.613,
                "long": -58.381
            }
        })
    }

    async fn place_default_order(&self) -> Value {
        let body = self.order_body(json!([
            { "producto": self.mate.id, "cantidad": 2 },
            { "producto": self.yerba.id, "cantidad": 1 }
        ]));
        let (status, json) = self.json("POST", "/pedidos", body).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["pedido"].clone()
    }

    async fn stock(&self, id: ProductId) -> u32 {
        self.state.store().stock_of(id).await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new().await;
    let (status, json) = t.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let t = TestApp::new().await;
    let pedido = t.place_default_order().await;

    assert_eq!(pedido["estado"], "PENDIENTE");
    assert_eq!(pedido["moneda"], "PESO_ARG");
    assert_eq!(pedido["total"], 2 * 1_500_000 + 450_000);
    assert_eq!(pedido["items"][0]["titulo"], "Mate de calabaza");
    assert_eq!(pedido["items"][0]["subtotal"], 3_000_000);
    assert_eq!(pedido["historialEstados"].as_array().unwrap().len(), 1);
    assert_eq!(pedido["direccionEntrega"]["codigoPostal"], "C1092");
    assert!(pedido["numero"].as_str().unwrap().starts_with('#'));

    assert_eq!(t.stock(t.mate.id).await, 8);
    assert_eq!(t.stock(t.yerba.id).await, 4);

    let (_, buyer_inbox) = t
        .get(&format!("/notificaciones/usuario/{}", t.buyer.id), None)
        .await;
    let (_, seller_inbox) = t
        .get(&format!("/notificaciones/usuario/{}", t.seller.id), None)
        .await;
    assert_eq!(buyer_inbox.as_array().unwrap().len(), 1);
    assert_eq!(buyer_inbox[0]["categoria"], "compra");
    assert_eq!(seller_inbox.as_array().unwrap().len(), 1);
    assert_eq!(seller_inbox[0]["categoria"], "venta");
}

#[tokio::test]
async fn test_create_order_response_envelope() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([{ "producto": t.mate.id, "cantidad": 1 }]));
    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Pedido creado con éxito");
}

#[tokio::test]
async fn test_create_order_validation_errors() {
    let t = TestApp::new().await;
    let mut body = t.order_body(json!([{ "producto": t.mate.id, "cantidad": -1 }]));
    body["moneda"] = json!("EURO");

    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Datos inválidos en la creación del pedido");
    let paths: Vec<&str> = json["detalles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"moneda"));
    assert!(paths.contains(&"items.0.cantidad"));
    assert_eq!(t.state.store().order_count().await, 0);
}

#[tokio::test]
async fn test_create_order_with_zero_unit_price() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([
        { "producto": t.mate.id, "cantidad": 1, "precioUnitario": 0 }
    ]));

    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["pedido"]["total"], 0);
    assert_eq!(json["pedido"]["items"][0]["precioUnitario"], 0);
    assert_eq!(t.stock(t.mate.id).await, 9);
}

#[tokio::test]
async fn test_create_order_with_unrepresentable_total() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([
        { "producto": t.yerba.id, "cantidad": 2, "precioUnitario": i64::MAX }
    ]));

    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(t.state.store().order_count().await, 0);
    assert_eq!(t.state.store().notification_count().await, 0);
    assert_eq!(t.stock(t.yerba.id).await, 5);
}

#[tokio::test]
async fn test_create_order_malformed_json() {
    let t = TestApp::new().await;
    let (status, json) = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/pedidos")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_create_order_unknown_product() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([
        { "producto": t.mate.id, "cantidad": 1 },
        { "producto": ProductId::new(), "cantidad": 1 }
    ]));

    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "El producto no fue encontrado.");
    assert_eq!(t.state.store().order_count().await, 0);
    assert_eq!(t.stock(t.mate.id).await, 10);
}

#[tokio::test]
async fn test_create_order_insufficient_stock() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([{ "producto": t.yerba.id, "cantidad": 6 }]));

    let (status, json) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Yerba 1kg"));
    assert_eq!(t.stock(t.yerba.id).await, 5);
}

#[tokio::test]
async fn test_create_order_with_two_sellers() {
    let t = TestApp::new().await;
    let other = Product::new(
        UserId::new(),
        "Bombilla",
        Money::from_cents(80_000),
        Currency::ArgentinePeso,
        3,
    );
    t.state.store().insert_product(other.clone()).await.unwrap();

    let body = t.order_body(json!([
        { "producto": t.mate.id, "cantidad": 1 },
        { "producto": other.id, "cantidad": 1 }
    ]));
    let (status, _) = t.json("POST", "/pedidos", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.state.store().order_count().await, 0);
    assert_eq!(t.stock(t.mate.id).await, 10);
    assert_eq!(t.stock(other.id).await, 3);
}

#[tokio::test]
async fn test_idempotency_key_creates_one_order() {
    let t = TestApp::new().await;
    let body = t.order_body(json!([{ "producto": t.mate.id, "cantidad": 1 }]));

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (status, json) = t
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/pedidos")
                    .header("content-type", "application/json")
                    .header("idempotency-key", "checkout-42")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json["pedido"]["id"].clone());
    }

    assert_eq!(ids[0], ids[1]);
    assert_eq!(t.state.store().order_count().await, 1);
    assert_eq!(t.stock(t.mate.id).await, 9);
}

#[tokio::test]
async fn test_cancel_order_restores_stock() {
    let t = TestApp::new().await;
    let pedido = t.place_default_order().await;
    let id = pedido["id"].as_str().unwrap();

    let (status, json) = t.empty("PUT", &format!("/pedidos/{id}/cancelacion")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Pedido cancelado con éxito");
    assert_eq!(json["pedido"]["estado"], "CANCELADO");
    assert_eq!(t.stock(t.mate.id).await, 10);
    assert_eq!(t.stock(t.yerba.id).await, 5);

    let (status, _) = t.empty("PUT", &format!("/pedidos/{id}/cancelacion")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_unknown_order() {
    let t = TestApp::new().await;
    let (status, json) = t
        .empty(
            "PUT",
            &format!("/pedidos/{}/cancelacion", common::OrderId::new()),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Pedido no encontrado.");
}

#[tokio::test]
async fn test_ship_order() {
    let t = TestApp::new().await;
    let pedido = t.place_default_order().await;
    let id = pedido["id"].as_str().unwrap();

    let (status, _) = t
        .empty("PATCH", &format!("/pedidos/{id}/enviar/{}", t.buyer.id))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .empty("PATCH", &format!("/pedidos/{id}/enviar/{}", UserId::new()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = t
        .empty("PATCH", &format!("/pedidos/{id}/enviar/{}", t.seller.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Pedido marcado como enviado");
    assert_eq!(json["pedido"]["estado"], "ENVIADO");
    assert_eq!(json["pedido"]["historialEstados"][1]["usuario"], json!(t.seller.id));

    let (status, _) = t.empty("PUT", &format!("/pedidos/{id}/cancelacion")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_requires_token() {
    let t = TestApp::new().await;

    let (status, json) = t.get("/pedidos/COMPRADOR", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);

    let (status, _) = t.get("/pedidos/COMPRADOR", Some("forged")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_orders_by_user_type() {
    let t = TestApp::new().await;
    let first = t.place_default_order().await;
    let second = t.place_default_order().await;

    let (status, json) = t.get("/pedidos/COMPRADOR", Some(BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], second["id"]);
    assert_eq!(data[1]["id"], first["id"]);

    let (_, json) = t.get("/pedidos/VENDEDOR", Some(SELLER_TOKEN)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, json) = t.get("/pedidos/VENDEDOR", Some(BUYER_TOKEN)).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (status, json) = t.get("/pedidos/ADMIN", Some(BUYER_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Tipo de usuario inválido.");
}

#[tokio::test]
async fn test_order_detail() {
    let t = TestApp::new().await;
    let pedido = t.place_default_order().await;
    let id = pedido["id"].as_str().unwrap();

    let (status, json) = t
        .get(&format!("/pedidos/detalle/{id}"), Some(BUYER_TOKEN))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], pedido["id"]);
    assert_eq!(json["data"]["total"], pedido["total"]);

    let (status, json) = t
        .get(
            &format!("/pedidos/detalle/{}", common::OrderId::new()),
            Some(BUYER_TOKEN),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Pedido no encontrado.");
}

#[tokio::test]
async fn test_manual_notification_and_read_flag() {
    let t = TestApp::new().await;

    let (status, created) = t
        .json(
            "POST",
            "/notificaciones",
            json!({ "userId": t.buyer.id, "tipo": "pedido_enviado", "pedidoNumero": "#1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tipo"], "pedido_enviado");
    assert_eq!(created["leida"], false);
    assert!(!created["mensaje"].as_str().unwrap().is_empty());

    let id = created["id"].as_str().unwrap();
    let (status, marked) = t
        .empty("PATCH", &format!("/notificaciones/{id}/leida"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["leida"], true);

    let (_, read) = t
        .get(&format!("/notificaciones/leidas/{}", t.buyer.id), None)
        .await;
    let (_, unread) = t
        .get(&format!("/notificaciones/no-leidas/{}", t.buyer.id), None)
        .await;
    assert_eq!(read.as_array().unwrap().len(), 1);
    assert!(unread.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_notification_rejects_unknown_kind() {
    let t = TestApp::new().await;
    let (status, json) = t
        .json(
            "POST",
            "/notificaciones",
            json!({ "userId": t.buyer.id, "tipo": "oferta" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Tipo de notificación inválido");
}

#[tokio::test]
async fn test_mark_unknown_notification() {
    let t = TestApp::new().await;
    let (status, _) = t
        .empty(
            "PATCH",
            &format!("/notificaciones/{}/leida", common::NotificationId::new()),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notification_stream_delivers_own_notifications() {
    let t = TestApp::new().await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/notificaciones/stream/{}", t.seller.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
    let mut events = response.into_body().into_data_stream();

    // Only the seller's notification should reach this stream.
    t.place_default_order().await;

    let chunk = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("no event received")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(text.contains("event: notificacion"));
    assert!(text.contains(&t.seller.id.to_string()));
    assert!(text.contains("\"categoria\":\"venta\""));
    assert!(!text.contains(&t.buyer.id.to_string()));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new().await;
    t.place_default_order().await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
