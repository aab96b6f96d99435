use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use wareflow_infra::Stores;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let app = wareflow_api::app::build_app(&Stores::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Api {
    client: reqwest::Client,
    base_url: String,
    user: String,
}

impl Api {
    fn new(srv: &TestServer) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: srv.base_url.clone(),
            user: Uuid::now_v7().to_string(),
        }
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-User-Id", &self.user);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let body = res.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, None).await
    }

    async fn create_document(&self, body: Value) -> String {
        let (status, doc) = self.post("/documents", body).await;
        assert_eq!(status, StatusCode::CREATED, "create document failed: {doc}");
        doc["id"].as_str().unwrap().to_string()
    }
}

fn id() -> String {
    Uuid::now_v7().to_string()
}

#[tokio::test]
async fn health_needs_no_user() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn acting_user_header_is_required() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/documents", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/documents", srv.base_url))
        .header("X-User-Id", "not-a-uuid")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn line_items_move_stock_and_totals() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let warehouse = id();
    let product = id();

    let incoming = api
        .create_document(json!({ "docType": "incoming", "warehouseId": warehouse }))
        .await;
    let (status, _) = api
        .post(
            "/doc-items",
            json!({ "docId": incoming, "productId": product, "quantity": 100, "unitPrice": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let outgoing = api
        .create_document(json!({ "docType": "outgoing", "warehouseId": warehouse, "customerId": id() }))
        .await;
    let (status, line) = api
        .post(
            "/doc-items",
            json!({ "docId": outgoing, "productId": product, "quantity": 10, "unitPrice": 50, "bonus": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let line_id = line["id"].as_str().unwrap().to_string();

    let (_, stock) = api.get(&format!("/inventory/{product}/{warehouse}")).await;
    assert_eq!(stock["available"], 90);
    let (_, doc) = api.get(&format!("/documents/{outgoing}")).await;
    assert_eq!(doc["summ"], 450);

    let (status, updated) = api
        .send(
            reqwest::Method::PATCH,
            &format!("/doc-items/{line_id}"),
            Some(json!({ "quantity": 12 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 12);
    let (_, stock) = api.get(&format!("/inventory/{product}/{warehouse}")).await;
    assert_eq!(stock["available"], 88);

    let (status, body) = api
        .send(reqwest::Method::DELETE, &format!("/doc-items/{line_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, stock) = api.get(&format!("/inventory/{product}/{warehouse}")).await;
    assert_eq!(stock["available"], 100);
    let (_, doc) = api.get(&format!("/documents/{outgoing}")).await;
    assert_eq!(doc["summ"], 0);

    let (status, log) = api.get(&format!("/transactions?productId={product}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn insufficient_stock_reports_free_and_requested() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let warehouse = id();
    let product = id();

    let outgoing = api
        .create_document(json!({ "docType": "outgoing", "warehouseId": warehouse }))
        .await;
    let (status, body) = api
        .post(
            "/doc-items",
            json!({ "docId": outgoing, "productId": product, "quantity": 3, "unitPrice": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["free"], 0);
    assert_eq!(body["requested"], 3);

    let (status, body) = api
        .post(
            "/inventory/reserve",
            json!({ "warehouseId": warehouse, "items": [{ "productId": product, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
}

#[tokio::test]
async fn status_changes_are_checked_against_the_lifecycle() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let doc = api
        .create_document(json!({ "docType": "outgoing", "warehouseId": id() }))
        .await;
    let path = format!("/documents/{doc}/status");

    let (status, body) = api
        .send(reqwest::Method::PATCH, &path, Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_transition");

    let (status, body) = api
        .send(reqwest::Method::PATCH, &path, Some(json!({ "status": "reserved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "reserved");

    let (status, _) = api.get(&format!("/documents/{}", id())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delivery_lifecycle_create_query_patch_delete() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let warehouse = id();
    let address = id();

    let d1 = api
        .create_document(json!({ "docType": "outgoing", "warehouseId": warehouse, "addressId": address }))
        .await;
    let d2 = api
        .create_document(json!({ "docType": "outgoing", "warehouseId": warehouse, "addressId": address }))
        .await;

    let (status, view) = api
        .post(
            "/delivery",
            json!({
                "date": "2026-05-04",
                "startTime": "09:00",
                "unloadTime": "00:15",
                "timeInProgress": "00:30",
                "docIds": [d1, d2],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create delivery failed: {view}");
    assert_eq!(view["deliveryDoc"]["totalCountDoc"], 2);
    let items = view["deliveryItems"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["docIds"], json!([d1, d2]));
    // Unknown address and no customer: empty placeholders.
    assert_eq!(items[0]["address"]["address"], "");
    assert_eq!(items[0]["customer"]["id"], "");
    let delivery_id = view["deliveryDoc"]["id"].as_str().unwrap().to_string();

    let (status, listed) = api
        .get("/delivery?startDate=2026-05-01&endDate=2026-05-31")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, patched) = api
        .send(
            reqwest::Method::PATCH,
            &format!("/delivery/{delivery_id}"),
            Some(json!({ "startTime": "10:30" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(patched["deliveryDoc"]["startTime"]
        .as_str()
        .unwrap()
        .contains("10:30:00"));

    let (status, _) = api
        .send(reqwest::Method::DELETE, &format!("/delivery/{delivery_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.get(&format!("/delivery/{delivery_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delivery_of_non_outgoing_documents_is_rejected() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let incoming = api
        .create_document(json!({ "docType": "incoming", "warehouseId": id() }))
        .await;

    let (status, body) = api
        .post(
            "/delivery",
            json!({
                "date": "2026-05-04",
                "startTime": "09:00",
                "unloadTime": "00:15",
                "timeInProgress": "00:30",
                "docIds": [incoming],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let doc = api
        .create_document(json!({ "docType": "incoming", "warehouseId": id() }))
        .await;

    let (status, body) = api
        .post("/doc-items", json!({ "docId": doc, "productId": id(), "unitPrice": 4 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = api
        .post(
            "/doc-items",
            json!({ "docId": doc, "productId": id(), "quantity": "ten", "unitPrice": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = api
        .post(
            "/delivery",
            json!({
                "date": "2026-05-04",
                "startTime": "09:00",
                "unloadTime": "00:15",
                "timeInProgress": "00:30",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn batches_received_inline_can_be_looked_up() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv);
    let product = id();
    let doc = api
        .create_document(json!({ "docType": "incoming", "warehouseId": id() }))
        .await;

    let (status, line) = api
        .post(
            "/doc-items",
            json!({
                "docId": doc,
                "productId": product,
                "quantity": 12,
                "unitPrice": 3,
                "newBatch": { "expiresOn": "2027-01-31" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let batch_id = line["batchId"].as_str().unwrap().to_string();

    let (status, batches) = api.get(&format!("/batches?productId={product}")).await;
    assert_eq!(status, StatusCode::OK);
    let batches = batches.as_array().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0]["id"], batch_id);
    assert_eq!(batches[0]["quantityReceived"], 12);

    let (status, batch) = api.get(&format!("/batches/{batch_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["expiresOn"], "2027-01-31");

    let (status, _) = api.get("/batches").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = api.get(&format!("/batches/{}", id())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
