//! API routes

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{chat, files, items, tasks};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the complete API router.
///
/// `max_upload_size` bounds the upload request body; the exact per-file limit
/// is enforced by the storage backend.
pub fn router(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .nest("/items", items_router())
        .nest("/files", files_router(max_upload_size))
        .nest("/tasks", tasks_router())
        .route("/ws/chat", get(chat::chat))
}

fn items_router() -> Router<AppState> {
    Router::new()
        .route("/", get(items::list_items).post(items::create_item))
        .route(
            "/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
}

fn files_router(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(files::upload_file).layer(DefaultBodyLimit::max(
                max_upload_size.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/download/:filename", get(files::download_file))
        .route("/list", get(files::list_files))
        .route("/:filename", delete(files::delete_file))
}

fn tasks_router() -> Router<AppState> {
    Router::new()
        .route("/send-email", post(tasks::send_email))
        .route("/process-data", post(tasks::process_data))
        .route("/log", post(tasks::write_log))
        .route("/multiple-tasks", post(tasks::multiple_tasks))
}

async fn api_root() -> Json<ApiRoot> {
    Json(ApiRoot {
        message: "Welcome to crudkit",
        version: env!("CARGO_PKG_VERSION"),
        health: "/health",
    })
}

#[derive(Serialize)]
struct ApiRoot {
    message: &'static str,
    version: &'static str,
    health: &'static str,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use ck_core::config::AppConfig;
    use ck_db::MemoryItemRepository;
    use ck_files::MemoryStorage;
    use ck_tasks::{Task, TaskEnvelope, TaskQueue};
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "crudkit-test-boundary";

    struct TestApp {
        app: Router,
        tasks: mpsc::Receiver<TaskEnvelope>,
    }

    fn test_app_with(max_upload_size: usize, queue_capacity: usize) -> TestApp {
        let config = AppConfig::default();
        let items = Arc::new(MemoryItemRepository::new(config.pagination.max_page_size));
        let storage = Arc::new(MemoryStorage::new(max_upload_size));
        let (queue, tasks) = TaskQueue::bounded(queue_capacity);

        let state = AppState::new(config, items, storage, queue);
        TestApp {
            app: router(max_upload_size).with_state(state),
            tasks,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(1024, 16)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_request(disposition: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; {d}\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            d = disposition,
            c = content,
        );
        Request::post("/files/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_items(app: &Router, titles: &[&str]) {
        for title in titles {
            let response = send_json(app, "POST", "/items", json!({ "title": title })).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_api_root() {
        let t = test_app();
        let response = get(&t.app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["health"], "/health");
    }

    #[tokio::test]
    async fn test_item_crud() {
        let t = test_app();

        let response = send_json(
            &t.app,
            "POST",
            "/items",
            json!({ "title": "Test Item", "description": "Test Description" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["title"], "Test Item");
        assert_eq!(created["is_active"], true);
        let id = created["id"].as_i64().unwrap();

        let response = get(&t.app, &format!("/items/{}", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["description"], "Test Description");

        let response = send_json(
            &t.app,
            "PUT",
            &format!("/items/{}", id),
            json!({ "title": "Updated", "is_active": false }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "Updated");
        assert_eq!(updated["is_active"], false);
        assert_eq!(updated["description"], "Test Description");

        let request = Request::delete(format!("/items/{}", id))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NO_CONTENT);

        let response = get(&t.app, &format!("/items/{}", id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["detail"],
            format!("Item with id {} not found", id)
        );
    }

    #[tokio::test]
    async fn test_missing_item_update_and_delete() {
        let t = test_app();

        let response = send_json(&t.app, "PUT", "/items/999", json!({ "title": "x" })).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::delete("/items/999").body(Body::empty()).unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let t = test_app();
        let response = send_json(&t.app, "POST", "/items", json!({ "title": "" })).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["field"], "title");
    }

    #[tokio::test]
    async fn test_list_pages() {
        let t = test_app();
        create_items(&t.app, &["a", "b", "c", "d", "e"]).await;

        let response = get(&t.app, "/items?page=2&page_size=2").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 5);
        assert_eq!(body["count"], 2);
        assert_eq!(body["page"], 2);
        assert_eq!(body["page_size"], 2);
        assert_eq!(body["total_pages"], 3);
        assert_eq!(body["offset"], 2);
        assert_eq!(body["next_offset"], 4);
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let t = test_app();
        create_items(&t.app, &["Apple pie", "banana", "apple tart", "Cherry"]).await;

        let response = get(&t.app, "/items?title=APPLE&sort=title:desc").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let titles: Vec<&str> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["apple tart", "Apple pie"]);

        let response = get(&t.app, "/items?sort_by=title&sort_order=asc").await;
        let body = body_json(response).await;
        assert_eq!(body["items"][0]["title"], "Apple pie");
        assert_eq!(body["items"][3]["title"], "Cherry");
    }

    #[tokio::test]
    async fn test_list_generic_filters() {
        let t = test_app();
        create_items(&t.app, &["one", "two", "three"]).await;

        // [{"field":"id","operator":"in","value":[1,3]}]
        let filters = "%5B%7B%22field%22%3A%22id%22%2C%22operator%22%3A%22in%22%2C%22value%22%3A%5B1%2C3%5D%7D%5D";
        let response = get(&t.app, &format!("/items?filters={}&sort=id", filters)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["title"], "one");
        assert_eq!(body["items"][1]["title"], "three");
    }

    #[tokio::test]
    async fn test_list_rejects_bad_requests() {
        let t = test_app();

        // [{"field":"nonexistent","operator":"=","value":1}]
        let filters = "%5B%7B%22field%22%3A%22nonexistent%22%2C%22operator%22%3A%22%3D%22%2C%22value%22%3A1%7D%5D";
        let response = get(&t.app, &format!("/items?filters={}", filters)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["field"], "nonexistent");

        let response = get(&t.app, "/items?limit=1000").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["field"], "limit");

        let response = get(&t.app, "/items?sort=description").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = get(&t.app, "/items?page=abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_cursor_mode() {
        let t = test_app();
        create_items(&t.app, &["a", "b", "c"]).await;

        let response = get(&t.app, "/items?mode=cursor&limit=2&sort=id").await;
        let first = body_json(response).await;
        assert_eq!(first["count"], 2);
        assert_eq!(first["total"], 3);
        assert!(first["page"].is_null());
        let cursor = first["next_cursor"].as_str().unwrap().to_string();

        let response = get(&t.app, &format!("/items?cursor={}&limit=2&sort=id", cursor)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let second = body_json(response).await;
        assert_eq!(second["count"], 1);
        assert_eq!(second["items"][0]["title"], "c");
        assert!(second["next_cursor"].is_null());

        let response = get(&t.app, "/items?cursor=garbage&limit=2&sort=id").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["field"], "cursor");
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let t = test_app();

        let response = send(
            &t.app,
            upload_request(r#"name="file"; filename="test.txt""#, "Hello, World!"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["filename"], "test.txt");
        assert_eq!(body["size"], 13);
        assert_eq!(body["content_type"], "text/plain");
        assert_eq!(body["message"], "File uploaded successfully");

        let response = send(
            &t.app,
            upload_request(r#"name="file"; filename="test.txt""#, "again"),
        )
        .await;
        assert_eq!(body_json(response).await["filename"], "test_1.txt");

        let response = get(&t.app, "/files/list").await;
        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["files"][0]["filename"], "test.txt");

        let response = get(&t.app, "/files/download/test.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Hello, World!");

        let request = Request::delete("/files/test.txt").body(Body::empty()).unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NO_CONTENT);

        let response = get(&t.app, "/files/download/test.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "File test.txt not found");
    }

    #[tokio::test]
    async fn test_dotted_filename_round_trip() {
        let t = test_app();

        let response = send(
            &t.app,
            upload_request(r#"name="file"; filename="v1..2.txt""#, "v"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["filename"], "v1..2.txt");

        let response = get(&t.app, "/files/download/v1..2.txt").await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::delete("/files/v1..2.txt").body(Body::empty()).unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_file_errors() {
        let t = test_app_with(10, 16);

        let response = send(&t.app, upload_request(r#"name="file""#, "no name")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "No filename provided");

        let response = send(
            &t.app,
            upload_request(r#"name="file"; filename="big.txt""#, "more than ten bytes"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_json(response).await["detail"],
            "File size exceeds maximum allowed size of 10 bytes"
        );

        // Rejected by the body limit before the file reaches storage
        let response = send(
            &t.app,
            upload_request(r#"name="file"; filename="huge.txt""#, &"x".repeat(80 * 1024)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_json(response).await["detail"],
            "File size exceeds maximum allowed size of 10 bytes"
        );

        let response = get(&t.app, "/files/download/..%2Fsecret").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = Request::delete("/files/missing.txt").body(Body::empty()).unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_send_email_task() {
        let mut t = test_app();

        let response = send_json(
            &t.app,
            "POST",
            "/tasks/send-email",
            json!({ "to": "test@example.com", "subject": "Test", "body": "Body" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Email task queued successfully");
        assert_eq!(body["to"], "test@example.com");
        assert_eq!(body["status"], "processing");

        let envelope = t.tasks.recv().await.unwrap();
        assert_eq!(
            envelope.task,
            Task::send_email("test@example.com", "Test", "Body")
        );

        let response = send_json(
            &t.app,
            "POST",
            "/tasks/send-email",
            json!({ "to": "not-an-email", "subject": "Test", "body": "Body" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["field"], "to");
    }

    #[tokio::test]
    async fn test_process_data_and_log_tasks() {
        let t = test_app();

        let response = send_json(
            &t.app,
            "POST",
            "/tasks/process-data",
            json!({ "data": [1, 2, 3], "operation": "avg" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Data processing task queued successfully");
        assert_eq!(body["operation"], "avg");
        assert_eq!(body["data_size"], 3);

        let response = send_json(
            &t.app,
            "POST",
            "/tasks/process-data",
            json!({ "data": [1], "operation": "median" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::post("/tasks/log?message=hello")
            .body(Body::empty())
            .unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            body_json(response).await["message"],
            "Log task queued successfully"
        );
    }

    #[tokio::test]
    async fn test_multiple_tasks() {
        let mut t = test_app();

        let request = Request::post("/tasks/multiple-tasks")
            .body(Body::empty())
            .unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["tasks_count"], 4);
        assert_eq!(body["message"], "Multiple tasks queued successfully");

        let mut kinds = Vec::new();
        for _ in 0..4 {
            kinds.push(t.tasks.recv().await.unwrap().task.kind());
        }
        assert_eq!(
            kinds,
            vec!["write_log", "write_log", "send_email", "process_data"]
        );
    }

    #[tokio::test]
    async fn test_full_queue_is_unavailable() {
        let t = test_app_with(1024, 1);

        let request = Request::post("/tasks/multiple-tasks")
            .body(Body::empty())
            .unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["detail"], "task queue is full");
    }
}
