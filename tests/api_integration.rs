//! Integration tests for the task REST API.
//!
//! Each test spins up an Axum server on a random port backed by a real store
//! and worker pool, and exercises the HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use progression_queue::api::task_routes;
use progression_queue::tasks::TaskStore;
use progression_queue::worker::{DispatcherConfig, PoolConfig, WorkerPool};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

struct TestServer {
    base: String,
    client: reqwest::Client,
    shutdown: CancellationToken,
    pool: WorkerPool,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn submit(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/task/add"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    /// Poll `GET /task/{id}` until `check` accepts the body.
    async fn wait_for_task<F>(&self, id: u64, check: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        loop {
            let (status, task) = self.get_json(&format!("/task/{id}")).await;
            assert_eq!(status, 200, "task {id} disappeared: {task}");
            if check(&task) {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn stop(self) {
        self.pool.stop().await;
        self.shutdown.cancel();
    }
}

/// Start an Axum server on a random port with `workers` pool workers.
async fn start_server(workers: usize) -> TestServer {
    let shutdown = CancellationToken::new();
    let store = TaskStore::new(shutdown.clone());
    let pool = WorkerPool::start(
        Arc::clone(&store),
        PoolConfig {
            workers,
            dispatcher: DispatcherConfig {
                idle_backoff: Duration::from_millis(20),
                claim_poll: Duration::from_millis(2),
            },
        },
        &shutdown,
    );
    let app = task_routes(store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
            .unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        shutdown,
        pool,
    }
}

#[tokio::test]
async fn submitted_progression_completes_then_expires() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(1).await;

        let response = server
            .submit(json!({"n": 3, "d": 2, "n1": 10, "I": 0, "TTL": 1}))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "new task successfully created");
        assert_eq!(body["task_id"], 1);

        let task = server
            .wait_for_task(1, |t| t["task_status"] == "completed")
            .await;
        assert_eq!(task["current_iteration"], 3);
        assert_eq!(task["current_value"], 16.0);
        assert_eq!(task["queue_index"], -1);
        assert!(task["task_started_at"].is_string());
        assert!(task["task_finished_at"].is_string());

        tokio::time::sleep(Duration::from_millis(1300)).await;
        let (status, body) = server.get_json("/task/1").await;
        assert_eq!(status, 404);
        assert_eq!(body["detail"], "task 1 not found");

        server.stop().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn list_is_ordered_with_queue_positions() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(1).await;

        // Occupies the only worker for a long time.
        server
            .submit(json!({"n": 2, "d": 1, "n1": 0, "I": 30, "TTL": 60}))
            .await;
        server
            .wait_for_task(1, |t| {
                t["task_status"] == "in progress" && t["current_iteration"] == 1
            })
            .await;

        for _ in 0..2 {
            let response = server
                .submit(json!({"n": 1, "d": 1, "n1": 0, "I": 0, "TTL": 60}))
                .await;
            assert_eq!(response.status().as_u16(), 201);
        }

        let (status, list) = server.get_json("/task/list").await;
        assert_eq!(status, 200);
        let tasks = list.as_array().unwrap();
        assert_eq!(tasks.len(), 3);

        let ids: Vec<u64> = tasks.iter().map(|t| t["task_id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(tasks[0]["task_status"], "in progress");
        assert_eq!(tasks[0]["queue_index"], -1);
        assert_eq!(tasks[0]["current_iteration"], 1);
        assert_eq!(tasks[1]["task_status"], "in queue");
        assert_eq!(tasks[1]["queue_index"], 0);
        assert_eq!(tasks[2]["task_status"], "in queue");
        assert_eq!(tasks[2]["queue_index"], 1);

        // The interval wait is interrupted, so this returns promptly.
        server.stop().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_submission_creates_nothing() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(1).await;

        let response = server.submit(json!({"n": 3, "d": 2, "I": -1})).await;
        assert_eq!(response.status().as_u16(), 422);
        let body: Value = response.json().await.unwrap();
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("validation error:"));
        assert!(detail.contains("field n1 is required"));
        assert!(detail.contains("field I is not valid"));
        assert!(detail.contains("field TTL is required"));

        let response = server
            .client
            .post(server.url("/task/add"))
            .header("content-type", "application/json")
            .body("{\"n\": ")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);

        let (_, list) = server.get_json("/task/list").await;
        assert!(list.as_array().unwrap().is_empty());

        server.stop().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint_reports_counts() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(1).await;

        let (status, body) = server.get_json("/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "progression-queue");
        assert_eq!(body["tasks"], 0);
        assert_eq!(body["pending"], 0);

        server.stop().await;
    })
    .await
    .expect("test timed out");
}
