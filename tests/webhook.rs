//! End-to-end tests of the webhook router against an in-memory Deployment store.
//!
//! Requests are driven through the full router (middleware included) with
//! `tower::ServiceExt::oneshot`; no network or cluster is involved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tower::ServiceExt;

use kickover::cluster::{ClusterError, DeploymentStore};
use kickover::config::{AppConfig, RESTARTED_AT_ANNOTATION};
use kickover::{create_router, AppState};

const TOKEN: &str = "s3cret-deploy-token";

/// In-memory store keyed by (namespace, name), recording every call.
#[derive(Default)]
struct MemoryStore {
    deployments: Mutex<HashMap<(String, String), Deployment>>,
    gets: Mutex<Vec<(String, String)>>,
    replaces: Mutex<Vec<(String, String)>>,
    fail_replace: bool,
}

impl MemoryStore {
    fn with(deployments: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.deployments.lock().unwrap();
            for (namespace, name) in deployments {
                map.insert(
                    (namespace.to_string(), name.to_string()),
                    Deployment {
                        metadata: ObjectMeta {
                            name: Some(name.to_string()),
                            namespace: Some(namespace.to_string()),
                            ..Default::default()
                        },
                        spec: Some(DeploymentSpec::default()),
                        ..Default::default()
                    },
                );
            }
        }
        store
    }

    fn restarted_at(&self, namespace: &str, name: &str) -> Option<String> {
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|d| d.spec.as_ref())
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.annotations.as_ref())
            .and_then(|a| a.get(RESTARTED_AT_ANNOTATION).cloned())
    }

    fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    fn replace_count(&self) -> usize {
        self.replaces.lock().unwrap().len()
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        self.gets
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        self.replaces
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        if self.fail_replace {
            return Err(ClusterError::Client("the object has been modified".to_string()));
        }
        self.deployments
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), deployment.clone());
        Ok(deployment.clone())
    }
}

fn app(store: Arc<MemoryStore>) -> Router {
    let mut config = AppConfig::default();
    config.auth.token = Some(TOKEN.to_string());
    config.validate().unwrap();
    create_router(AppState::new(config, store))
}

fn restart_request(token: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body.into()).unwrap()
}

fn body_for(namespace: &str, name: &str) -> String {
    serde_json::json!({ "namespace": namespace, "deploymentName": name }).to_string()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn restarts_existing_deployment() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    let (status, body) = send(
        app(store.clone()),
        restart_request(Some(TOKEN), body_for("prod", "web")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "Received namespace: prod, deployment name: web. Deployment restarted"
    );
    assert_eq!(store.replace_count(), 1);

    let stamp = store.restarted_at("prod", "web").expect("annotation set");
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    let (status, body) = send(
        app(store.clone()),
        restart_request(None, body_for("prod", "web")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Unauthorized");
    assert_eq!(store.get_count(), 0);
    assert_eq!(store.replace_count(), 0);
}

#[tokio::test]
async fn wrong_token_is_unauthorized_regardless_of_body() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    for body in [body_for("prod", "web"), "not json".to_string(), String::new()] {
        let (status, _) = send(app(store.clone()), restart_request(Some("guess"), body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn non_post_methods_are_rejected() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        // With and without credentials: the method check comes first.
        for token in [Some(TOKEN), None] {
            let mut request = restart_request(token, body_for("prod", "web"));
            *request.method_mut() = method.clone();

            let (status, body) = send(app(store.clone()), request).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {token:?}");
            assert_eq!(body, "Invalid request method");
        }
    }
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    for body in ["", "{", r#""prod/web""#, r#"{"namespace": 7, "deploymentName": "web"}"#] {
        let (status, text) = send(app(store.clone()), restart_request(Some(TOKEN), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(text, "Invalid JSON body");
    }
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn missing_fields_reach_the_cluster_and_fail() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    for body in [r#"{"namespace": "prod"}"#, "{}", "null"] {
        let (status, text) = send(app(store.clone()), restart_request(Some(TOKEN), body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body {body:?}");
        assert_eq!(text, "Failed to restart deployment");
    }

    assert_eq!(
        *store.gets.lock().unwrap(),
        vec![
            ("prod".to_string(), String::new()),
            (String::new(), String::new()),
            (String::new(), String::new()),
        ]
    );
    assert_eq!(store.replace_count(), 0);
}

#[tokio::test]
async fn unreadable_body_is_bad_request() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));
    let broken = Body::from_stream(futures::stream::once(async {
        Err::<Bytes, std::io::Error>(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        ))
    }));

    let (status, body) = send(app(store.clone()), restart_request(Some(TOKEN), broken)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Unable to read body");
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn unknown_deployment_fails_without_update() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));

    let (status, body) = send(
        app(store.clone()),
        restart_request(Some(TOKEN), body_for("prod", "missing")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to restart deployment");
    assert_eq!(store.get_count(), 1);
    assert_eq!(store.replace_count(), 0);
}

#[tokio::test]
async fn failed_update_is_server_error() {
    let mut store = MemoryStore::with(&[("prod", "web")]);
    store.fail_replace = true;
    let store = Arc::new(store);

    let (status, body) = send(
        app(store.clone()),
        restart_request(Some(TOKEN), body_for("prod", "web")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to restart deployment");
    assert_eq!(store.replace_count(), 1);
    assert!(store.restarted_at("prod", "web").is_none());
}

#[tokio::test]
async fn concurrent_restarts_do_not_interfere() {
    let store = Arc::new(MemoryStore::with(&[
        ("prod", "web"),
        ("prod", "worker"),
        ("staging", "web"),
    ]));
    let router = app(store.clone());

    let (a, b, c) = tokio::join!(
        send(router.clone(), restart_request(Some(TOKEN), body_for("prod", "web"))),
        send(router.clone(), restart_request(Some(TOKEN), body_for("prod", "worker"))),
        send(router.clone(), restart_request(Some(TOKEN), body_for("staging", "web"))),
    );

    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(c.0, StatusCode::OK);
    assert!(a.1.contains("namespace: prod, deployment name: web."));
    assert!(b.1.contains("namespace: prod, deployment name: worker."));
    assert!(c.1.contains("namespace: staging, deployment name: web."));

    let mut replaced = store.replaces.lock().unwrap().clone();
    replaced.sort();
    assert_eq!(
        replaced,
        vec![
            ("prod".to_string(), "web".to_string()),
            ("prod".to_string(), "worker".to_string()),
            ("staging".to_string(), "web".to_string()),
        ]
    );
    for (namespace, name) in [("prod", "web"), ("prod", "worker"), ("staging", "web")] {
        assert!(store.restarted_at(namespace, name).is_some());
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let store = Arc::new(MemoryStore::default());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(store), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));
    let mut request = restart_request(Some(TOKEN), body_for("prod", "web"));
    request
        .headers_mut()
        .insert("x-request-id", "pipeline-1234".parse().unwrap());

    let response = app(store).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "pipeline-1234"
    );
}

#[tokio::test]
async fn request_id_is_generated_when_absent() {
    let store = Arc::new(MemoryStore::default());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app(store).oneshot(request).await.unwrap();

    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn only_root_path_triggers_restart() {
    let store = Arc::new(MemoryStore::with(&[("prod", "web")]));
    let mut request = restart_request(Some(TOKEN), body_for("prod", "web"));
    *request.uri_mut() = "/restart".parse().unwrap();

    let (status, _) = send(app(store.clone()), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.get_count(), 0);
}
