//! End-to-end pipeline tests against a live mock server.

use apiline::{ApiRequest, Body, Client, ClientConfig, Error, FormValue, Resolver};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri()))
}

#[tokio::test]
async fn resolves_path_template_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tasks/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "ship"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(ApiRequest::get("/v{api-version}/tasks/{id}").with_path("id", 7))
        .await
        .unwrap();

    assert!(result.ok);
    assert_eq!(result.body["name"], "ship");
}

#[tokio::test]
async fn serializes_arrays_and_nested_objects_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .and(query_param("filter[a]", "1"))
        .and(query_param("filter[b]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .execute(
            ApiRequest::get("/search")
                .with_query("page", 1)
                .with_query("filter", json!({"a": 1, "b": 2}))
                .with_query("skipped", Value::Null),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn sends_bearer_token_and_extra_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("x-env", "staging"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .with_token(Resolver::value("tok-1".into()))
        .with_extra_headers(Resolver::value(vec![(
            "X-Env".to_string(),
            "staging".to_string(),
        )]));

    let result = Client::new(config)
        .execute(ApiRequest::get("/me"))
        .await
        .unwrap();
    assert_eq!(result.body["user"], "alice");
}

#[tokio::test]
async fn posts_json_body_with_inferred_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(ApiRequest::post("/tasks").with_json(json!({"name": "ship"})))
        .await
        .unwrap();
    assert_eq!(result.status, 201);
}

#[tokio::test]
async fn uploads_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": true})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(
            ApiRequest::post("/upload")
                .with_form_field("name", FormValue::Text("report".into()))
                .with_form_field(
                    "file",
                    FormValue::Bytes {
                        data: bytes::Bytes::from_static(b"%PDF-1.4"),
                        file_name: Some("report.pdf".into()),
                        content_type: Some("application/pdf".into()),
                    },
                )
                .with_form_field("dropped", FormValue::Null),
        )
        .await
        .unwrap();
    assert_eq!(result.body["stored"], true);
}

#[tokio::test]
async fn no_content_yields_null_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tasks/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(ApiRequest::delete("/tasks/{id}").with_path("id", 7))
        .await
        .unwrap();
    assert_eq!(result.status, 204);
    assert_eq!(result.body, Value::Null);
}

#[tokio::test]
async fn response_header_mode_returns_header_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("location", "/tasks/42")
                .set_body_json(json!({"id": 42})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(
            ApiRequest::post("/tasks")
                .with_json(json!({"name": "ship"}))
                .with_response_header("location"),
        )
        .await
        .unwrap();
    assert_eq!(result.body, Value::String("/tasks/42".into()));
}

#[tokio::test]
async fn text_bodies_come_back_as_strings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("7.3.1"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .execute(ApiRequest::get("/version"))
        .await
        .unwrap();
    assert_eq!(result.body, Value::String("7.3.1".into()));
}

#[tokio::test]
async fn default_table_maps_known_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "nope"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute(ApiRequest::get("/missing"))
        .await
        .unwrap_err();
    match err {
        Error::Api(e) => {
            assert_eq!(e.status, 404);
            assert_eq!(e.message, "Not Found");
            assert_eq!(e.body["detail"], "nope");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn per_call_label_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute(ApiRequest::get("/missing").with_error(404, "Task not found"))
        .await
        .unwrap_err();
    match err {
        Error::Api(e) => assert_eq!(e.message, "Task not found"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unlabeled_failure_produces_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418).set_body_string("short and stout"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute(ApiRequest::get("/teapot"))
        .await
        .unwrap_err();
    match err {
        Error::Api(e) => {
            assert!(e.message.starts_with("Generic Error:"));
            assert!(e.message.contains("418"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn explicit_body_wins_over_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mixed"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .execute(
            ApiRequest::post("/mixed")
                .with_body(Body::Json(json!({"a": 1})))
                .with_form_field("ignored", FormValue::Text("x".into())),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelling_a_submitted_request_aborts_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let pending = client_for(&server).submit(ApiRequest::get("/slow"));
    let handle = pending.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    assert!(matches!(pending.await, Err(Error::Cancelled)));
}
