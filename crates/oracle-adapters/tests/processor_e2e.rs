//! End-to-end request-processor scenarios.

use oracle_adapters::handlers::{openai_handler_spec, twitter_handler_spec};
use oracle_adapters::registry::IntegrationRegistry;
use oracle_adapters::RequestProcessor;
use oracle_domain::{EventId, RequestEvent, RequestParams};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORACLE_ADDRESS: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn event(url: String, pick: &str, oracle: &str) -> RequestEvent {
    RequestEvent {
        request_id: "req-1".to_string(),
        oracle: oracle.to_string(),
        params: RequestParams {
            url,
            method: "GET".to_string(),
            headers: String::new(),
            body: String::new(),
        },
        pick: pick.to_string(),
        notify: None,
        event_id: EventId::new("handle-1", 1),
        event_index: 0,
        raw_payload: "{}".to_string(),
    }
}

#[tokio::test]
async fn happy_path_projects_followers_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/elonmusk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"public_metrics": {"followers_count": 12345}}
        })))
        .mount(&server)
        .await;

    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    let mut spec = twitter_handler_spec();
    spec.hosts = [server_host(&server)].into_iter().collect();
    spec.auth = oracle_domain::AuthKind::None;
    registry.register(spec);

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let ev = event(
        format!("{}/2/users/by/username/elonmusk", server.uri()),
        ".data.public_metrics.followers_count",
        ORACLE_ADDRESS,
    );

    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.message, "12345");
}

#[tokio::test]
async fn unsupported_host_yields_406() {
    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    registry.register(twitter_handler_spec());

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let ev = event(
        "https://evil.example.com/x".to_string(),
        ".",
        ORACLE_ADDRESS,
    );
    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 406);
    assert_eq!(outcome.message, "URL Not supported");
}

#[tokio::test]
async fn foreign_oracle_is_ignored() {
    let registry = IntegrationRegistry::new(reqwest::Client::new());
    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let ev = event(
        "https://api.x.com/2/tweets".to_string(),
        ".",
        "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
    );
    assert!(processor.process(&ev).await.is_none());
}

#[tokio::test]
async fn upstream_error_is_reported_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"error":"unauthorized"}"#),
        )
        .mount(&server)
        .await;

    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    let mut spec = twitter_handler_spec();
    spec.hosts = [server_host(&server)].into_iter().collect();
    spec.auth = oracle_domain::AuthKind::None;
    registry.register(spec);

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let ev = event(
        format!("{}/2/tweets", server.uri()),
        ".",
        ORACLE_ADDRESS,
    );
    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 401);
    assert_eq!(outcome.message, r#"{"error":"unauthorized"}"#);
}

#[tokio::test]
async fn pick_failure_yields_409() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/elonmusk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}})))
        .mount(&server)
        .await;

    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    let mut spec = twitter_handler_spec();
    spec.hosts = [server_host(&server)].into_iter().collect();
    spec.auth = oracle_domain::AuthKind::None;
    registry.register(spec);

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let ev = event(
        format!("{}/2/users/by/username/elonmusk", server.uri()),
        ".data.public_metrics.followers_count",
        ORACLE_ADDRESS,
    );
    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 409);
    assert_eq!(
        outcome.message,
        "'Pick' value provided could not be resolved on the returned response"
    );
}

#[tokio::test]
async fn openai_handler_rejects_non_gpt4o_model() {
    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    registry.register(openai_handler_spec("test-token".into(), vec![]));

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let mut ev = event(
        "https://api.openai.com/v1/chat/completions".to_string(),
        ".",
        ORACLE_ADDRESS,
    );
    ev.params.method = "POST".to_string();
    ev.params.body = r#"{"model":"gpt-3.5-turbo","messages":[{"role":"user","content":"hi"}]}"#
        .to_string();

    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 406);
    assert_eq!(outcome.message, "Invalid Payload");
}

#[tokio::test]
async fn unrecognised_http_method_yields_500() {
    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    registry.register(twitter_handler_spec());

    let processor = RequestProcessor {
        orchestrator_address: ORACLE_ADDRESS,
        registry: &registry,
        proof_verifier: None,
    };

    let mut ev = event("https://api.x.com/2/tweets".to_string(), ".", ORACLE_ADDRESS);
    ev.params.method = "TRACE".to_string();

    let outcome = processor.process(&ev).await.unwrap();
    assert_eq!(outcome.status, 500);
    assert_eq!(outcome.message, "Unexpected error");
}

fn server_host(server: &MockServer) -> String {
    reqwest::Url::parse(&server.uri())
        .unwrap()
        .host_str()
        .unwrap()
        .to_string()
}
