//! Axum-based chat gateway: entry point for the customer-service chatbot. Config-driven via CoreConfig.
//!
//! Flags:
//! - `--verify`: pre-flight check (config, knowledge base, log path, model endpoint, port), then exit.
//! - `--export-training-data`: write the train/validation datasets for the offline model, then exit.

mod handlers;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use helpdesk_core::{
    export_dataset, ChatEngine, ConversationLog, CoreConfig, IntentModel, KnowledgeBase,
    RemoteIntentModel, DEFAULT_TRAIN_PATH, DEFAULT_TRAIN_RATIO, DEFAULT_VAL_PATH,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) engine: Arc<ChatEngine>,
    pub(crate) log: Arc<ConversationLog>,
}

fn init_tracing(config: &CoreConfig) {
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Pre-flight check: knowledge base parses, log is writable, model endpoint answers, port is free.
async fn run_verify(config: &CoreConfig) -> Result<(), String> {
    print!("Checking knowledge base {}... ", config.knowledge_base_path);
    let kb = KnowledgeBase::load_path(&config.knowledge_base_path)
        .map_err(|e| format!("knowledge base unusable: {}", e))?;
    println!("OK ({} intents)", kb.len());

    print!("Checking conversation log {}... ", config.log_path);
    ConversationLog::new(&config.log_path)
        .check_writable()
        .await
        .map_err(|e| format!("conversation log not writable: {}", e))?;
    println!("OK");

    if config.classifier.enabled {
        print!("Checking intent model... ");
        let model = RemoteIntentModel::connect(&config.classifier)
            .await
            .map_err(|e| format!("intent model misconfigured: {}", e))?;
        if model.is_loaded() {
            println!("OK ({})", model.endpoint());
        } else {
            println!("UNAVAILABLE ({}); keyword matching will be used", model.endpoint());
        }
    }

    let addr = config.bind_addr();
    print!("Checking {}... ", addr);
    match std::net::TcpListener::bind(&addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => return Err(format!("{} BLOCKED: {}", addr, e)),
    }

    println!("\nAll checks passed. Ready to start {}.", config.app_name);
    Ok(())
}

/// Writes the augmented train/validation datasets built from the knowledge base.
fn run_export(config: &CoreConfig) -> Result<(), String> {
    let kb = KnowledgeBase::load_path(&config.knowledge_base_path)
        .map_err(|e| format!("knowledge base unusable: {}", e))?;
    println!("Found {} intents: {}", kb.len(), kb.intent_names().join(", "));

    let stats = export_dataset(
        &kb,
        Path::new(DEFAULT_TRAIN_PATH),
        Path::new(DEFAULT_VAL_PATH),
        DEFAULT_TRAIN_RATIO,
        &mut rand::thread_rng(),
    )
    .map_err(|e| format!("export failed: {}", e))?;

    println!("Total examples: {}", stats.total);
    println!("Training set: {} ({})", stats.train, DEFAULT_TRAIN_PATH);
    println!("Validation set: {} ({})", stats.validation, DEFAULT_VAL_PATH);
    Ok(())
}

/// Loads the knowledge base and attaches the intent model when it is enabled and reachable.
async fn build_engine(config: &CoreConfig) -> ChatEngine {
    let kb = KnowledgeBase::load_or_empty(&config.knowledge_base_path);
    let engine = ChatEngine::new(kb).with_confidence_threshold(config.classifier.confidence_threshold);

    if !config.classifier.enabled {
        tracing::info!("Intent model disabled; using keyword matching");
        return engine;
    }

    match RemoteIntentModel::connect(&config.classifier).await {
        Ok(model) if model.is_loaded() => {
            tracing::info!(endpoint = %model.endpoint(), "Intent model loaded; keyword matching is the fallback");
            let model: Arc<dyn IntentModel> = Arc::new(model);
            engine.with_model(model)
        }
        Ok(_) => {
            tracing::warn!("Intent model not loaded; falling back to keyword matching");
            engine
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error loading intent model; falling back to keyword matching");
            engine
        }
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/classify", post(handlers::chat::classify))
        .route("/health", get(health))
        .with_state(state);

    if config.frontend_enabled {
        let static_dir = Path::new(&config.static_dir);
        // `/` -> index.html, `/static/*` -> CSS and scripts
        app = app
            .route_service("/", ServeFile::new(static_dir.join("index.html")))
            .nest_service("/static", ServeDir::new(static_dir));
    }

    if let Some(cors) = cors_layer(&config.cors_allowed_origins) {
        app = app.layer(cors);
    }
    app.layer(TraceLayer::new_for_http())
}

/// GET /health – liveness check for load balancers and scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "healthy" }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[helpdesk-gateway] .env not loaded: {} (using system environment)", e);
    }

    let config = CoreConfig::load()?;
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--verify") {
        match run_verify(&config).await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.iter().any(|a| a == "--export-training-data") {
        match run_export(&config) {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("EXPORT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    init_tracing(&config);

    let config = Arc::new(config);
    let engine = Arc::new(build_engine(&config).await);
    let log = Arc::new(ConversationLog::new(&config.log_path));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        engine,
        log,
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("{} listening on http://{}", config.app_name, addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use helpdesk_core::{ClassifierConfig, FALLBACK_RESPONSE, UNKNOWN_INTENT};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KB: &str = r#"{
        "greeting": {
            "patterns": ["hello", "hi", "good morning"],
            "responses": ["Hello! How can I help you today?"]
        },
        "order_status": {
            "patterns": ["where is my order", "track my order"],
            "responses": ["Please share your order number and I'll check its status."]
        }
    }"#;

    struct Fixture {
        dir: tempfile::TempDir,
        app: Router,
    }

    impl Fixture {
        fn log_entries(&self) -> Vec<serde_json::Value> {
            let raw = std::fs::read_to_string(self.dir.path().join("conversation_logs.json")).unwrap();
            serde_json::from_str(&raw).unwrap()
        }
    }

    fn fixture_with(engine: ChatEngine, tweak: impl FnOnce(&mut CoreConfig, &Path)) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("index.html"), "<html><body>Support chat</body></html>").unwrap();

        let mut config = CoreConfig {
            log_path: dir.path().join("conversation_logs.json").to_string_lossy().into_owned(),
            static_dir: static_dir.to_string_lossy().into_owned(),
            ..CoreConfig::default()
        };
        tweak(&mut config, dir.path());

        let log = Arc::new(ConversationLog::new(&config.log_path));
        let app = build_app(AppState {
            config: Arc::new(config),
            engine: Arc::new(engine),
            log,
        });
        Fixture { dir, app }
    }

    fn fixture() -> Fixture {
        fixture_with(ChatEngine::new(KnowledgeBase::from_json_str(KB).unwrap()), |_, _| {})
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let fx = fixture();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(fx.app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_chat_detects_intent_and_logs_exchange() {
        let fx = fixture();
        let (status, json) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "Where is my order?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "order_status");
        assert_eq!(json["response"], "Please share your order number and I'll check its status.");
        assert!(json.get("confidence").is_none());

        let entries = fx.log_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["user_message"], "Where is my order?");
        assert_eq!(entries[0]["intent"], "order_status");
        assert_eq!(entries[0]["bot_response"], json["response"]);
    }

    #[tokio::test]
    async fn test_chat_unknown_message_gets_fallback() {
        let fx = fixture();
        let (status, json) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "Tell me a joke about quasars" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], UNKNOWN_INTENT);
        assert_eq!(json["response"], FALLBACK_RESPONSE);
        assert_eq!(fx.log_entries()[0]["intent"], UNKNOWN_INTENT);
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_or_empty_message() {
        let fx = fixture();
        for body in [serde_json::json!({}), serde_json::json!({ "message": "" })] {
            let (status, json) = send(fx.app.clone(), post_json("/chat", &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "No message provided");
        }

        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, json) = send(fx.app.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No message provided");
        assert!(!fx.dir.path().join("conversation_logs.json").exists());
    }

    #[tokio::test]
    async fn test_chat_rejects_long_message() {
        let fx = fixture();
        let (status, json) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "a".repeat(501) })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message too long. Maximum 500 characters allowed.");

        let (status, _) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "a".repeat(500) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_log_failure_is_internal_error() {
        let fx = fixture_with(ChatEngine::new(KnowledgeBase::from_json_str(KB).unwrap()), |config, dir| {
            // a directory cannot be read or replaced as a log file
            config.log_path = dir.to_string_lossy().into_owned();
        });
        let (status, json) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], handlers::INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_chat_reports_model_confidence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "intent": "greeting", "confidence": 0.8765 }]
            })))
            .mount(&server)
            .await;

        let config = CoreConfig {
            classifier: ClassifierConfig {
                enabled: true,
                endpoint: Some(server.uri()),
                ..ClassifierConfig::default()
            },
            ..CoreConfig::default()
        };
        let model = RemoteIntentModel::connect(&config.classifier).await.unwrap();
        assert!(model.is_loaded());
        let engine = ChatEngine::new(KnowledgeBase::from_json_str(KB).unwrap()).with_model(Arc::new(model));

        let fx = fixture_with(engine, |_, _| {});
        let (status, json) = send(
            fx.app.clone(),
            post_json("/chat", &serde_json::json!({ "message": "hey there" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "greeting");
        assert_eq!(json["confidence"], "87.65%");

        let entries = fx.log_entries();
        assert!((entries[0]["confidence"].as_f64().unwrap() - 0.8765).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_build_engine_falls_back_when_model_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let kb_path = dir.path().join("knowledge_base.json");
        std::fs::write(&kb_path, KB).unwrap();
        let config = CoreConfig {
            knowledge_base_path: kb_path.to_string_lossy().into_owned(),
            classifier: ClassifierConfig {
                enabled: true,
                // nothing listens on port 9 (discard) in the test environment
                endpoint: Some("http://127.0.0.1:9".to_string()),
                timeout_ms: 500,
                ..ClassifierConfig::default()
            },
            ..CoreConfig::default()
        };
        let engine = build_engine(&config).await;
        assert!(!engine.model_active());
        assert_eq!(engine.knowledge().len(), 2);
    }

    #[tokio::test]
    async fn test_classify_ranks_intents() {
        let fx = fixture();
        let (status, json) = send(
            fx.app.clone(),
            post_json("/classify", &serde_json::json!({ "message": "hello, track my order", "k": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["source"], "keyword");
        let predictions = json["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0]["intent"], "order_status");
        assert!(!fx.dir.path().join("conversation_logs.json").exists());
    }

    /// Twelve intents that all score on "help".
    fn wide_engine() -> ChatEngine {
        let entries: serde_json::Map<String, serde_json::Value> = (0..12)
            .map(|i| {
                (
                    format!("topic_{}", i),
                    serde_json::json!({ "patterns": ["help"], "responses": ["ok"] }),
                )
            })
            .collect();
        let raw = serde_json::Value::Object(entries).to_string();
        ChatEngine::new(KnowledgeBase::from_json_str(&raw).unwrap())
    }

    async fn classify_count(app: Router, body: serde_json::Value) -> usize {
        let (status, json) = send(app, post_json("/classify", &body)).await;
        assert_eq!(status, StatusCode::OK);
        json["predictions"].as_array().unwrap().len()
    }

    #[tokio::test]
    async fn test_classify_k_defaults_and_clamps() {
        let fx = fixture_with(wide_engine(), |_, _| {});
        assert_eq!(classify_count(fx.app.clone(), serde_json::json!({ "message": "help" })).await, 3);
        assert_eq!(classify_count(fx.app.clone(), serde_json::json!({ "message": "help", "k": 0 })).await, 1);
        assert_eq!(classify_count(fx.app.clone(), serde_json::json!({ "message": "help", "k": 50 })).await, 10);
        assert_eq!(classify_count(fx.app.clone(), serde_json::json!({ "message": "help", "k": 7 })).await, 7);
    }

    #[tokio::test]
    async fn test_classify_rejects_bad_input() {
        let fx = fixture();
        let req = Request::builder()
            .method("POST")
            .uri("/classify")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(fx.app.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No message provided");

        let (status, json) = send(
            fx.app.clone(),
            post_json("/classify", &serde_json::json!({ "message": "a".repeat(501), "k": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message too long. Maximum 500 characters allowed.");

        let (status, _) = send(fx.app.clone(), post_json("/classify", &serde_json::json!({ "k": 2 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_classify_without_match_reports_none() {
        let fx = fixture();
        let (status, json) = send(
            fx.app.clone(),
            post_json("/classify", &serde_json::json!({ "message": "quasars" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["source"], "none");
        assert!(json["predictions"].as_array().unwrap().is_empty());
    }

    /// Knowledge base and log inside `dir`, bound to a port that was free a moment ago.
    fn verify_config(dir: &Path) -> CoreConfig {
        let kb_path = dir.join("knowledge_base.json");
        std::fs::write(&kb_path, KB).unwrap();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        CoreConfig {
            knowledge_base_path: kb_path.to_string_lossy().into_owned(),
            log_path: dir.join("logs").join("conversation_logs.json").to_string_lossy().into_owned(),
            port,
            ..CoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_verify_passes_on_valid_setup() {
        let dir = tempfile::tempdir().unwrap();
        let config = verify_config(dir.path());
        assert_eq!(run_verify(&config).await, Ok(()));
    }

    #[tokio::test]
    async fn test_verify_fails_on_missing_or_malformed_knowledge_base() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = verify_config(dir.path());

        config.knowledge_base_path = dir.path().join("absent.json").to_string_lossy().into_owned();
        let err = run_verify(&config).await.unwrap_err();
        assert!(err.contains("knowledge base"), "{}", err);

        let malformed = dir.path().join("malformed.json");
        std::fs::write(&malformed, "{ \"greeting\": ").unwrap();
        config.knowledge_base_path = malformed.to_string_lossy().into_owned();
        let err = run_verify(&config).await.unwrap_err();
        assert!(err.contains("knowledge base"), "{}", err);
    }

    #[tokio::test]
    async fn test_verify_fails_when_log_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = verify_config(dir.path());
        config.log_path = dir.path().to_string_lossy().into_owned();
        let err = run_verify(&config).await.unwrap_err();
        assert!(err.contains("conversation log"), "{}", err);
    }

    #[tokio::test]
    async fn test_verify_fails_when_port_is_taken() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = verify_config(dir.path());
        let held = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        config.port = held.local_addr().unwrap().port();
        let err = run_verify(&config).await.unwrap_err();
        assert!(err.contains("BLOCKED"), "{}", err);
    }

    #[tokio::test]
    async fn test_frontend_index_served() {
        let fx = fixture();
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = fx.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Support chat"));
    }

    #[tokio::test]
    async fn test_frontend_disabled() {
        let fx = fixture_with(ChatEngine::new(KnowledgeBase::default()), |config, _| {
            config.frontend_enabled = false;
        });
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = fx.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let fx = fixture_with(ChatEngine::new(KnowledgeBase::default()), |config, _| {
            config.cors_allowed_origins = vec!["http://localhost:3000".to_string()];
        });
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let res = fx.app.clone().oneshot(req).await.unwrap();
        assert_eq!(
            res.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_cors_layer_skipped_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["http://localhost:3000".to_string()]).is_some());
    }
}
