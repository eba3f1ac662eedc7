use axum::http::StatusCode;
use axum_test::TestServer;
use confess::api::{create_router_with_config, ErrorResponse, SecurityConfig};
use confess::db::Database;
use confess::models::*;

fn setup() -> TestServer {
    setup_with_config(SecurityConfig::disabled())
}

fn setup_with_config(config: SecurityConfig) -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router_with_config(db, config);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create(
    server: &TestServer,
    recipient: &str,
    sender: &str,
    message: &str,
) -> ConfessionRecord {
    let response = server
        .post("/api/confessions")
        .json(&CreateConfessionInput::new(recipient, sender, message))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<ConfessionRecord>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        let response = server.get("/api/health").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "status": "ok" }));
    }
}

mod create_confession {
    use super::*;

    #[tokio::test]
    async fn returns_created_record() {
        let server = setup();

        let record = create(&server, "Alice", "Bob", "hi").await;

        assert_eq!(record.recipient_name, "Alice");
        assert_eq!(record.sender_name, "Bob");
        assert_eq!(record.message, "hi");
    }

    #[tokio::test]
    async fn uses_camel_case_wire_format() {
        let server = setup();

        let response = server
            .post("/api/confessions")
            .json(&serde_json::json!({
                "recipientName": "Alice",
                "senderName": "Bob",
                "message": "hi"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["recipientName"], "Alice");
        assert_eq!(body["senderName"], "Bob");
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn rejects_empty_recipient_with_field_list() {
        let server = setup();

        let response = server
            .post("/api/confessions")
            .json(&CreateConfessionInput::new("", "Bob", "hi"))
            .await;

        response.assert_status_bad_request();
        let body: ErrorResponse = response.json();
        assert_eq!(body.fields, vec![ConfessionField::RecipientName]);
    }

    #[tokio::test]
    async fn reports_every_missing_field() {
        let server = setup();

        let response = server
            .post("/api/confessions")
            .json(&serde_json::json!({ "message": "   " }))
            .await;

        response.assert_status_bad_request();
        let body: ErrorResponse = response.json();
        assert_eq!(
            body.fields,
            vec![
                ConfessionField::RecipientName,
                ConfessionField::SenderName,
                ConfessionField::Message
            ]
        );
    }

    #[tokio::test]
    async fn identical_requests_create_distinct_records() {
        let server = setup();

        let first = create(&server, "Alice", "Bob", "hi").await;
        let second = create(&server, "Alice", "Bob", "hi").await;

        assert_ne!(first.id, second.id);
    }
}

mod get_confession {
    use super::*;

    #[tokio::test]
    async fn returns_record_by_id() {
        let server = setup();
        let created = create(&server, "Alice", "Bob", "line one\n  line two").await;

        let response = server
            .get(&format!("/api/confessions/{}", created.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<ConfessionRecord>(), created);
    }

    #[tokio::test]
    async fn returns_not_found_for_unknown_uuid() {
        let server = setup();

        let response = server
            .get(&format!("/api/confessions/{}", uuid::Uuid::new_v4()))
            .await;

        response.assert_status_not_found();
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Confession not found");
        assert!(body.fields.is_empty());
    }

    #[tokio::test]
    async fn returns_not_found_for_non_uuid_id() {
        let server = setup();

        let response = server.get("/api/confessions/nonexistent-id").await;

        response.assert_status_not_found();
    }
}

mod rate_limiting {
    use super::*;

    #[tokio::test]
    async fn throttles_creates_over_the_limit() {
        let server = setup_with_config(SecurityConfig::with_rate_limit(2));

        create(&server, "Alice", "Bob", "one").await;
        create(&server, "Alice", "Bob", "two").await;

        let response = server
            .post("/api/confessions")
            .json(&CreateConfessionInput::new("Alice", "Bob", "three"))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn does_not_throttle_reads() {
        let server = setup_with_config(SecurityConfig::with_rate_limit(1));
        let created = create(&server, "Alice", "Bob", "hi").await;

        for _ in 0..3 {
            server
                .get(&format!("/api/confessions/{}", created.id))
                .await
                .assert_status_ok();
        }
    }

    #[tokio::test]
    async fn limits_each_forwarded_client_separately_behind_a_trusted_proxy() {
        let server =
            setup_with_config(SecurityConfig::with_rate_limit(1).trusting_proxy_headers());

        server
            .post("/api/confessions")
            .add_header("X-Forwarded-For", "203.0.113.1")
            .json(&CreateConfessionInput::new("Alice", "Bob", "hi"))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/api/confessions")
            .add_header("X-Forwarded-For", "203.0.113.2")
            .json(&CreateConfessionInput::new("Alice", "Bob", "hi"))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn rotating_forwarded_header_does_not_bypass_limit() {
        let server = setup_with_config(SecurityConfig::with_rate_limit(1));

        server
            .post("/api/confessions")
            .add_header("X-Forwarded-For", "203.0.113.1")
            .json(&CreateConfessionInput::new("Alice", "Bob", "hi"))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/api/confessions")
            .add_header("X-Forwarded-For", "203.0.113.2")
            .json(&CreateConfessionInput::new("Alice", "Bob", "hi"))
            .await
            .assert_status(StatusCode::TOO_MANY_REQUESTS);
    }
}

mod cors {
    use super::*;

    #[tokio::test]
    async fn allows_configured_origin() {
        let server = setup_with_config(SecurityConfig::with_cors_origins(vec![
            "https://love.example".to_string(),
        ]));

        let response = server
            .get("/api/health")
            .add_header("Origin", "https://love.example")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header("access-control-allow-origin"),
            "https://love.example"
        );
    }
}
