//! Webhook ingestion integration tests

use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

use crate::common::{
    close_conversation, minutes_ago, new_conversation, new_message, test_now, TestApp,
};

mod test_lifecycle {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_open_message_close_then_late_message() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();

        let (status, body) = app.post_event(new_conversation(conv, &minutes_ago(30))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"status": "success"}));

        let (status, _) = app
            .post_event(new_message(Uuid::new_v4(), conv, "SENT", "hi", &minutes_ago(20)))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.post_event(close_conversation(conv, &minutes_ago(10))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, body) = app
            .post_event(new_message(Uuid::new_v4(), conv, "RECEIVED", "late", &minutes_ago(5)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "cannot add messages to a closed conversation");

        assert_eq!(app.count("messages").await.unwrap(), 1);
        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_close_records_event_timestamp() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(30))).await;

        let (status, _) = app.post_event(close_conversation(conv, &minutes_ago(10))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, closed_at): (String, Option<chrono::DateTime<chrono::Utc>>) =
            sqlx::query_as("SELECT status::TEXT, closed_at FROM conversations WHERE id = $1")
                .bind(conv)
                .fetch_one(&app.pool)
                .await
                .unwrap();
        assert_eq!(status, "CLOSED");
        assert_eq!(closed_at, Some(test_now() - chrono::Duration::minutes(10)));

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_second_close_rejected_and_first_close_kept() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(30))).await;
        app.post_event(close_conversation(conv, &minutes_ago(10))).await;

        let (status, body) = app.post_event(close_conversation(conv, &minutes_ago(1))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conversation already closed");
        let (closed_at,): (chrono::DateTime<chrono::Utc>,) =
            sqlx::query_as("SELECT closed_at FROM conversations WHERE id = $1")
                .bind(conv)
                .fetch_one(&app.pool)
                .await
                .unwrap();
        assert_eq!(closed_at, test_now() - chrono::Duration::minutes(10));

        app.cleanup().await.unwrap();
    }
}

mod test_conflicts {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_duplicate_conversation_returns_400() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();

        let (first, _) = app.post_event(new_conversation(conv, &minutes_ago(2))).await;
        let (second, body) = app.post_event(new_conversation(conv, &minutes_ago(1))).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conversation already exists");
        assert_eq!(app.count("conversations").await.unwrap(), 1);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_duplicate_message_id_returns_400() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        let msg = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(5))).await;

        let (first, _) = app
            .post_event(new_message(msg, conv, "SENT", "one", &minutes_ago(4)))
            .await;
        let (second, body) = app
            .post_event(new_message(msg, conv, "SENT", "two", &minutes_ago(3)))
            .await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "message already exists");
        assert_eq!(app.count("messages").await.unwrap(), 1);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_message_for_unknown_conversation_returns_404() {
        let app = TestApp::new().await.unwrap();

        let (status, body) = app
            .post_event(new_message(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "SENT",
                "hi",
                &minutes_ago(1),
            ))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "conversation not found");
        assert_eq!(app.count("messages").await.unwrap(), 0);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_racing_closes_apply_exactly_once() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(30))).await;

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let router = app.router();
                let event = close_conversation(conv, &minutes_ago(10 - i));
                tokio::spawn(async move {
                    use tower::ServiceExt;
                    router
                        .oneshot(crate::common::webhook_request(&event))
                        .await
                        .unwrap()
                        .status()
                })
            })
            .collect();

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                StatusCode::OK => ok += 1,
                StatusCode::BAD_REQUEST => rejected += 1,
                other => panic!("unexpected status {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(rejected, 5);

        app.cleanup().await.unwrap();
    }
}

mod test_validation {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_future_timestamp_rejected_without_write() {
        let app = TestApp::new().await.unwrap();
        let future = (test_now() + chrono::Duration::seconds(1)).to_rfc3339();

        let (status, body) = app
            .post_event(new_conversation(Uuid::new_v4(), &future))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"]["timestamp"], "Timestamp cannot be in the future.");
        assert_eq!(app.count("conversations").await.unwrap(), 0);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_payload_names_every_bad_field() {
        let app = TestApp::new().await.unwrap();

        let (status, body) = app
            .post_event(json!({
                "type": "NEW_MESSAGE",
                "timestamp": minutes_ago(1),
                "data": {
                    "id": "abc",
                    "direction": "SIDEWAYS",
                    "content": "   ",
                    "conversation_id": "1234"
                }
            }))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields = body["fields"].as_object().unwrap();
        for field in ["data.id", "data.direction", "data.content", "data.conversation_id"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
        assert_eq!(app.count("messages").await.unwrap(), 0);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_envelope_fields() {
        let app = TestApp::new().await.unwrap();

        let (status, body) = app.post_event(json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["type"].is_string());
        assert!(body["fields"]["data"].is_string());

        app.cleanup().await.unwrap();
    }
}
