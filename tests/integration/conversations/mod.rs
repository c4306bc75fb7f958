//! Conversation read endpoint integration tests

use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

use crate::common::{close_conversation, minutes_ago, new_conversation, new_message, TestApp};

mod test_list_conversations {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_empty_list() {
        let app = TestApp::new().await.unwrap();

        let (status, body) = app.get("/conversations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_list_items_carry_latest_message_and_count() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        let latest = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(30))).await;
        app.post_event(new_message(latest, conv, "RECEIVED", "second", &minutes_ago(10)))
            .await;
        app.post_event(new_message(Uuid::new_v4(), conv, "SENT", "first", &minutes_ago(20)))
            .await;

        let (status, body) = app.get("/conversations/").await;

        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], conv.to_string());
        assert_eq!(items[0]["status"], "OPEN");
        assert_eq!(items[0]["message_count"], 2);
        assert_eq!(items[0]["last_message"]["id"], latest.to_string());
        assert_eq!(items[0]["last_message"]["content"], "second");
        assert_eq!(items[0]["last_message"]["direction"], "RECEIVED");

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_conversation_without_messages_has_null_last_message() {
        let app = TestApp::new().await.unwrap();
        app.post_event(new_conversation(Uuid::new_v4(), &minutes_ago(1)))
            .await;

        let (_, body) = app.get("/conversations").await;

        assert!(body[0]["last_message"].is_null());
        assert_eq!(body[0]["message_count"], 0);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_list_returns_every_conversation_without_query() {
        let app = TestApp::new().await.unwrap();
        for _ in 0..60 {
            app.post_event(new_conversation(Uuid::new_v4(), &minutes_ago(1)))
                .await;
        }

        let (status, body) = app.get("/conversations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 60);

        let (_, page) = app.get("/conversations?limit=10").await;
        assert_eq!(page.as_array().unwrap().len(), 10);

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_list_newest_first_and_paginated() {
        let app = TestApp::new().await.unwrap();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            app.post_event(new_conversation(*id, &minutes_ago(5))).await;
            // Every insert shares the fixed clock's created_at; age the earlier rows
            sqlx::query("UPDATE conversations SET created_at = created_at - INTERVAL '1 second' WHERE id <> $1")
                .bind(id)
                .execute(&app.pool)
                .await
                .unwrap();
        }

        let (_, body) = app.get("/conversations").await;
        let listed: Vec<String> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = ids.iter().rev().map(Uuid::to_string).collect();
        assert_eq!(listed, expected);

        let (_, page) = app.get("/conversations?offset=1&limit=1").await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["id"], ids[1].to_string());

        app.cleanup().await.unwrap();
    }
}

mod test_get_conversation {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_detail_returns_messages_in_timestamp_order() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        let first = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(30))).await;
        app.post_event(new_message(Uuid::new_v4(), conv, "SENT", "Thanks!", &minutes_ago(5)))
            .await;
        app.post_event(new_message(first, conv, "RECEIVED", "  Need help  ", &minutes_ago(25)))
            .await;
        app.post_event(close_conversation(conv, &minutes_ago(1))).await;

        let (status, body) = app.get(&format!("/conversations/{conv}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], conv.to_string());
        assert_eq!(body["status"], "CLOSED");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["id"], first.to_string());
        assert_eq!(messages[0]["direction"], "RECEIVED");
        assert_eq!(messages[0]["content"], "  Need help  ");
        assert_eq!(messages[1]["content"], "Thanks!");

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_detail_trailing_slash() {
        let app = TestApp::new().await.unwrap();
        let conv = Uuid::new_v4();
        app.post_event(new_conversation(conv, &minutes_ago(1))).await;

        let (status, body) = app.get(&format!("/conversations/{conv}/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"], json!([]));

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_unknown_conversation_returns_404() {
        let app = TestApp::new().await.unwrap();

        let (status, body) = app
            .get(&format!("/conversations/{}", Uuid::new_v4()))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "conversation not found");

        app.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_non_uuid_id_returns_400() {
        let app = TestApp::new().await.unwrap();

        let (status, _) = app.get("/conversations/12345").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);

        app.cleanup().await.unwrap();
    }
}
