use std::time::Duration;

use chrono::{TimeZone, Utc};
use consumer::models::{InsertOutcome, MessageFilter, MessageQuery, NewMessage};
use consumer::{MessageStore, StoreError};

use crate::common::TestEnv;

fn message(raw: &str, capcodes: &[&str], body: &str) -> NewMessage {
    NewMessage {
        raw: raw.to_string(),
        timestamp: Some("2025-01-14 08:00:00".into()),
        priority: Some("A1".into()),
        grip: None,
        capcodes: capcodes.iter().map(|c| c.to_string()).collect(),
        body: Some(body.to_string()),
        received_at: Utc.with_ymd_and_hms(2025, 1, 14, 8, 0, 0).unwrap(),
    }
}

async fn insert_id(env: &TestEnv, msg: NewMessage) -> i32 {
    match env.store.insert(msg).await.expect("insert failed") {
        InsertOutcome::Inserted { id } => id,
        InsertOutcome::DuplicateKey => panic!("unexpected duplicate"),
    }
}

mod schema {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let env = TestEnv::new().await;
        env.store.ensure_schema().await.unwrap();
        env.store.ensure_schema().await.unwrap();

        insert_id(&env, message("FLEX|a", &["001"], "a")).await;
        assert_eq!(env.count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_raw_reports_duplicate_key() {
        let env = TestEnv::new().await;
        insert_id(&env, message("FLEX|same", &["001"], "first")).await;

        let outcome = env
            .store
            .insert(message("FLEX|same", &["002"], "second"))
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::DuplicateKey);
        assert_eq!(env.count().await, 1);
    }

    #[tokio::test]
    async fn test_row_round_trips_through_store() {
        let env = TestEnv::new().await;
        let mut msg = message("FLEX|full", &["001420059", "000923993"], "P 2 Brand");
        msg.grip = Some(2);
        let id = insert_id(&env, msg.clone()).await;

        let by_id = env.store.find_by_id(id).await.unwrap().unwrap();
        let by_raw = env.store.find_by_raw("FLEX|full").await.unwrap().unwrap();
        assert_eq!(by_id, by_raw);
        assert_eq!(by_id.capcodes, msg.capcodes);
        assert_eq!(by_id.grip, Some(2));
        assert_eq!(by_id.timestamp, msg.timestamp);
        assert_eq!(by_id.received_at, msg.received_at);

        assert!(env.store.find_by_id(id + 100).await.unwrap().is_none());
        assert!(env.store.find_by_raw("FLEX|missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_times_out_while_database_locked() {
        let env = TestEnv::new().await;
        let lock = env.hold_write_lock().await;
        let slow = env.store_with_timeout(Duration::from_millis(200));

        let result = slow.insert(message("FLEX|blocked", &["001"], "wacht")).await;
        lock.rollback().await.unwrap();

        match result {
            Err(StoreError::Timeout { op, after }) => {
                assert_eq!(op, "insert");
                assert_eq!(after, Duration::from_millis(200));
            }
            other => panic!("expected insert timeout, got {other:?}"),
        }
    }
}

mod queries {
    use super::*;

    async fn seeded() -> TestEnv {
        let env = TestEnv::new().await;
        insert_id(&env, message("FLEX|A", &["001111111"], "Brand Utrecht")).await;
        insert_id(&env, message("FLEX|B", &["002222222", "001111111"], "Ambulance Leiden")).await;
        insert_id(&env, message("FLEX|C", &["003333333"], "Brand Leiden")).await;
        env
    }

    fn raws(messages: &[consumer::models::PagerMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.raw.as_str()).collect()
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let env = seeded().await;
        let found = env.store.query(&MessageQuery::recent(10)).await.unwrap();
        assert_eq!(raws(&found), vec!["FLEX|C", "FLEX|B", "FLEX|A"]);
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let env = seeded().await;

        let first = env.store.query(&MessageQuery::recent(2)).await.unwrap();
        assert_eq!(raws(&first), vec!["FLEX|C", "FLEX|B"]);

        let rest = env
            .store
            .query(&MessageQuery::recent(2).offset(2))
            .await
            .unwrap();
        assert_eq!(raws(&rest), vec!["FLEX|A"]);
    }

    #[tokio::test]
    async fn test_body_filter() {
        let env = seeded().await;
        let query = MessageQuery::filtered(MessageFilter::BodyContains("Leiden".into()), 10);

        let found = env.store.query(&query).await.unwrap();
        assert_eq!(raws(&found), vec!["FLEX|C", "FLEX|B"]);
        assert_eq!(env.store.count(&query.filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_capcode_filter() {
        let env = seeded().await;
        let query = MessageQuery::filtered(MessageFilter::CapcodeContains("001111111".into()), 10);

        let found = env.store.query(&query).await.unwrap();
        assert_eq!(raws(&found), vec!["FLEX|B", "FLEX|A"]);
    }

    #[tokio::test]
    async fn test_text_filter_matches_body_or_capcode() {
        let env = seeded().await;

        let by_body = MessageQuery::filtered(MessageFilter::Text("Ambulance".into()), 10);
        assert_eq!(raws(&env.store.query(&by_body).await.unwrap()), vec!["FLEX|B"]);

        let by_capcode = MessageQuery::filtered(MessageFilter::Text("003333333".into()), 10);
        assert_eq!(raws(&env.store.query(&by_capcode).await.unwrap()), vec!["FLEX|C"]);

        let nothing = MessageFilter::Text("Rotterdam".into());
        assert_eq!(env.store.count(&nothing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_all() {
        let env = seeded().await;
        assert_eq!(env.store.count(&MessageFilter::Recent).await.unwrap(), 3);
    }
}
