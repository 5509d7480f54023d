// Adapter behavior against scripted backend replies

use kvcache::backend::Reply;
use kvcache::{ttl, CacheError, Context, KvCache, MockBackend};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn closed() -> CacheError {
    CacheError::Backend("redis: client is closed".to_string())
}

fn setup() -> (MockBackend, KvCache, Context) {
    let mock = MockBackend::new();
    let cache = KvCache::with_backend(Arc::new(mock.clone()));
    (mock, cache, Context::background())
}

#[tokio::test]
async fn test_get_success() {
    let (mock, cache, ctx) = setup();
    mock.expect_get("key1").returns_bytes("\"value1\"");

    let value: serde_json::Value = cache.get(&ctx, "key1").await.unwrap();
    assert_eq!(value, json!("value1"));
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_get_missing_key() {
    let (mock, cache, ctx) = setup();
    mock.expect_get("key2").returns_nil();

    let err = cache.get::<serde_json::Value>(&ctx, "key2").await.unwrap_err();
    assert_eq!(err, CacheError::NotFound("key2".to_string()));
}

#[tokio::test]
async fn test_get_backend_error() {
    let (mock, cache, ctx) = setup();
    mock.expect_get("key3").returns_err(closed());

    let err = cache.get::<serde_json::Value>(&ctx, "key3").await.unwrap_err();
    assert_eq!(err, closed());
}

#[tokio::test]
async fn test_get_decode_error() {
    let (mock, cache, ctx) = setup();
    mock.expect_get("raw").returns_bytes("not json");
    mock.expect_get("number").returns_bytes("42");

    let err = cache.get::<serde_json::Value>(&ctx, "raw").await.unwrap_err();
    assert!(matches!(err, CacheError::Decode(_)));

    // Valid JSON, wrong shape for the target
    let err = cache.get::<Vec<String>>(&ctx, "number").await.unwrap_err();
    assert!(matches!(err, CacheError::Decode(_)));
}

#[tokio::test]
async fn test_put_success() {
    let (mock, cache, ctx) = setup();
    mock.expect_set("key1", "\"value1\"", None).returns_ok();
    mock.expect_set("key2", r#"{"id":7}"#, Some(Duration::from_secs(60)))
        .returns_ok();

    cache.put(&ctx, "key1", "value1", None).await.unwrap();
    cache
        .put(&ctx, "key2", &json!({"id": 7}), Some(Duration::from_secs(60)))
        .await
        .unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_put_encode_error_skips_backend() {
    let (mock, cache, ctx) = setup();

    // JSON object keys must be strings
    let mut value: HashMap<Vec<u8>, i32> = HashMap::new();
    value.insert(vec![1, 2], 3);

    let err = cache.put(&ctx, "key2", &value, None).await.unwrap_err();
    assert!(matches!(err, CacheError::Encode(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_put_encode_error_from_custom_serialize() {
    struct Handle;

    impl Serialize for Handle {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("handles cannot be serialized"))
        }
    }

    let (mock, cache, ctx) = setup();
    let err = cache.put(&ctx, "key", &Handle, None).await.unwrap_err();
    assert!(matches!(err, CacheError::Encode(msg) if msg.contains("handles cannot be serialized")));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_put_backend_error() {
    let (mock, cache, ctx) = setup();
    mock.expect_set("key3", "\"value3\"", None).returns_err(closed());

    let err = cache.put(&ctx, "key3", "value3", None).await.unwrap_err();
    assert!(err.is_backend());
}

#[tokio::test]
async fn test_hgetall_success() {
    let (mock, cache, ctx) = setup();
    let fields: HashMap<String, String> = [("field1", "value1"), ("field2", "value2")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    mock.expect_hgetall("key1").returns(Reply::Hash(fields.clone()));

    assert_eq!(cache.hgetall(&ctx, "key1").await.unwrap(), fields);
}

#[tokio::test]
async fn test_hgetall_empty_is_not_found() {
    let (mock, cache, ctx) = setup();
    mock.expect_hgetall("key2").returns(Reply::Hash(HashMap::new()));
    mock.expect_hgetall("key3").returns_nil();

    let err = cache.hgetall(&ctx, "key2").await.unwrap_err();
    assert_eq!(err, CacheError::NotFound("key2".to_string()));
    let err = cache.hgetall(&ctx, "key3").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_hgetall_backend_error() {
    let (mock, cache, ctx) = setup();
    mock.expect_hgetall("key4").returns_err(closed());

    assert!(cache.hgetall(&ctx, "key4").await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_hset_success() {
    let (mock, cache, ctx) = setup();
    mock.expect_hset("key1", &[("field1", "value1"), ("field2", "value2")])
        .returns_int(2);

    let mut fields = HashMap::new();
    fields.insert("field1", "value1");
    fields.insert("field2", "value2");
    cache.hset(&ctx, "key1", fields).await.unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_hset_plain_string_values() {
    let (mock, cache, ctx) = setup();
    mock.expect_hset("stats", &[("hits", "10"), ("ratio", "0.5")])
        .returns_int(2);

    cache
        .hset(&ctx, "stats", [("hits", 10.0_f64), ("ratio", 0.5)])
        .await
        .unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_hset_backend_error() {
    let (mock, cache, ctx) = setup();
    mock.expect_hset("key2", &[("field1", "value1")])
        .returns_err(closed());

    let err = cache
        .hset(&ctx, "key2", [("field1", "value1")])
        .await
        .unwrap_err();
    assert!(err.is_backend());
}

#[tokio::test]
async fn test_expire() {
    let (mock, cache, ctx) = setup();
    let minute = Duration::from_secs(60);
    mock.expect_expire("key1", minute).returns_bool(true);
    mock.expect_expire("key2", minute).returns_bool(false);
    mock.expect_expire("key3", minute).returns_err(closed());

    cache.expire(&ctx, "key1", minute).await.unwrap();
    // Missing key is not an error
    cache.expire(&ctx, "key2", minute).await.unwrap();
    assert!(cache.expire(&ctx, "key3", minute).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_delete() {
    let (mock, cache, ctx) = setup();
    mock.expect_del(&["key1", "key2"]).returns_int(2);
    mock.expect_del(&["key3", "key4"]).returns_int(0);
    mock.expect_del(&["key5"]).returns_err(closed());

    assert_eq!(cache.delete(&ctx, &["key1", "key2"]).await.unwrap(), 2);
    assert_eq!(cache.delete(&ctx, &["key3", "key4"]).await.unwrap(), 0);
    assert!(cache.delete(&ctx, &["key5"]).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_exists() {
    let (mock, cache, ctx) = setup();
    mock.expect_exists(&["key1", "key2"]).returns_int(2);
    mock.expect_exists(&["key3", "key4"]).returns_int(0);
    mock.expect_exists(&["key5"]).returns_err(closed());

    assert!(cache.exists(&ctx, &["key1", "key2"]).await.unwrap());
    assert!(!cache.exists(&ctx, &["key3", "key4"]).await.unwrap());
    assert!(cache.exists(&ctx, &["key5"]).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_increment_and_decrement() {
    let (mock, cache, ctx) = setup();
    mock.expect_incr_by("key1", 1).returns_int(1);
    mock.expect_incr_by("key2", 1).returns_err(closed());
    mock.expect_decr_by("key1", 1).returns_int(0);
    mock.expect_decr_by("key2", 1).returns_err(closed());

    assert_eq!(cache.increment(&ctx, "key1", 1).await.unwrap(), 1);
    assert!(cache.increment(&ctx, "key2", 1).await.unwrap_err().is_backend());
    assert_eq!(cache.decrement(&ctx, "key1", 1).await.unwrap(), 0);
    assert!(cache.decrement(&ctx, "key2", 1).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_keys() {
    let (mock, cache, ctx) = setup();
    mock.expect_keys("key*")
        .returns(Reply::Keys(vec!["key1".to_string(), "key2".to_string()]));
    mock.expect_keys("nonexistent*").returns(Reply::Keys(Vec::new()));
    mock.expect_keys("key*").returns_err(closed());

    assert_eq!(cache.keys(&ctx, "key*").await.unwrap(), vec!["key1", "key2"]);
    assert!(cache.keys(&ctx, "nonexistent*").await.unwrap().is_empty());
    assert!(cache.keys(&ctx, "key*").await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_ttl_passes_sentinels_through() {
    let (mock, cache, ctx) = setup();
    mock.expect_ttl("key1").returns(Reply::Ttl(chrono::Duration::minutes(1)));
    mock.expect_ttl("key2").returns(Reply::Ttl(ttl::key_missing()));
    mock.expect_ttl("key3").returns(Reply::Ttl(ttl::no_expiry()));
    mock.expect_ttl("key4").returns_err(closed());

    assert_eq!(cache.ttl(&ctx, "key1").await.unwrap(), chrono::Duration::minutes(1));
    assert_eq!(cache.ttl(&ctx, "key2").await.unwrap(), chrono::Duration::seconds(-2));
    assert_eq!(cache.ttl(&ctx, "key3").await.unwrap(), chrono::Duration::seconds(-1));
    assert!(cache.ttl(&ctx, "key4").await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_ping() {
    let (mock, cache, ctx) = setup();
    mock.expect_ping().returns(Reply::Status("PONG".to_string()));
    mock.expect_ping().returns_err(closed());

    cache.ping(&ctx).await.unwrap();
    assert!(cache.ping(&ctx).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_context_forwarded_unmodified() {
    let (mock, cache, ctx) = setup();
    mock.expect_get("key1").returns_bytes("1");
    ctx.cancel();

    let err = cache.get::<i64>(&ctx, "key1").await.unwrap_err();
    assert_eq!(err, CacheError::Backend("context canceled".to_string()));
    assert!(mock.calls().is_empty());
}
