use super::*;
use crate::test_utils::setup_kv;
use serde_json::json;

#[tokio::test]
async fn test_put_then_get_roundtrip() {
    let kv = setup_kv();

    kv.put("greeting", &json!({"hello": "world"})).await.unwrap();
    let value: Option<serde_json::Value> = kv.get("greeting").unwrap();

    assert_eq!(value, Some(json!({"hello": "world"})));
}

#[tokio::test]
async fn test_get_missing_key_is_none() {
    let kv = setup_kv();

    let value: Option<serde_json::Value> = kv.get("never_written").unwrap();

    assert_eq!(value, None);
}

#[tokio::test]
async fn test_put_overwrites_existing_value() {
    let kv = setup_kv();

    kv.put("counter", &1u32).await.unwrap();
    kv.put("counter", &2u32).await.unwrap();

    let value: Option<u32> = kv.get("counter").unwrap();
    assert_eq!(value, Some(2));
}

#[tokio::test]
async fn test_delete_reports_whether_key_existed() {
    let kv = setup_kv();

    kv.put("doomed", &"x").await.unwrap();

    assert!(kv.delete("doomed").await.unwrap());
    assert!(!kv.delete("doomed").await.unwrap());

    let value: Option<String> = kv.get("doomed").unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_keys_with_prefix_filters_and_sorts() {
    let kv = setup_kv();

    kv.put("resource.imported.imported/T1/-/001.json", &json!([])).await.unwrap();
    kv.put("resource.imported.imported/T1/-/002.json", &json!([])).await.unwrap();
    kv.put("resource.fallback.v1/index.json", &json!({})).await.unwrap();
    kv.put("user_answers", &json!({})).await.unwrap();

    let imported = kv.keys_with_prefix(keys::IMPORTED_RESOURCE_PREFIX).unwrap();

    assert_eq!(
        imported,
        vec![
            "resource.imported.imported/T1/-/001.json".to_string(),
            "resource.imported.imported/T1/-/002.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_typed_roundtrip_preserves_structure() {
    let kv = setup_kv();

    let answers: std::collections::HashMap<String, crate::models::UserAnswer> =
        [("T1_001_1".to_string(), crate::models::UserAnswer::new("T1_001_1"))]
            .into_iter()
            .collect();

    kv.put(keys::USER_ANSWERS, &answers).await.unwrap();
    let loaded: Option<std::collections::HashMap<String, crate::models::UserAnswer>> =
        kv.get(keys::USER_ANSWERS).unwrap();

    assert_eq!(loaded.unwrap(), answers);
}
