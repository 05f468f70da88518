use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("group:create", Data::new());
    assert_eq!(frame.syscall, "group:create");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.group_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let group_id = Uuid::new_v4();
    let req = Frame::request("chat:send", Data::new()).with_group_id(group_id);
    let item = req.item(Data::new());

    assert_eq!(item.parent_id, Some(req.id));
    assert_eq!(item.group_id, Some(group_id));
    assert_eq!(item.syscall, "chat:send");
    assert_eq!(item.status, Status::Item);
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("whiteboard:update", Data::new());
    let done = req.done_with(Data::from([("lines".to_string(), serde_json::json!([]))]));

    assert_eq!(done.status, Status::Done);
    assert_eq!(done.parent_id, Some(req.id));
    assert!(done.data.contains_key("lines"));
}

#[test]
fn done_is_terminal() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("whiteboard:update", Data::new());
    assert_eq!(frame.prefix(), "whiteboard");
    assert_eq!(frame.op(), "update");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_round_trip() {
    let group_id = Uuid::new_v4();
    let original = Frame::request("group:join", Data::new())
        .with_group_id(group_id)
        .with_from("test-user")
        .with_data("key", "value");

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.group_id, Some(group_id));
    assert_eq!(restored.syscall, "group:join");
    assert_eq!(restored.from.as_deref(), Some("test-user"));
    assert_eq!(restored.data.get("key").and_then(|v| v.as_str()), Some("value"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("group not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_GROUP_NOT_FOUND"
        }
    }

    let req = Frame::request("group:join", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_GROUP_NOT_FOUND"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("group not found"));
    assert_eq!(
        err.data
            .get("retryable")
            .and_then(serde_json::Value::as_bool),
        Some(false)
    );
}
