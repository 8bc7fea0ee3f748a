use crate::redis_queue::decode_item;
use crate::{QueueError, RedisQueue};

#[tokio::test]
async fn given_malformed_url_when_connecting_then_invalid_url_error() {
    let result = RedisQueue::connect("not a redis url", "relay:test".into()).await;

    assert!(matches!(result, Err(QueueError::InvalidUrl { .. })));
}

#[test]
fn given_utf8_bytes_when_decoding_popped_item_then_text_returned() {
    let result = decode_item("relay:test", br#"{"user_id":1}"#.to_vec());

    assert_eq!(result.unwrap(), r#"{"user_id":1}"#);
}

#[test]
fn given_invalid_utf8_when_decoding_popped_item_then_invalid_encoding_not_command_failure() {
    // Given
    let bytes = vec![b'{', 0xff, 0xfe, b'}'];

    // When
    let result = decode_item("relay:test", bytes);

    // Then
    match result {
        Err(QueueError::InvalidEncoding { key, source, .. }) => {
            assert_eq!(key, "relay:test");
            assert_eq!(source.into_bytes(), vec![b'{', 0xff, 0xfe, b'}']);
        }
        other => panic!("expected invalid encoding, got {other:?}"),
    }
}
