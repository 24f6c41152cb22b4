use axolotl_api::types::sanitize_uuid;
use axolotl_api::{Method, Route};

#[test]
fn url_path_is_base_template_then_segments() {
    let request = Route::Channel
        .builder()
        .path("312")
        .path("messages")
        .build();
    assert_eq!(
        request.url("https://api.axolotlclient.com/v1"),
        "https://api.axolotlclient.com/v1/channel/312/messages"
    );
}

#[test]
fn query_string_starts_with_question_mark_and_joins_with_ampersand() {
    let request = Route::User
        .builder()
        .path("1234567890abcdef1234567890abcdef")
        .query("a", "1")
        .query("b", "2")
        .query("c", "3")
        .build();
    assert_eq!(
        request.url("https://base/v1"),
        "https://base/v1/user/1234567890abcdef1234567890abcdef?a=1&b=2&c=3"
    );
}

#[test]
fn methods_map_to_their_http_verbs() {
    assert_eq!(Method::Get.as_str(), "GET");
    assert_eq!(Method::Post.as_str(), "POST");
    assert_eq!(Method::Patch.as_str(), "PATCH");
    assert_eq!(Method::Delete.as_str(), "DELETE");
}

#[test]
fn uuid_sanitization_contract() {
    assert_eq!(
        sanitize_uuid("1234567890abcdef1234567890abcdef").unwrap(),
        "1234567890abcdef1234567890abcdef"
    );
    assert_eq!(
        sanitize_uuid("12345678-90ab-cdef-1234-567890abcdef").unwrap(),
        "1234567890abcdef1234567890abcdef"
    );
    assert!(sanitize_uuid("abc").is_err());
    assert!(sanitize_uuid("").is_err());
    // 36 chars that do not strip down to 32
    assert!(sanitize_uuid("12345678-90ab-cdef-1234-567890abcde").is_err());
}
