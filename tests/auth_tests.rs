//! Unit tests for the session cookie extractor

use axum::extract::FromRequestParts;
use axum::http::Request;
use krishi_mitra::api::ExtractSessionCookie;

async fn extract(cookies: &[&str]) -> Option<String> {
    let mut builder = Request::builder();
    for cookie in cookies {
        builder = builder.header("Cookie", *cookie);
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();
    ExtractSessionCookie::from_request_parts(&mut parts, &())
        .await
        .unwrap()
        .0
}

#[tokio::test]
async fn test_extract_session_cookie_present() {
    let value = extract(&["krishi_session=abc.def"]).await;
    assert_eq!(value.as_deref(), Some("abc.def"));
}

#[tokio::test]
async fn test_extract_session_cookie_missing() {
    assert_eq!(extract(&[]).await, None);
}

#[tokio::test]
async fn test_extract_session_cookie_among_others() {
    let value = extract(&["theme=dark; krishi_session=token.sig ; lang=kn"]).await;
    assert_eq!(value.as_deref(), Some("token.sig"));

    let value = extract(&["theme=dark", "krishi_session=second.header"]).await;
    assert_eq!(value.as_deref(), Some("second.header"));
}

#[tokio::test]
async fn test_extract_session_cookie_empty_or_similar_name() {
    assert_eq!(extract(&["krishi_session="]).await, None);
    assert_eq!(extract(&["krishi_session_old=abc"]).await, None);
}
