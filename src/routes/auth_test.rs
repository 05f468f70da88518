use super::*;

// =============================================================================
// env_bool — uses unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on"].iter().enumerate() {
        let key = format!("__TEST_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__TEST_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_returns_none() {
    let key = "__TEST_EB_INVALID_4417__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_bool_unset_returns_none() {
    assert_eq!(env_bool("__TEST_EB_SURELY_UNSET_ABC_17__"), None);
}

// =============================================================================
// COOKIES
// =============================================================================

#[test]
fn session_cookie_is_http_only_on_root_path() {
    let cookie = session_cookie("tok".to_string());
    assert_eq!(cookie.name(), "session_token");
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
}

#[test]
fn clearing_cookie_expires_immediately() {
    let cookie = clear_session_cookie();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn auth_errors_map_to_distinct_statuses() {
    let cases = [
        (AuthError::InvalidEmail, StatusCode::BAD_REQUEST),
        (AuthError::WrongDomain("bmsce.ac.in".into()), StatusCode::BAD_REQUEST),
        (AuthError::WeakPassword, StatusCode::BAD_REQUEST),
        (AuthError::EmailTaken, StatusCode::CONFLICT),
        (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
    ];
    for (err, expected) in cases {
        let response = auth_error_response(&err);
        assert_eq!(response.status(), expected, "{err}");
    }
}
