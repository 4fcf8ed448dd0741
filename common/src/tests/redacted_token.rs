use crate::RedactedToken;

/// **VALUE**: Verifies tokens never leak through Debug or Display.
///
/// **WHY THIS MATTERS**: Tokens are logged alongside handshake events. A leaked
/// session token in a log file grants full control over the mashup.
///
/// **BUG THIS CATCHES**: Would catch a derived `Debug` replacing the manual impl.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("super-secret-value");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: Neither contains the secret
    assert!(!debug.contains("super-secret-value"));
    assert!(!display.contains("super-secret-value"));
    assert!(debug.contains("18 chars"), "Debug should expose only the length");
}

/// **VALUE**: Verifies exact-match semantics and that empty tokens never match.
///
/// **WHY THIS MATTERS**: Before a handshake there is no session token. An empty
/// request field must not satisfy an empty expected token.
///
/// **BUG THIS CATCHES**: Would catch a plain `==` comparison that lets `"" == ""` pass.
#[test]
fn given_tokens_when_matched_then_only_exact_non_empty_values_match() {
    // GIVEN: A populated and an empty token
    let token = RedactedToken::new("H1");
    let empty = RedactedToken::default();

    // THEN: Exact match only
    assert!(token.matches("H1"));
    assert!(!token.matches("h1"));
    assert!(!token.matches("H1 "));
    assert!(!token.matches(""));
    assert!(!empty.matches(""), "Empty token must never match");
}

/// **VALUE**: Verifies tokens refuse serialization but accept deserialization.
///
/// **WHY THIS MATTERS**: Config files carry the bootstrap token in; nothing
/// should ever write it back out implicitly.
///
/// **BUG THIS CATCHES**: Would catch a derived `Serialize` impl.
#[test]
fn given_token_when_serialized_then_fails_but_deserializes() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        token: RedactedToken,
    }

    // GIVEN: A TOML document with a token
    let holder: Holder = toml::from_str("token = \"abc\"").expect("Should deserialize");
    assert_eq!(holder.token.as_str(), "abc");

    // WHEN: Serializing it back
    let result = toml::to_string(&holder);

    // THEN: Serialization is refused
    assert!(result.is_err(), "Tokens must not serialize");
}
