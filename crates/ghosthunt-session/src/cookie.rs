//! The session cookie.
//!
//! Both transports carry the credential the same way: a cookie named
//! [`COOKIE_NAME`] whose value is the session token. HTTP requests send it
//! on every call; the push transport sends it once, on the upgrade
//! request.
//!
//! Expiry is the browser's job. The `Max-Age` issued here is a hint; the
//! server-side session lives until `exit` or until its room disappears.

use ghosthunt_protocol::SessionToken;

use crate::SessionError;
use crate::store::TOKEN_LEN;

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "who-is-the-ghost";

/// Extracts the session token from a raw `Cookie` header.
///
/// The header may hold several `name=value` pairs separated by `;`.
///
/// # Errors
/// - [`SessionError::MissingCredential`]: no header, or no session cookie
/// - [`SessionError::MalformedCredential`]: the value is not a token this
///   server could have issued
pub fn token_from_header(
    header: Option<&str>,
) -> Result<SessionToken, SessionError> {
    let header = header.ok_or(SessionError::MissingCredential)?;

    let value = header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .ok_or(SessionError::MissingCredential)?;

    if value.len() != TOKEN_LEN
        || !value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(SessionError::MalformedCredential);
    }

    Ok(SessionToken::new(value))
}

/// Builds the `Set-Cookie` value that hands `token` to the client.
pub fn issue(token: &SessionToken, max_age_secs: u64) -> String {
    format!(
        "{COOKIE_NAME}={}; Max-Age={max_age_secs}; Path=/",
        token.as_str()
    )
}

/// Builds the `Set-Cookie` value that makes the client drop its
/// credential.
pub fn expire() -> String {
    format!("{COOKIE_NAME}=; Max-Age=0; Path=/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_token;

    #[test]
    fn test_token_from_header_finds_session_cookie() {
        let token = generate_token();
        let header = format!("theme=dark; {COOKIE_NAME}={}; lang=ja", token.as_str());

        let parsed = token_from_header(Some(&header)).expect("should parse");
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_token_from_header_missing_header_is_missing_credential() {
        assert!(matches!(
            token_from_header(None),
            Err(SessionError::MissingCredential)
        ));
    }

    #[test]
    fn test_token_from_header_without_session_cookie_is_missing_credential() {
        assert!(matches!(
            token_from_header(Some("theme=dark")),
            Err(SessionError::MissingCredential)
        ));
    }

    #[test]
    fn test_token_from_header_rejects_non_hex_value() {
        let header = format!("{COOKIE_NAME}=not-a-token");
        assert!(matches!(
            token_from_header(Some(&header)),
            Err(SessionError::MalformedCredential)
        ));
    }

    #[test]
    fn test_token_from_header_rejects_uppercase_hex() {
        let header = format!("{COOKIE_NAME}={}", "AB".repeat(16));
        assert!(matches!(
            token_from_header(Some(&header)),
            Err(SessionError::MalformedCredential)
        ));
    }

    #[test]
    fn test_token_from_header_rejects_empty_value() {
        let header = format!("{COOKIE_NAME}=");
        assert!(matches!(
            token_from_header(Some(&header)),
            Err(SessionError::MalformedCredential)
        ));
    }

    #[test]
    fn test_issue_sets_max_age_and_path() {
        let token = SessionToken::new("ab".repeat(16));
        let cookie = issue(&token, 300);
        assert_eq!(
            cookie,
            format!("{COOKIE_NAME}={}; Max-Age=300; Path=/", "ab".repeat(16))
        );
    }

    #[test]
    fn test_issued_cookie_parses_back() {
        let token = generate_token();
        let set_cookie = issue(&token, 300);
        // A browser echoes back only the name=value part.
        let echoed = set_cookie.split(';').next().unwrap();
        assert_eq!(token_from_header(Some(echoed)).unwrap(), token);
    }

    #[test]
    fn test_expire_clears_value() {
        assert_eq!(expire(), format!("{COOKIE_NAME}=; Max-Age=0; Path=/"));
    }
}
