use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::AppState;
use super::handlers::ApiResponse;

type HmacSha1 = Hmac<Sha1>;

/// `sha1=<hex>` signature GitHub sends in `X-Hub-Signature`.
pub(crate) fn hub_signature(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

/// The header must equal the computed signature byte for byte.
pub(crate) fn verify_hub_signature(body: &[u8], secret: &str, header: &str) -> bool {
    match hub_signature(body, secret) {
        Some(expected) => constant_time_eq(header.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

/// Check an `Authorization: token <secret>` header against the configured
/// log access token.
pub(crate) fn check_log_token(header: Option<&str>, expected: &str) -> Result<(), &'static str> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err("No authorization provided."),
    };
    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() != 2 {
        return Err("Authorization format invalid.");
    }
    if !parts[0].eq_ignore_ascii_case("token") {
        return Err("Authorization type invalid.");
    }
    // An unset token never authorizes anyone.
    if expected.is_empty() || !constant_time_eq(parts[1].as_bytes(), expected.as_bytes()) {
        return Err("Authorization token invalid.");
    }
    Ok(())
}

pub(crate) async fn require_log_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match check_log_token(header, &state.config.github.log_access_token) {
        Ok(()) => next.run(req).await,
        Err(reason) => {
            let status = StatusCode::UNAUTHORIZED;
            ApiResponse::error(status.as_u16(), reason).with_status(status)
        }
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_vector() {
        // HMAC-SHA1("key", "The quick brown fox jumps over the lazy dog")
        let sig = hub_signature(b"The quick brown fox jumps over the lazy dog", "key").unwrap();
        assert_eq!(sig, "sha1=de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9");
    }

    #[test]
    fn verify_accepts_exact_signature_only() {
        let body = br#"{"action":"closed"}"#;
        let sig = hub_signature(body, "s3cret").unwrap();
        assert!(verify_hub_signature(body, "s3cret", &sig));
        assert!(!verify_hub_signature(body, "other", &sig));
        assert!(!verify_hub_signature(body, "s3cret", &sig.to_uppercase()));
        assert!(!verify_hub_signature(body, "s3cret", sig.trim_start_matches("sha1=")));
        assert!(!verify_hub_signature(body, "s3cret", &format!("{} ", sig)));
        assert!(!verify_hub_signature(body, "s3cret", ""));
    }

    #[test]
    fn any_single_bit_flip_rejects() {
        let body = br#"{"action":"closed","number":1}"#.to_vec();
        let sig = hub_signature(&body, "s3cret").unwrap();

        for i in 0..body.len() {
            for bit in 0..8 {
                let mut mutated = body.clone();
                mutated[i] ^= 1 << bit;
                assert!(!verify_hub_signature(&mutated, "s3cret", &sig));
            }
        }
        let header = sig.as_bytes().to_vec();
        for i in 0..header.len() {
            for bit in 0..8 {
                let mut mutated = header.clone();
                mutated[i] ^= 1 << bit;
                let mutated = String::from_utf8_lossy(&mutated).to_string();
                assert!(!verify_hub_signature(&body, "s3cret", &mutated));
            }
        }
    }

    #[test]
    fn log_token_reasons() {
        assert_eq!(check_log_token(None, "t"), Err("No authorization provided."));
        assert_eq!(check_log_token(Some(""), "t"), Err("No authorization provided."));
        assert_eq!(
            check_log_token(Some("token"), "t"),
            Err("Authorization format invalid.")
        );
        assert_eq!(
            check_log_token(Some("token a b"), "t"),
            Err("Authorization format invalid.")
        );
        assert_eq!(
            check_log_token(Some("Bearer t"), "t"),
            Err("Authorization type invalid.")
        );
        assert_eq!(
            check_log_token(Some("token wrong"), "t"),
            Err("Authorization token invalid.")
        );
        assert_eq!(check_log_token(Some("token t"), "t"), Ok(()));
        assert_eq!(check_log_token(Some("TOKEN t"), "t"), Ok(()));
    }

    #[test]
    fn unset_log_token_rejects_everything() {
        assert_eq!(
            check_log_token(Some("token "), ""),
            Err("Authorization token invalid.")
        );
    }
}
