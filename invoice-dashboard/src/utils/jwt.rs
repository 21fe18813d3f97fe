use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

/// The subset of OpenID Connect id token claims the dashboard reads.
#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl IdTokenClaims {
    /// The identifier shown for the signed-in account: the username when
    /// the provider sends one, then the email, then the subject.
    pub fn account_identifier(&self) -> &str {
        self.preferred_username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Decode id token claims without validation.
///
/// The token is received directly from the provider's token endpoint over
/// TLS in exchange for a single-use PKCE-bound code, so the signature is not
/// checked here.
pub fn decode_id_token_claims(token: &str) -> Result<IdTokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: IdTokenClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: serde_json::Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_id_token_claims() {
        let token = token_with(serde_json::json!({
            "sub": "AAAAA-subject",
            "preferred_username": "ada@contoso.com",
            "name": "Ada Lovelace",
            "exp": 9999999999u64
        }));

        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.sub, "AAAAA-subject");
        assert_eq!(claims.account_identifier(), "ada@contoso.com");
        assert_eq!(claims.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_account_identifier_falls_back_to_subject() {
        let token = token_with(serde_json::json!({ "sub": "only-sub" }));
        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.account_identifier(), "only-sub");

        let token = token_with(serde_json::json!({ "sub": "s", "email": "e@x.io" }));
        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.account_identifier(), "e@x.io");
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(decode_id_token_claims("not-a-jwt").is_err());
        assert!(decode_id_token_claims("a.!!!.c").is_err());
        let no_sub = token_with(serde_json::json!({ "name": "x" }));
        assert!(decode_id_token_claims(&no_sub).is_err());
    }
}
