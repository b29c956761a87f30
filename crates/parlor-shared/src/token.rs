//! Signed, purpose-scoped access tokens.
//!
//! Tokens bind a conversation id or a username to the requesting user as an
//! alternative addressing scheme to raw numeric ids. A token is
//! `base64url(claim-json) + "." + base64url(signature)` where the Ed25519
//! signature covers the purpose prefix followed by the claim bytes, so a
//! conversation token can never pass verification as a username token.
//! Tokens older than 24 hours are rejected outright.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::TOKEN_MAX_AGE_SECS;

const CONVERSATION_PURPOSE: &[u8] = b"parlor-conversation-token-v1";
const USERNAME_PURPOSE: &[u8] = b"parlor-username-token-v1";

/// Errors produced when issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token text is not in the `payload.signature` shape or fails to decode.
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match the claim for this purpose and key.
    #[error("Signature mismatch")]
    BadSignature,

    /// Claim is older than the allowed maximum age.
    #[error("Token expired")]
    Expired,

    /// Claim serialization failed.
    #[error("Claim encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Claim for conversation-scoped tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationClaim {
    pub conversation_id: u64,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

/// Claim for username-scoped tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameClaim {
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

trait Claim: Serialize + DeserializeOwned {
    fn issued_at(&self) -> DateTime<Utc>;
}

impl Claim for ConversationClaim {
    fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl Claim for UsernameClaim {
    fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

/// Issues and verifies purpose-scoped signed tokens with a single server key.
pub struct TokenIssuer {
    signing_key: SigningKey,
}

impl TokenIssuer {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Build an issuer from a 32-byte seed (e.g. hex-decoded from config).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Generate a fresh random key. Tokens die with the process; intended
    /// for development and tests.
    pub fn ephemeral() -> Self {
        Self::new(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    pub fn issue_conversation_token(
        &self,
        conversation_id: u64,
        username: &str,
    ) -> Result<String, TokenError> {
        self.issue(
            CONVERSATION_PURPOSE,
            &ConversationClaim {
                conversation_id,
                username: username.to_string(),
                issued_at: Utc::now(),
            },
        )
    }

    pub fn verify_conversation_token(
        &self,
        token: &str,
    ) -> Result<ConversationClaim, TokenError> {
        self.verify(CONVERSATION_PURPOSE, token)
    }

    pub fn issue_username_token(&self, username: &str) -> Result<String, TokenError> {
        self.issue(
            USERNAME_PURPOSE,
            &UsernameClaim {
                username: username.to_string(),
                issued_at: Utc::now(),
            },
        )
    }

    pub fn verify_username_token(&self, token: &str) -> Result<UsernameClaim, TokenError> {
        self.verify(USERNAME_PURPOSE, token)
    }

    fn issue<C: Claim>(&self, purpose: &[u8], claim: &C) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(claim)?;

        let mut signed = Vec::with_capacity(purpose.len() + payload.len());
        signed.extend_from_slice(purpose);
        signed.extend_from_slice(&payload);
        let signature = self.signing_key.sign(&signed);

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    fn verify<C: Claim>(&self, purpose: &[u8], token: &str) -> Result<C, TokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

        let mut signed = Vec::with_capacity(purpose.len() + payload.len());
        signed.extend_from_slice(purpose);
        signed.extend_from_slice(&payload);

        let verifying_key: VerifyingKey = self.signing_key.verifying_key();
        verifying_key
            .verify(&signed, &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claim: C = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if Utc::now() - claim.issued_at() > Duration::seconds(TOKEN_MAX_AGE_SECS) {
            return Err(TokenError::Expired);
        }

        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_token_round_trip() {
        let issuer = TokenIssuer::ephemeral();
        let token = issuer.issue_conversation_token(7, "alice").unwrap();

        let claim = issuer.verify_conversation_token(&token).unwrap();
        assert_eq!(claim.conversation_id, 7);
        assert_eq!(claim.username, "alice");
    }

    #[test]
    fn test_username_token_round_trip() {
        let issuer = TokenIssuer::ephemeral();
        let token = issuer.issue_username_token("bob").unwrap();

        let claim = issuer.verify_username_token(&token).unwrap();
        assert_eq!(claim.username, "bob");
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::ephemeral();
        let stale = ConversationClaim {
            conversation_id: 1,
            username: "alice".to_string(),
            issued_at: Utc::now() - Duration::seconds(TOKEN_MAX_AGE_SECS + 60),
        };
        let token = issuer.issue(CONVERSATION_PURPOSE, &stale).unwrap();

        assert!(matches!(
            issuer.verify_conversation_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = TokenIssuer::ephemeral();
        let other = TokenIssuer::ephemeral();
        let token = issuer.issue_conversation_token(1, "alice").unwrap();

        assert!(matches!(
            other.verify_conversation_token(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_purpose_confusion_rejected() {
        let issuer = TokenIssuer::ephemeral();
        let token = issuer.issue_username_token("alice").unwrap();

        assert!(matches!(
            issuer.verify_conversation_token(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = TokenIssuer::ephemeral();
        let token = issuer.issue_conversation_token(1, "alice").unwrap();

        let (payload_b64, signature_b64) = token.split_once('.').unwrap();
        let mut payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let text = String::from_utf8(payload.clone()).unwrap();
        payload = text.replace("alice", "mallory").into_bytes();
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            signature_b64
        );

        assert!(issuer.verify_conversation_token(&forged).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = TokenIssuer::ephemeral();
        assert!(matches!(
            issuer.verify_conversation_token("not-a-token"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            issuer.verify_conversation_token("a.b"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let seed = [7u8; 32];
        let a = TokenIssuer::from_seed(&seed);
        let b = TokenIssuer::from_seed(&seed);

        let token = a.issue_conversation_token(3, "carol").unwrap();
        assert!(b.verify_conversation_token(&token).is_ok());
    }
}
