/// JWT Token Codec
///
/// Encodes claim sets into HS256 compact tokens
/// (`base64url(header).base64url(payload).base64url(signature)`) and decodes
/// them back. Pure and synchronous: no clock, no cache.
///
/// Decoding only proves the token was signed with our secret and parses the
/// claim set. Expiry, required claims and revocation are the validator's job.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::claims::{Claims, TokenKind};
use crate::error::{AppError, TokenError};

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;
const SIGNING_ALGORITHM_NAME: &str = "HS256";

/// On-the-wire claim set; refresh tokens leave out `name` and `roles`
#[derive(Serialize)]
struct WireClaims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<&'a [String]>,
    jti: &'a str,
    iat: i64,
    exp: i64,
}

impl<'a> From<&'a Claims> for WireClaims<'a> {
    fn from(claims: &'a Claims) -> Self {
        let (name, roles) = match &claims.kind {
            TokenKind::Access { name, roles } => (Some(name.as_str()), Some(roles.as_slice())),
            TokenKind::Refresh => (None, None),
        };
        Self {
            sub: &claims.sub,
            name,
            roles,
            jti: &claims.jti,
            iat: claims.iat,
            exp: claims.exp,
        }
    }
}

/// Claim set of a token whose signature checked out
///
/// Nothing is required yet; `exp` is kept as raw JSON so a non-numeric
/// value can be told apart from a malformed payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnvalidatedClaims {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub jti: Option<String>,
    pub iat: Option<i64>,
    pub exp: Option<serde_json::Value>,
}

impl UnvalidatedClaims {
    /// `exp` as whole seconds, if present and numeric
    pub fn exp_timestamp(&self) -> Option<i64> {
        match self.exp.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

/// HS256 token codec bound to one pre-shared secret
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// # Errors
    /// `ConfigurationFatal` if the secret is empty or shorter than
    /// [`MIN_SECRET_LENGTH`] bytes
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::ConfigurationFatal(
                "JWT signing secret is empty".to_string(),
            ));
        }
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::ConfigurationFatal(format!(
                "JWT signing secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Expiry is checked against the injected clock by the validator
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a claim set
    ///
    /// # Errors
    /// `Internal` if signing fails
    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(
            &Header::new(SIGNING_ALGORITHM),
            &WireClaims::from(claims),
            &self.encoding_key,
        )
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify structure, algorithm and signature, then parse the claims
    ///
    /// # Errors
    /// - `MalformedToken` if the token is not a three-part compact JWS or the
    ///   payload is not a claim object
    /// - `BadSignature` if the header names another algorithm or the
    ///   signature does not verify
    pub fn decode(&self, token: &str) -> Result<UnvalidatedClaims, AppError> {
        let mut segments = token.split('.');
        let (header, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(header), Some(payload), Some(signature), None)
                if !header.is_empty() && !payload.is_empty() =>
            {
                (header, signature)
            }
            _ => {
                return Err(AppError::malformed(
                    "expected three dot-separated segments",
                ))
            }
        };

        let header = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<RawHeader>(&bytes).ok())
            .ok_or_else(|| AppError::malformed("header is not base64url-encoded JSON"))?;

        match header.alg.as_deref() {
            Some(SIGNING_ALGORITHM_NAME) => {}
            Some(other) => {
                tracing::warn!(alg = other, "Rejected token with unexpected signing algorithm");
                return Err(TokenError::BadSignature.into());
            }
            None => return Err(AppError::malformed("header has no alg")),
        }

        if signature.is_empty() || URL_SAFE_NO_PAD.decode(signature).is_err() {
            return Err(TokenError::BadSignature.into());
        }

        decode::<UnvalidatedClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidAlgorithm
                | JwtErrorKind::InvalidAlgorithmName
                | JwtErrorKind::MissingAlgorithm => TokenError::BadSignature.into(),
                _ => AppError::malformed(e.to_string()),
            })
    }
}
