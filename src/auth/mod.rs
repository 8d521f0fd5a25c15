/// Authentication module
///
/// Token codec, issuance, validation and revocation, password
/// verification, and the session service that ties them together.

mod claims;
mod issuer;
mod jwt;
mod password;
mod revocation;
mod session;
mod validator;

pub use claims::{Claims, TokenKind, TokenPair, REFRESH_JTI_SUFFIX};
pub use issuer::TokenIssuer;
pub use jwt::{JwtCodec, UnvalidatedClaims, MIN_SECRET_LENGTH};
pub use password::{hash_password, BcryptVerifier, CredentialVerifier, DEFAULT_COST};
pub use revocation::{TokenRevoker, MIN_REVOCATION_TTL};
pub use session::{SessionService, ValidationResult};
pub use validator::TokenValidator;
