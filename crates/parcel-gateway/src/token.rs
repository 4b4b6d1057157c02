use jsonwebtoken::{DecodingKey, Validation, decode};

use parcel_types::api::Claims;

/// Verify an HS256 token from the identity provider and return its claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
