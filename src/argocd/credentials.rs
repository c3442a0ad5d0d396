use crate::error::Error;

/// bcrypt rejects inputs past this length; never truncate silently.
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a CI password for storage: bcrypt at the given work factor, then
/// base64 for safe transport inside a text-valued document field.
pub fn hash_ci_password(plain: &str, cost: u32) -> Result<String, Error> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(Error::Credential(format!(
            "password exceeds {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    let hash = bcrypt::hash(plain, cost).map_err(|e| Error::Credential(e.to_string()))?;
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        hash,
    ))
}

/// Check a plaintext against a stored (base64-encoded) hash.
pub fn verify_ci_password(plain: &str, stored: &str) -> Result<bool, Error> {
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, stored)
        .map_err(|e| Error::Credential(format!("stored hash is not base64: {e}")))?;
    let hash = String::from_utf8(decoded)
        .map_err(|e| Error::Credential(format!("stored hash is not utf-8: {e}")))?;
    bcrypt::verify(plain, &hash).map_err(|e| Error::Credential(e.to_string()))
}
