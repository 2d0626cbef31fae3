//! Independent verification of previously produced signed results.

use crate::error::PoolError;
use crate::types::SignedResult;
use cipherpool_crypto::signer::verify_signature;
use serde_json::{Map, Value};

/// Minimum plausible length for base58-encoded signatures and public keys.
const MIN_ENCODED_LEN: usize = 32;

/// Check a signed result, possibly produced in another process.
///
/// Shape validation is a precondition, not a cryptographic outcome: a
/// malformed value raises `InvalidInput`, while a well-formed value with a
/// bad signature returns `false`.
pub fn verify_result(input: &Value) -> Result<bool, PoolError> {
    let Some(fields) = input.as_object() else {
        return Err(PoolError::InvalidInput("signed result must be an object".to_string()));
    };

    let payload = fields
        .get("result")
        .ok_or_else(|| PoolError::InvalidInput("signed result is missing \"result\"".to_string()))?;
    let signature = shape_string(fields, "signature")?;
    let public_key = shape_string(fields, "public_key")?;

    Ok(verify_signature(payload, signature, public_key))
}

/// Typed convenience over [`verify_result`].
pub fn verify_signed(result: &SignedResult) -> bool {
    let payload = serde_json::to_value(&result.result).expect("in-memory serialization");
    verify_signature(&payload, &result.signature, &result.public_key)
}

fn shape_string<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, PoolError> {
    let value = fields.get(key).and_then(Value::as_str).ok_or_else(|| {
        PoolError::InvalidInput(format!("signed result field \"{key}\" must be a string"))
    })?;
    if value.len() < MIN_ENCODED_LEN {
        return Err(PoolError::InvalidInput(format!(
            "signed result field \"{key}\" is too short"
        )));
    }
    Ok(value)
}
