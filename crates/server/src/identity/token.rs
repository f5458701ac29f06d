//! Opaque bearer tokens.
//!
//! Wire format is `oat_<row id>.<secret>`. The row id picks the stored token,
//! the secret proves possession. Only the SHA-256 of the secret is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "oat_";
const SECRET_LENGTH: usize = 40;

pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

pub fn format_token(id: i64, secret: &str) -> String {
    format!("{}{}.{}", TOKEN_PREFIX, id, secret)
}

#[derive(Debug, PartialEq)]
pub struct ParsedToken<'a> {
    pub id: i64,
    pub secret: &'a str,
}

pub fn parse_token(raw: &str) -> Option<ParsedToken<'_>> {
    let rest = raw.strip_prefix(TOKEN_PREFIX)?;
    let (id, secret) = rest.split_once('.')?;
    let id = id.parse::<i64>().ok()?;
    if secret.len() != SECRET_LENGTH {
        return None;
    }
    Some(ParsedToken { id, secret })
}

/// Compare a presented secret against a stored digest without an early exit.
pub fn secret_matches(secret: &str, stored_hash: &str) -> bool {
    let presented = hash_secret(secret);
    let (a, b) = (presented.as_bytes(), stored_hash.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
