use argon2::Argon2;
use password_hash::{PasswordHash, SaltString};

use crate::error::AppResult;

pub fn hash_password(password: impl AsRef<[u8]>) -> AppResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());

    let hash = PasswordHash::generate(Argon2::default(), password.as_ref(), &salt)
        .map_err(|err| anyhow::anyhow!(err))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is unreadable.
pub fn verify_password(hash: &str, password: impl AsRef<[u8]>) -> AppResult<bool> {
    let hash = PasswordHash::new(hash).map_err(|err| anyhow::anyhow!(err))?;

    Ok(hash
        .verify_password(&[&Argon2::default()], password)
        .is_ok())
}
