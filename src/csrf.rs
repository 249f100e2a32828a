use rand::Rng;

/// Number of random bytes behind each state nonce.
pub const STATE_BYTES: usize = 16;

/// Generates a cryptographically random `OAuth2` state parameter.
///
/// Returns a 32-character lowercase hex string (16 random bytes).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; STATE_BYTES] = rand::rng().random();
    hex::encode(random_bytes)
}
