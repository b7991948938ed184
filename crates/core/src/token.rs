//! Random token generation for invitations and API tokens.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate an alphanumeric token of `len` characters.
///
/// Draws from `thread_rng`, which is a CSPRNG seeded from the OS.
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
