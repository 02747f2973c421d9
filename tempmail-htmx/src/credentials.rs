//! Random credentials for quick mail

use rand::seq::SliceRandom;
use rand::Rng;

const USERNAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+[]{}|;:,.<>?";

/// Shortest password the generator produces; one character per class
pub const MIN_PASSWORD_LENGTH: usize = 4;

fn pick<R: Rng + ?Sized>(rng: &mut R, set: &[u8]) -> char {
    char::from(set[rng.gen_range(0..set.len())])
}

/// Username of `length` characters from `[a-z0-9]`
pub fn username_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length).map(|_| pick(rng, USERNAME_CHARS)).collect()
}

/// Password with at least one lowercase, uppercase, digit and symbol, shuffled
///
/// `length` is raised to [`MIN_PASSWORD_LENGTH`] when shorter.
pub fn password_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let all: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    let mut chars = vec![
        pick(rng, LOWERCASE),
        pick(rng, UPPERCASE),
        pick(rng, DIGITS),
        pick(rng, SYMBOLS),
    ];
    while chars.len() < length.max(MIN_PASSWORD_LENGTH) {
        chars.push(pick(rng, &all));
    }
    chars.shuffle(rng);
    chars.into_iter().collect()
}

/// Random username using the thread-local generator
#[must_use]
pub fn random_username(length: usize) -> String {
    username_with(&mut rand::thread_rng(), length)
}

/// Random password using the thread-local generator
#[must_use]
pub fn random_password(length: usize) -> String {
    password_with(&mut rand::thread_rng(), length)
}
