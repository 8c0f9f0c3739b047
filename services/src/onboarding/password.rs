//! Placeholder password generation.
//!
//! Onboarded users sign in with a temporary access pass, so the password set
//! at creation time is never handed out for members. It only has to satisfy
//! the directory's complexity policy.

use rand::Rng;

/// Literal suffix appended to every generated password.
pub const PASSWORD_SUFFIX: &str = "-AC";

const SEGMENTS: usize = 4;
const SEGMENT_MIN: i32 = 100_000_000;

/// Four random 9-or-10 digit integers followed by [`PASSWORD_SUFFIX`].
pub fn generate_placeholder_password() -> String {
    let mut rng = rand::thread_rng();
    let mut password: String = (0..SEGMENTS)
        .map(|_| rng.gen_range(SEGMENT_MIN..i32::MAX).to_string())
        .collect();
    password.push_str(PASSWORD_SUFFIX);
    password
}
