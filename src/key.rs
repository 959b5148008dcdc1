/// Redis key generation. These are a bunch of simple helpers for generating
/// Redis keys. We use helpers to prevent dumb typos.
use uuid::Uuid;

pub fn session(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Maps a reset token to the account it resets.
pub fn password_reset(token: &str) -> String {
    format!("password_reset:{token}")
}

/// Maps an account to its single outstanding reset token.
pub fn password_reset_account(account_id: Uuid) -> String {
    format!("password_reset_account:{}", account_id.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(session("abc"), "session:abc");
        assert_eq!(password_reset("ff00"), "password_reset:ff00");
        assert_eq!(
            password_reset_account(Uuid::nil()),
            "password_reset_account:00000000000000000000000000000000"
        );
    }
}
