use course_core::model::{Identity, SessionId};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::Clock;

/// Issues the opaque session identities that progress is keyed on.
///
/// There is no credential store behind this: the calling boundary decides who
/// gets a session and whether it is an admin one. Tokens embed a millisecond
/// timestamp plus a random suffix so concurrent logins never collide.
#[derive(Clone)]
pub struct IdentityService {
    clock: Clock,
}

impl IdentityService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    /// Issue a fresh identity.
    ///
    /// # Panics
    ///
    /// Never in practice: generated tokens are always non-empty.
    #[must_use]
    pub fn issue(&self, is_admin: bool) -> Identity {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        let token = format!("session_{}_{}", self.clock.now().timestamp_millis(), suffix);
        let session_id = SessionId::new(token).expect("generated token is non-empty");
        Identity {
            session_id,
            is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_clock;

    #[test]
    fn issued_tokens_carry_the_session_prefix() {
        let service = IdentityService::new(fixed_clock());
        let identity = service.issue(false);
        assert!(identity.session_id.as_str().starts_with("session_"));
        assert!(!identity.is_admin);
    }

    #[test]
    fn issued_tokens_are_unique() {
        let service = IdentityService::new(fixed_clock());
        let a = service.issue(false);
        let b = service.issue(false);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn admin_flag_is_preserved() {
        let service = IdentityService::new(fixed_clock());
        assert!(service.issue(true).is_admin);
    }
}
