//! Anonymous identity used to scope a user's notes collection.

use crate::Result;
use log::warn;

/// Something that can hand out a stable anonymous user id.
pub trait IdentityProvider {
    fn sign_in_anonymously(&self) -> Result<String>;
}

pub const SIGN_IN_FAILED: &str = "Could not sign in. Some features may be unavailable.";

/// Outcome of signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    /// Sign-in failed and `user_id` is a throwaway local id. Writes made in this
    /// mode land in a collection no later session will read.
    pub degraded: bool,
}

impl Session {
    /// Sign in, falling back to a `fallback-<uuid>` id when the provider fails.
    pub fn establish<P: IdentityProvider + ?Sized>(provider: &P) -> Self {
        match provider.sign_in_anonymously() {
            Ok(user_id) => Self {
                user_id,
                degraded: false,
            },
            Err(err) => {
                warn!("event=sign_in_failed error={}", err);
                Self {
                    user_id: format!("fallback-{}", uuid::Uuid::new_v4()),
                    degraded: true,
                }
            }
        }
    }

    /// First ten characters of the user id, for display
    pub fn short_id(&self) -> &str {
        match self.user_id.char_indices().nth(10) {
            Some((end, _)) => &self.user_id[..end],
            None => &self.user_id,
        }
    }
}
