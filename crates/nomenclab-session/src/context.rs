//! The session state holder.
//!
//! [`SessionContext`] is an explicit instance, never a module-level global;
//! every consumer (and every test) constructs or receives its own. The last
//! computed role set lives in a `tokio::sync::watch` cell so consumers can
//! either pull the current value or subscribe to changes without decoding
//! the token themselves.

use time::OffsetDateTime;
use tokio::sync::watch;

use crate::claims;

/// Minimal snapshot of the signed-in user, persisted alongside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub username: String,
    pub display_name: Option<String>,
}

/// Header material the gateway attaches to mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    /// User-identity header value.
    pub user: String,
    /// Bearer token, when a session is active.
    pub bearer: Option<String>,
}

struct SessionState {
    token: String,
    user: UserSnapshot,
    first_login_complete: bool,
}

/// Owner of the bearer token and the derived role view.
pub struct SessionContext {
    state: std::sync::RwLock<Option<SessionState>>,
    roles_tx: watch::Sender<Vec<String>>,
    expired_tx: watch::Sender<bool>,
}

impl SessionContext {
    /// Create an empty context: no token, no roles, not expired.
    pub fn new() -> Self {
        let (roles_tx, _) = watch::channel(Vec::new());
        let (expired_tx, _) = watch::channel(false);
        Self {
            state: std::sync::RwLock::new(None),
            roles_tx,
            expired_tx,
        }
    }

    /// Persist a token and user snapshot, then recompute and publish roles.
    ///
    /// Called on login success.
    pub fn set_session(&self, token: String, user: UserSnapshot) {
        let roles = claims::roles_from_token(&token);
        {
            let mut state = self.state.write().expect("session lock poisoned");
            *state = Some(SessionState {
                token,
                user,
                first_login_complete: false,
            });
        }
        self.expired_tx.send_replace(false);
        tracing::debug!(roles = roles.len(), "session established");
        self.roles_tx.send_replace(roles);
    }

    /// Drop the session and publish an empty role set (logout).
    pub fn clear_session(&self) {
        {
            let mut state = self.state.write().expect("session lock poisoned");
            *state = None;
        }
        tracing::debug!("session cleared");
        self.roles_tx.send_replace(Vec::new());
    }

    /// Mark the first-login flow finished and republish roles.
    ///
    /// The remote store may amend the token's claims during first login, so
    /// the cached role set is recomputed here as well.
    pub fn complete_first_login(&self) {
        let roles = {
            let mut state = self.state.write().expect("session lock poisoned");
            let Some(state) = state.as_mut() else { return };
            state.first_login_complete = true;
            claims::roles_from_token(&state.token)
        };
        self.roles_tx.send_replace(roles);
    }

    /// The normalized role set derived from the current token.
    ///
    /// Empty when no session is active or the token's claims cannot be
    /// decoded; decoding failures never escape as errors.
    pub fn current_roles(&self) -> Vec<String> {
        self.roles_tx.borrow().clone()
    }

    /// Subscribe to role-set changes (login, logout, first-login completion).
    pub fn subscribe_roles(&self) -> watch::Receiver<Vec<String>> {
        self.roles_tx.subscribe()
    }

    /// Expiry instant of the current token, if one can be read.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        let state = self.state.read().expect("session lock poisoned");
        state.as_ref().and_then(|s| claims::expires_at(&s.token))
    }

    /// Whether the session is expired at `now`.
    ///
    /// Fail-closed: no session, no `exp` claim, or an unparseable one all
    /// count as expired.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }

    /// Signal consumers that the remote store rejected the session.
    pub fn notify_expired(&self) {
        self.expired_tx.send_replace(true);
    }

    /// Subscribe to the session-expired notification channel.
    pub fn subscribe_expired(&self) -> watch::Receiver<bool> {
        self.expired_tx.subscribe()
    }

    /// Identity material for mutating remote calls, if a session is active.
    pub fn identity(&self) -> Option<RequestIdentity> {
        let state = self.state.read().expect("session lock poisoned");
        state.as_ref().map(|s| RequestIdentity {
            user: s.user.username.clone(),
            bearer: Some(s.token.clone()),
        })
    }

    /// The persisted user snapshot, if a session is active.
    pub fn user(&self) -> Option<UserSnapshot> {
        let state = self.state.read().expect("session lock poisoned");
        state.as_ref().map(|s| s.user.clone())
    }

    /// Whether the first-login flow has been completed for this session.
    pub fn first_login_complete(&self) -> bool {
        let state = self.state.read().expect("session lock poisoned");
        state.as_ref().is_some_and(|s| s.first_login_complete)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("{header}.{body}.sig")
    }

    fn user() -> UserSnapshot {
        UserSnapshot {
            username: "tech.lopez".to_string(),
            display_name: Some("Téc. López".to_string()),
        }
    }

    #[test]
    fn login_publishes_roles_and_logout_clears_them() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe_roles();
        assert!(ctx.current_roles().is_empty());

        ctx.set_session(token(json!({"roles": "admin,lab"})), user());
        assert_eq!(ctx.current_roles(), vec!["ADMIN", "LAB"]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), vec!["ADMIN", "LAB"]);

        ctx.clear_session();
        assert!(ctx.current_roles().is_empty());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn undecodable_token_degrades_to_empty_roles() {
        let ctx = SessionContext::new();
        ctx.set_session("garbage".to_string(), user());
        assert!(ctx.current_roles().is_empty());
        // The session itself is still established.
        assert!(ctx.identity().is_some());
    }

    #[test]
    fn expiry_is_fail_closed() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();

        let ctx = SessionContext::new();
        // No session at all.
        assert!(ctx.is_expired(now));

        // Token without an exp claim.
        ctx.set_session(token(json!({"roles": "A"})), user());
        assert!(ctx.is_expired(now));

        // Unparseable exp claim.
        ctx.set_session(token(json!({"exp": "whenever"})), user());
        assert!(ctx.is_expired(now));

        // Valid future exp.
        ctx.set_session(token(json!({"exp": 1_700_000_060})), user());
        assert!(!ctx.is_expired(now));
        assert!(ctx.is_expired(now + time::Duration::seconds(61)));
    }

    #[test]
    fn first_login_completion_republishes_roles() {
        let ctx = SessionContext::new();
        ctx.set_session(token(json!({"roles": ["lab"]})), user());
        let mut rx = ctx.subscribe_roles();
        rx.borrow_and_update();

        assert!(!ctx.first_login_complete());
        ctx.complete_first_login();
        assert!(ctx.first_login_complete());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), vec!["LAB"]);
    }

    #[test]
    fn expired_notification_reaches_subscribers() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe_expired();
        assert!(!*rx.borrow_and_update());

        ctx.notify_expired();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        // A fresh login resets the flag.
        ctx.set_session(token(json!({"roles": "A"})), user());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn identity_carries_user_and_bearer() {
        let ctx = SessionContext::new();
        let t = token(json!({"roles": "A"}));
        ctx.set_session(t.clone(), user());

        let identity = ctx.identity().unwrap();
        assert_eq!(identity.user, "tech.lopez");
        assert_eq!(identity.bearer, Some(t));
    }
}
