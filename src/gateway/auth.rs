/**
 * Identity Operations
 *
 * Sign up, sign in, sign out, the current user, the authentication gate and
 * the session change subscription.
 *
 * # Flow
 *
 * 1. **Sign up**: credentials → backend registration → default `user` role row
 * 2. **Sign in**: credentials → backend session
 * 3. **Current user**: backend session → identity merged with resolved role
 * 4. **Sign out**: backend session cleared
 */

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::gateway::SessionGateway;
use crate::shared::error::GatewayError;
use crate::shared::event::{AuthEvent, AuthStateChange};
use crate::shared::role::Role;
use crate::shared::types::{Credentials, CurrentUser, OperationResult, Session, SignUpData};

/// Navigation collaborator used when a page requires a session.
///
/// The gateway only decides *that* a redirect happens; performing it belongs
/// to the embedding application.
pub trait Redirector: Send + Sync {
    fn redirect(&self, target: &str);
}

impl<F> Redirector for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, target: &str) {
        self(target)
    }
}

/// Handle to the task forwarding session changes to an `init_auth` handler
#[derive(Debug)]
pub struct AuthSubscription {
    handle: JoinHandle<()>,
}

impl AuthSubscription {
    /// Stop forwarding events
    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl SessionGateway {
    /// Register a new account and give it the default `user` role.
    ///
    /// A failed role write after a successful registration is logged and
    /// not rolled back; the account reads as `user` through the role
    /// default anyway.
    pub async fn sign_up(&self, email: &str, password: &str) -> OperationResult<SignUpData> {
        let credentials = Credentials::new(email, password);
        let data = match self.auth.sign_up(&credentials).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error signing up: {}", e);
                return OperationResult::failed(e.to_string());
            }
        };

        if let Some(user) = &data.user {
            if !self.assign_role(user.id, &Role::User).await {
                tracing::warn!(
                    "Account {} created without a role row; it resolves to the default role",
                    user.id
                );
            }
        }

        tracing::info!("Signed up {}", email);
        OperationResult::ok(data)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> OperationResult<Session> {
        let credentials = Credentials::new(email, password);
        match self.auth.sign_in_with_password(&credentials).await {
            Ok(session) => {
                tracing::info!("Signed in {}", email);
                OperationResult::ok(session)
            }
            Err(e) => {
                tracing::error!("Error signing in: {}", e);
                OperationResult::failed(e.to_string())
            }
        }
    }

    pub async fn sign_out(&self) -> OperationResult<()> {
        match self.auth.sign_out().await {
            Ok(()) => OperationResult::ok(()),
            Err(e) => {
                tracing::error!("Error signing out: {}", e);
                OperationResult::failed(e.to_string())
            }
        }
    }

    /// Current identity merged with its role, without swallowing failures.
    ///
    /// `Ok(None)` means no session. The role part still follows the lookup
    /// default: a failed role read yields `user`, not an error.
    pub async fn try_current_user(&self) -> Result<Option<CurrentUser>, GatewayError> {
        let session = match self.auth.get_session().await? {
            Some(session) => session,
            None => return Ok(None),
        };

        let identity = session.user;
        let role = self.get_user_role(identity.id).await;
        Ok(Some(CurrentUser { identity, role }))
    }

    /// Current identity merged with its role; `None` without a session or
    /// on any error.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        match self.try_current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Error getting current user: {}", e);
                None
            }
        }
    }

    /// The current user, or a single redirect to the configured login page.
    pub async fn require_auth(&self, redirector: &dyn Redirector) -> Option<CurrentUser> {
        let target = self.login_redirect.clone();
        self.require_auth_to(redirector, &target).await
    }

    /// Like [`require_auth`](Self::require_auth) with an explicit target
    pub async fn require_auth_to(
        &self,
        redirector: &dyn Redirector,
        target: &str,
    ) -> Option<CurrentUser> {
        let user = self.current_user().await;
        if user.is_none() {
            tracing::info!("No active session, redirecting to {}", target);
            redirector.redirect(target);
        }
        user
    }

    /// Forward every session change to `handler`.
    ///
    /// The handler first receives `INITIAL_SESSION` with the session held at
    /// subscription time, then each change as the backend reports it.
    /// Forwarding runs on a spawned task until
    /// [`AuthSubscription::unsubscribe`] or until the provider goes away.
    pub async fn init_auth<F>(&self, mut handler: F) -> AuthSubscription
    where
        F: FnMut(AuthStateChange) + Send + 'static,
    {
        let mut receiver = self.auth.subscribe();
        let initial = match self.auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Error reading initial session: {}", e);
                None
            }
        };

        let handle = tokio::spawn(async move {
            handler(AuthStateChange::new(AuthEvent::InitialSession, initial));

            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        match change.event {
                            AuthEvent::SignedIn => tracing::info!("User signed in"),
                            AuthEvent::SignedOut => tracing::info!("User signed out"),
                            other => tracing::debug!("Auth state change: {}", other),
                        }
                        handler(change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Auth listener lagged, {} session changes dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        AuthSubscription { handle }
    }
}
