use coffee_bar_core::{CoreError, Principal};
use tracing::{info, warn};

use crate::backend::AdminBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub principal: Principal,
    pub support_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFailure {
    pub error: CoreError,
}

impl GateFailure {
    pub fn next_action(&self) -> &'static str {
        self.error.next_action()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Loading,
    Authorized(Principal),
    NotAuthorized(AccessDenied),
    Failed(GateFailure),
}

/// Blocks every screen until the signed-in principal is known to be a
/// superuser.
#[derive(Debug, Clone)]
pub struct AuthGate {
    state: GateState,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Loading,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            GateState::Authorized(principal) => Some(principal),
            _ => None,
        }
    }

    pub async fn check(&mut self, backend: &dyn AdminBackend) -> &GateState {
        self.state = GateState::Loading;
        self.state = match backend.current_principal().await {
            Ok(principal) if principal.is_superuser => {
                info!(principal = %principal.email, "admin access granted");
                GateState::Authorized(principal)
            }
            Ok(principal) => {
                warn!(principal = %principal.email, "principal lacks admin access");
                let support_link = match backend.access_request_link(&principal) {
                    Ok(link) => Some(link),
                    Err(error) => {
                        warn!(error = %error, "failed to build the access request link");
                        None
                    }
                };
                GateState::NotAuthorized(AccessDenied {
                    principal,
                    support_link,
                })
            }
            Err(error) => {
                warn!(error = %error, "failed to load the signed-in principal");
                GateState::Failed(GateFailure { error })
            }
        };
        &self.state
    }

    pub async fn retry(&mut self, backend: &dyn AdminBackend) -> &GateState {
        self.check(backend).await
    }

    /// Returns the authorized principal or the error that keeps the gate closed.
    pub fn require(&self) -> Result<&Principal, CoreError> {
        match &self.state {
            GateState::Authorized(principal) => Ok(principal),
            GateState::Loading => Err(CoreError::DependencyUnavailable(
                "still loading the signed-in principal".to_owned(),
            )),
            GateState::NotAuthorized(denied) => Err(CoreError::Unauthorized(format!(
                "{} is not a Coffee Bar administrator",
                denied.principal.email
            ))),
            GateState::Failed(failure) => Err(failure.error.clone()),
        }
    }
}

/// Text shown for the gate's current state.
pub fn render_gate(state: &GateState) -> Vec<String> {
    match state {
        GateState::Loading => vec!["Loading...".to_owned()],
        GateState::Authorized(principal) => {
            vec![format!("Signed in as {}", principal_label(principal))]
        }
        GateState::NotAuthorized(denied) => {
            let mut lines = vec![
                "Not authorized".to_owned(),
                format!(
                    "{} does not have access to the Coffee Bar admin panel.",
                    principal_label(&denied.principal)
                ),
                "Sign out to use a different account.".to_owned(),
            ];
            if let Some(link) = &denied.support_link {
                lines.push(format!("Request access: {link}"));
            }
            lines
        }
        GateState::Failed(failure) => vec![
            format!("Could not load your account: {}", failure.error),
            format!("Next step: {}", failure.next_action()),
        ],
    }
}

/// Login screen message for a failed sign-in.
pub fn login_error_message(error: &CoreError) -> String {
    match error {
        CoreError::DomainNotAllowed => "Your email domain is not on the allowlist. \
             Sign in with a different account or ask an administrator to add your domain."
            .to_owned(),
        other => format!("Sign-in failed: {other}. Please try again."),
    }
}

fn principal_label(principal: &Principal) -> String {
    let name = principal.display_name();
    if name.is_empty() {
        principal.email.clone()
    } else {
        format!("{name} <{}>", principal.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{principal, StubBackend};

    #[tokio::test]
    async fn superusers_pass_the_gate() {
        let backend = StubBackend::default();
        backend.push_principal(Ok(principal(true)));
        let mut gate = AuthGate::new();
        assert_eq!(gate.state(), &GateState::Loading);

        gate.check(&backend).await;
        assert_eq!(gate.require().map(|p| p.email.as_str()), Ok("ada@coffee.ai"));
        assert_eq!(
            render_gate(gate.state()),
            vec!["Signed in as Ada Lovelace <ada@coffee.ai>".to_owned()]
        );
    }

    #[tokio::test]
    async fn other_principals_see_sign_out_and_support_link() {
        let backend = StubBackend::default();
        backend.push_principal(Ok(principal(false)));
        let mut gate = AuthGate::new();

        let GateState::NotAuthorized(denied) = gate.check(&backend).await.clone() else {
            panic!("expected not authorized");
        };
        assert_eq!(
            denied.support_link.as_deref(),
            Some("mailto:support@coffee.ai?from=ada@coffee.ai")
        );
        assert!(matches!(gate.require(), Err(CoreError::Unauthorized(_))));
        let lines = render_gate(gate.state());
        assert!(lines.iter().any(|line| line.starts_with("Sign out")));
        assert!(lines.iter().any(|line| line.starts_with("Request access: mailto:")));
    }

    #[tokio::test]
    async fn fetch_failures_offer_a_retry() {
        let backend = StubBackend::default();
        backend.push_principal(Err(CoreError::DependencyUnavailable("offline".to_owned())));
        backend.push_principal(Ok(principal(true)));
        let mut gate = AuthGate::new();

        let GateState::Failed(failure) = gate.check(&backend).await.clone() else {
            panic!("expected failure");
        };
        assert_eq!(failure.next_action(), "retry");
        assert!(render_gate(gate.state())[1].contains("retry"));

        gate.retry(&backend).await;
        assert!(gate.principal().is_some());
    }

    #[test]
    fn domain_rejection_is_explained_separately() {
        assert!(login_error_message(&CoreError::DomainNotAllowed).contains("allowlist"));
        assert_eq!(
            login_error_message(&CoreError::Identity("access_denied: cancelled".to_owned())),
            "Sign-in failed: identity error: access_denied: cancelled. Please try again."
        );
    }
}
