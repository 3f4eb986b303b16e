use async_trait::async_trait;
use coffee_bar_core::validation::{
    validate_domain, validate_email, validate_optional_domain, validate_optional_url,
    validate_required,
};
use coffee_bar_core::{
    CoreError, DomainAllowlistEntry, DomainId, FieldError, FormField, UserId, UserInvite,
    UserRecord, UserUpdate, WorkspaceDraft, WorkspaceId, WorkspaceRole, WorkspaceSummary,
};
use tracing::{info, warn};

use crate::backend::AdminBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    Editing,
    Submitting,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    /// Saved; the owner refetches and the editor is closed.
    Saved(T),
    /// Local validation failed; nothing was sent.
    Invalid(FieldError),
    /// The server refused; its message is shown inline and the form stays open.
    Rejected(String),
}

/// A form whose input is validated locally and then sent as one mutation.
#[async_trait]
pub trait EditorForm: Send + Sync {
    type Submission: Send + Sync;
    type Output: Send;

    fn validate(&self) -> Result<Self::Submission, FieldError>;

    async fn send(
        &self,
        backend: &dyn AdminBackend,
        submission: Self::Submission,
    ) -> Result<Self::Output, CoreError>;
}

#[derive(Debug, Clone)]
pub struct Editor<F> {
    form: F,
    phase: EditorPhase,
    field_error: Option<FieldError>,
    server_error: Option<String>,
}

impl<F: EditorForm> Editor<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            phase: EditorPhase::Editing,
            field_error: None,
            server_error: None,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    /// Mutable access clears any error shown for the previous input.
    pub fn form_mut(&mut self) -> &mut F {
        self.field_error = None;
        self.server_error = None;
        &mut self.form
    }

    pub fn phase(&self) -> EditorPhase {
        self.phase
    }

    pub fn field_error(&self) -> Option<&FieldError> {
        self.field_error.as_ref()
    }

    pub fn server_error(&self) -> Option<&str> {
        self.server_error.as_deref()
    }

    pub fn cancel(&mut self) {
        self.phase = EditorPhase::Closed;
    }

    pub async fn submit(&mut self, backend: &dyn AdminBackend) -> SubmitOutcome<F::Output> {
        self.field_error = None;
        self.server_error = None;
        let submission = match self.form.validate() {
            Ok(submission) => submission,
            Err(error) => {
                self.field_error = Some(error.clone());
                return SubmitOutcome::Invalid(error);
            }
        };

        self.phase = EditorPhase::Submitting;
        match self.form.send(backend, submission).await {
            Ok(output) => {
                self.phase = EditorPhase::Closed;
                SubmitOutcome::Saved(output)
            }
            Err(CoreError::Validation(error)) => {
                self.phase = EditorPhase::Editing;
                self.field_error = Some(error.clone());
                SubmitOutcome::Invalid(error)
            }
            Err(error) => {
                warn!(error = %error, "mutation rejected");
                self.phase = EditorPhase::Editing;
                let message = match &error {
                    CoreError::Mutation(message) => message.clone(),
                    other => other.to_string(),
                };
                self.server_error = Some(message.clone());
                SubmitOutcome::Rejected(message)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainForm {
    pub target: Option<DomainId>,
    pub domain: String,
}

impl DomainForm {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn edit(entry: &DomainAllowlistEntry) -> Self {
        Self {
            target: Some(entry.id.clone()),
            domain: entry.domain.clone(),
        }
    }
}

#[async_trait]
impl EditorForm for DomainForm {
    type Submission = String;
    type Output = DomainAllowlistEntry;

    fn validate(&self) -> Result<String, FieldError> {
        validate_domain(&self.domain)
    }

    async fn send(
        &self,
        backend: &dyn AdminBackend,
        domain: String,
    ) -> Result<DomainAllowlistEntry, CoreError> {
        let saved = match &self.target {
            Some(id) => backend.update_domain(id, &domain).await?,
            None => backend.create_domain(&domain).await?,
        };
        info!(domain = %saved.domain, "domain allowlist saved");
        Ok(saved)
    }
}

/// Invites take an email and role only; names are collected at onboarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteUserForm {
    pub workspace_id: WorkspaceId,
    pub email: String,
    pub role: WorkspaceRole,
}

impl InviteUserForm {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            email: String::new(),
            role: WorkspaceRole::User,
        }
    }
}

#[async_trait]
impl EditorForm for InviteUserForm {
    type Submission = UserInvite;
    type Output = UserRecord;

    fn validate(&self) -> Result<UserInvite, FieldError> {
        Ok(UserInvite {
            workspace_id: self.workspace_id.clone(),
            email: validate_email(&self.email)?,
            role: assignable_role(&self.role)?,
        })
    }

    async fn send(
        &self,
        backend: &dyn AdminBackend,
        invite: UserInvite,
    ) -> Result<UserRecord, CoreError> {
        let user = backend.invite_user(&invite).await?;
        info!(email = %invite.email, role = %invite.role, "user invited");
        Ok(user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditUserForm {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub email: String,
    pub given_name: String,
    pub surname: String,
    pub role: WorkspaceRole,
}

impl EditUserForm {
    pub fn for_user(workspace_id: WorkspaceId, user: &UserRecord) -> Self {
        Self {
            workspace_id,
            user_id: user.id.clone(),
            email: user.email.clone(),
            given_name: user.given_name.clone(),
            surname: user.surname.clone(),
            role: user.effective_role(),
        }
    }
}

#[async_trait]
impl EditorForm for EditUserForm {
    type Submission = UserUpdate;
    type Output = UserRecord;

    fn validate(&self) -> Result<UserUpdate, FieldError> {
        validate_email(&self.email)?;
        Ok(UserUpdate {
            user_id: self.user_id.clone(),
            workspace_id: self.workspace_id.clone(),
            given_name: validate_required(FormField::GivenName, &self.given_name)?,
            surname: validate_required(FormField::Surname, &self.surname)?,
            role: assignable_role(&self.role)?,
        })
    }

    async fn send(
        &self,
        backend: &dyn AdminBackend,
        update: UserUpdate,
    ) -> Result<UserRecord, CoreError> {
        backend.update_user(&update).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceForm {
    pub name: String,
    pub domain: String,
    pub logo_url: String,
    pub owners: Vec<UserId>,
    pub users: Vec<UserId>,
}

#[async_trait]
impl EditorForm for WorkspaceForm {
    type Submission = WorkspaceDraft;
    type Output = WorkspaceSummary;

    fn validate(&self) -> Result<WorkspaceDraft, FieldError> {
        Ok(WorkspaceDraft {
            name: validate_required(FormField::WorkspaceName, &self.name)?,
            domain: validate_optional_domain(&self.domain)?,
            logo_url: validate_optional_url(FormField::LogoUrl, &self.logo_url)?,
            owners: self.owners.clone(),
            users: self.users.clone(),
        })
    }

    async fn send(
        &self,
        backend: &dyn AdminBackend,
        draft: WorkspaceDraft,
    ) -> Result<WorkspaceSummary, CoreError> {
        let workspace = backend.create_workspace(&draft).await?;
        info!(workspace = %workspace.id, name = %workspace.name, "workspace created");
        Ok(workspace)
    }
}

fn assignable_role(role: &WorkspaceRole) -> Result<WorkspaceRole, FieldError> {
    if role.is_assignable() {
        Ok(role.clone())
    } else {
        Err(FieldError::new(FormField::Role, "Please select a role"))
    }
}
