use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use coffee_bar_core::{
    CoreError, DomainId, RoleFilter, SortDirection, UserId, WorkspaceId, WorkspaceRole,
    WorkspaceSummary,
};
use coffee_bar_gateway::parse_callback;
use coffee_bar_ui::{
    login_error_message, render_gate, AdminBackend, AuthGate, DomainForm, DomainsScreen,
    EditUserForm, Editor, GateFailure, GateState, InviteUserForm, ListPhase, PaginatedSearchList,
    PreferencesScreen, SearchController, SearchItem, Selection, SubmitOutcome, TerminalPicker,
    UsersScreen, WorkspaceForm, WorkspaceSource,
};
use tracing::info;

use crate::cli::{Command, DomainsCmd, PrefsCmd, TableArgs, UsersCmd, WorkspacesCmd};
use crate::App;

pub async fn run<W: Write>(app: &App, command: Command, out: &mut W) -> Result<()> {
    if !command.needs_gate() {
        return match command {
            Command::LoginUrl => login_url(app, out),
            Command::Login { code } => login(app, &code, out).await,
            _ => logout(app, out).await,
        };
    }

    let gate = open_gate(app).await?;
    if matches!(command, Command::Whoami) || gate.principal().is_none() {
        write_lines(out, render_gate(gate.state()))?;
    }
    gate.require()?;

    match command {
        Command::Domains { cmd } => domains(app, cmd, out).await,
        Command::Workspaces { cmd } => workspaces(app, cmd, out).await,
        Command::Users { cmd } => users(app, cmd, out).await,
        Command::Prefs { cmd } => prefs(app, cmd, out).await,
        _ => Ok(()),
    }
}

/// Restores the stored session and checks the principal. A credential
/// rejected by the gateway is renewed once before giving up.
async fn open_gate(app: &App) -> Result<AuthGate, CoreError> {
    if !app.session.restore().await? {
        return Err(CoreError::Identity(
            "not signed in; run `coffee-bar login-url` to start".to_owned(),
        ));
    }
    let backend: &dyn AdminBackend = &*app.backend;
    let mut gate = AuthGate::new();
    let rejected = matches!(
        gate.check(backend).await,
        GateState::Failed(GateFailure {
            error: CoreError::Identity(_)
        })
    );
    if rejected {
        info!("gateway rejected the access token; renewing");
        app.session.refresh().await?;
        gate.retry(backend).await;
    }
    Ok(gate)
}

fn login_url<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let state = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| format!("{:x}", elapsed.as_nanos()))
        .unwrap_or_default();
    let url = app.session.authorize_url(&state)?;
    writeln!(out, "Open this URL to sign in:")?;
    writeln!(out, "{url}")?;
    Ok(())
}

async fn login<W: Write>(app: &App, input: &str, out: &mut W) -> Result<()> {
    let signed_in = match parse_callback(input) {
        Ok(code) => app.session.sign_in(&code).await.map(|_| ()),
        Err(error) => Err(error),
    };
    if let Err(error) = signed_in {
        writeln!(out, "{}", login_error_message(&error))?;
        return Err(error.into());
    }
    writeln!(out, "Signed in. Run `coffee-bar whoami` to check admin access.")?;
    Ok(())
}

async fn logout<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let url = app.backend.sign_out().await?;
    writeln!(out, "Signed out. Finish at: {url}")?;
    Ok(())
}

async fn domains<W: Write>(app: &App, cmd: DomainsCmd, out: &mut W) -> Result<()> {
    let backend: &dyn AdminBackend = &*app.backend;
    match cmd {
        DomainsCmd::List {
            search,
            sort,
            table,
        } => {
            let mut screen = DomainsScreen::new();
            screen.set_search(search);
            if !screen.load(backend).await {
                return Err(load_failure(screen.load_error()));
            }
            if let Some(filter) = &table.filter {
                screen.table_mut().set_filter(filter.as_str());
            }
            if let Some(sort) = sort {
                screen
                    .table_mut()
                    .sort_by(sort.into(), direction(&table));
            }
            match &table.export {
                Some(path) => export_csv(path, screen.table().export_csv(), out),
                None => write_lines(out, screen.render()),
            }
        }
        DomainsCmd::Add { domain } => {
            let mut editor = Editor::new(DomainForm {
                target: None,
                domain,
            });
            let saved = submitted(editor.submit(backend).await)?;
            writeln!(out, "Added {} (id {})", saved.domain, saved.id)?;
            Ok(())
        }
        DomainsCmd::Update { id, domain } => {
            let mut editor = Editor::new(DomainForm {
                target: Some(DomainId::new(id)),
                domain,
            });
            let saved = submitted(editor.submit(backend).await)?;
            writeln!(out, "Updated {} (id {})", saved.domain, saved.id)?;
            Ok(())
        }
        DomainsCmd::Delete { id } => {
            let mut screen = DomainsScreen::new();
            if !screen.delete(backend, &DomainId::new(id.as_str())).await {
                return Err(rejected(screen.action_error(), "Failed to delete domain"));
            }
            writeln!(out, "Deleted domain {id}")?;
            Ok(())
        }
    }
}

async fn workspaces<W: Write>(app: &App, cmd: WorkspacesCmd, out: &mut W) -> Result<()> {
    match cmd {
        WorkspacesCmd::Search { query, pages } => {
            let mut controller = workspace_search(app, app.config.ui.user_picker_page_size);
            controller.set_query(query.unwrap_or_default());
            settle(&mut controller).await?;
            for _ in 1..pages.max(1) {
                if !controller.load_more() {
                    break;
                }
                settle(&mut controller).await?;
            }

            let list = controller.list();
            for workspace in list.items() {
                writeln!(out, "{}\t{}\t{}", workspace.id, workspace.name, workspace.subtitle())?;
            }
            if let Some(empty) = list.empty_state_text() {
                writeln!(out, "{empty}")?;
            }
            if list.has_more() {
                writeln!(out, "More workspaces available; pass --pages to load them")?;
            }
            Ok(())
        }
        WorkspacesCmd::Pick => {
            match pick_workspace(app, app.config.ui.user_picker_page_size)? {
                Some(selection) => writeln!(out, "{}\t{}", selection.id, selection.label)?,
                None => writeln!(out, "No workspace selected")?,
            }
            Ok(())
        }
        WorkspacesCmd::Create {
            name,
            domain,
            logo_url,
            owners,
            users,
        } => {
            let mut editor = Editor::new(WorkspaceForm {
                name,
                domain: domain.unwrap_or_default(),
                logo_url: logo_url.unwrap_or_default(),
                owners: owners.into_iter().map(UserId::new).collect(),
                users: users.into_iter().map(UserId::new).collect(),
            });
            let workspace = submitted(editor.submit(&*app.backend).await)?;
            writeln!(out, "Created workspace {} (id {})", workspace.name, workspace.id)?;
            Ok(())
        }
    }
}

async fn users<W: Write>(app: &App, cmd: UsersCmd, out: &mut W) -> Result<()> {
    let backend: &dyn AdminBackend = &*app.backend;
    match cmd {
        UsersCmd::List {
            workspace,
            search,
            role,
            sort,
            table,
        } => {
            let role = RoleFilter::parse(&role)?;
            let workspace_id =
                resolve_workspace(app, workspace, app.config.ui.user_picker_page_size)?;
            let mut screen = UsersScreen::new(workspace_id)
                .with_page_size(app.config.ui.users_page_size);
            screen.set_query(search, role);
            if !screen.load_all(backend).await {
                return Err(load_failure(screen.load_error()));
            }
            if let Some(filter) = &table.filter {
                screen.table_mut().table_mut().set_filter(filter.as_str());
            }
            if let Some(sort) = sort {
                screen
                    .table_mut()
                    .table_mut()
                    .sort_by(sort.into(), direction(&table));
            }
            match &table.export {
                Some(path) => export_csv(path, screen.table().export_csv(), out),
                None => write_lines(out, screen.render()),
            }
        }
        UsersCmd::Invite {
            workspace,
            email,
            role,
        } => {
            let mut editor = Editor::new(InviteUserForm {
                workspace_id: WorkspaceId::new(workspace),
                email,
                role: WorkspaceRole::parse_assignable(&role)?,
            });
            let user = submitted(editor.submit(backend).await)?;
            writeln!(out, "Invited {} as {}", user.email, user.effective_role())?;
            Ok(())
        }
        UsersCmd::Update {
            workspace,
            user,
            given_name,
            surname,
            role,
        } => {
            let workspace_id = WorkspaceId::new(workspace);
            let mut screen = UsersScreen::new(workspace_id.clone())
                .with_page_size(app.config.ui.users_page_size);
            if !screen.load_all(backend).await {
                return Err(load_failure(screen.load_error()));
            }
            let record = screen
                .table()
                .table()
                .rows()
                .iter()
                .find(|record| record.id.as_str() == user)
                .ok_or_else(|| {
                    CoreError::Configuration(format!(
                        "user `{user}` is not a member of workspace `{workspace_id}`"
                    ))
                })?;

            let mut form = EditUserForm::for_user(workspace_id, record);
            if let Some(given_name) = given_name {
                form.given_name = given_name;
            }
            if let Some(surname) = surname {
                form.surname = surname;
            }
            if let Some(role) = role {
                form.role = WorkspaceRole::parse_assignable(&role)?;
            }
            let mut editor = Editor::new(form);
            let updated = submitted(editor.submit(backend).await)?;
            writeln!(out, "Updated {}", updated.email)?;
            Ok(())
        }
        UsersCmd::Remove { workspace, user } => {
            let mut screen = UsersScreen::new(WorkspaceId::new(workspace))
                .with_page_size(app.config.ui.users_page_size);
            if !screen.remove_user(backend, &UserId::new(user.as_str())).await {
                return Err(rejected(screen.action_error(), "Failed to remove user"));
            }
            writeln!(out, "Removed user {user} from workspace {}", screen.workspace_id())?;
            Ok(())
        }
    }
}

async fn prefs<W: Write>(app: &App, cmd: PrefsCmd, out: &mut W) -> Result<()> {
    let backend: &dyn AdminBackend = &*app.backend;
    let page_size = app.config.ui.preferences_picker_page_size;
    let (workspace, change) = match cmd {
        PrefsCmd::Show { workspace } => (workspace, None),
        PrefsCmd::Set {
            workspace,
            key,
            value,
        } => (workspace, Some((key, Some(value)))),
        PrefsCmd::Unset { workspace, key } => (workspace, Some((key, None))),
    };

    let mut screen = PreferencesScreen::new(resolve_workspace(app, workspace, page_size)?);
    if !screen.load(backend).await {
        return Err(load_failure(screen.load_error()));
    }

    if let Some((key, value)) = change {
        let key = key.trim();
        match value {
            Some(value) if screen.preferences().contains_key(key) => {
                screen.edit(key, &value).map_err(CoreError::Validation)?
            }
            Some(value) => screen.add(key, &value).map_err(CoreError::Validation)?,
            None => {
                if !screen.remove(key) {
                    return Err(CoreError::Configuration(format!(
                        "workspace `{}` has no preference named `{key}`",
                        screen.workspace_id()
                    ))
                    .into());
                }
            }
        }
        if !screen.save(backend).await {
            return Err(rejected(screen.save_error(), "Failed to save preferences"));
        }
    }
    write_lines(out, screen.render())
}

fn workspace_search(app: &App, page_size: u32) -> SearchController<WorkspaceSummary> {
    let backend: Arc<dyn AdminBackend> = app.backend.clone();
    SearchController::new(
        PaginatedSearchList::workspaces(page_size, app.search_debounce()),
        Arc::new(WorkspaceSource(backend)),
    )
}

async fn settle<T: SearchItem>(controller: &mut SearchController<T>) -> Result<()> {
    if let ListPhase::Error { message, .. } = controller.settle().await {
        return Err(CoreError::DependencyUnavailable(message.clone()).into());
    }
    Ok(())
}

fn pick_workspace(app: &App, page_size: u32) -> Result<Option<Selection>> {
    let mut controller = workspace_search(app, page_size);
    let mut picker = TerminalPicker::init().context("failed to open the terminal picker")?;
    let selection = picker.run(
        "Search workspaces",
        &mut controller,
        u32::from(app.config.ui.scroll_threshold_rows),
    )?;
    Ok(selection)
}

fn resolve_workspace(app: &App, workspace: Option<String>, page_size: u32) -> Result<WorkspaceId> {
    if let Some(workspace) = workspace {
        return Ok(WorkspaceId::new(workspace));
    }
    let selection = pick_workspace(app, page_size)?.ok_or_else(|| {
        CoreError::Configuration("no workspace selected; pass --workspace <id>".to_owned())
    })?;
    Ok(WorkspaceId::new(selection.id))
}

fn submitted<T>(outcome: SubmitOutcome<T>) -> Result<T, CoreError> {
    match outcome {
        SubmitOutcome::Saved(value) => Ok(value),
        SubmitOutcome::Invalid(error) => Err(CoreError::Validation(error)),
        SubmitOutcome::Rejected(message) => Err(CoreError::Mutation(message)),
    }
}

fn load_failure(error: Option<&CoreError>) -> anyhow::Error {
    error
        .cloned()
        .unwrap_or_else(|| CoreError::DependencyUnavailable("load failed".to_owned()))
        .into()
}

fn rejected(message: Option<&str>, fallback: &str) -> anyhow::Error {
    CoreError::Mutation(message.unwrap_or(fallback).to_owned()).into()
}

fn direction(table: &TableArgs) -> SortDirection {
    if table.desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

fn export_csv<W: Write>(path: &Path, csv: Option<String>, out: &mut W) -> Result<()> {
    let Some(csv) = csv else {
        writeln!(out, "Nothing to export")?;
        return Ok(());
    };
    std::fs::write(path, csv)
        .with_context(|| format!("failed to write CSV export to {}", path.display()))?;
    writeln!(out, "Exported to {}", path.display())?;
    Ok(())
}

fn write_lines<W: Write>(out: &mut W, lines: Vec<String>) -> Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
