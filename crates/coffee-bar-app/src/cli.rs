use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use coffee_bar_core::{DomainColumn, UserColumn};

#[derive(Parser, Debug)]
#[command(
    name = "coffee-bar",
    version,
    about = "Coffee Bar administration console",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the identity provider sign-in URL.
    LoginUrl,

    /// Finish sign-in with the code (or full redirect URL) from the callback.
    Login {
        #[arg(long, value_name = "CODE_OR_URL")]
        code: String,
    },

    /// Forget the stored token and print the provider logout URL.
    Logout,

    /// Show the signed-in principal and whether it has admin access.
    Whoami,

    /// Domain allowlist.
    Domains {
        #[command(subcommand)]
        cmd: DomainsCmd,
    },

    /// Workspaces.
    Workspaces {
        #[command(subcommand)]
        cmd: WorkspacesCmd,
    },

    /// Users of a workspace.
    Users {
        #[command(subcommand)]
        cmd: UsersCmd,
    },

    /// Workspace preferences.
    Prefs {
        #[command(subcommand)]
        cmd: PrefsCmd,
    },
}

impl Command {
    /// Identity commands run before a session exists.
    pub fn needs_gate(&self) -> bool {
        !matches!(self, Self::LoginUrl | Self::Login { .. } | Self::Logout)
    }
}

#[derive(Args, Debug, Default)]
pub struct TableArgs {
    /// Case-insensitive text filter over the loaded rows.
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort descending instead of ascending.
    #[arg(long, default_value_t = false)]
    pub desc: bool,

    /// Write the visible rows as CSV instead of printing them.
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum DomainsCmd {
    List {
        /// Server-side search.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        sort: Option<DomainSort>,
        #[command(flatten)]
        table: TableArgs,
    },
    Add {
        domain: String,
    },
    Update {
        id: String,
        domain: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DomainSort {
    Domain,
    CreatedBy,
    CreatedAt,
}

impl From<DomainSort> for DomainColumn {
    fn from(value: DomainSort) -> Self {
        match value {
            DomainSort::Domain => Self::Domain,
            DomainSort::CreatedBy => Self::CreatedBy,
            DomainSort::CreatedAt => Self::CreatedAt,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum WorkspacesCmd {
    /// Debounced, paginated workspace search.
    Search {
        query: Option<String>,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Interactive terminal picker.
    Pick,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long = "logo-url")]
        logo_url: Option<String>,
        #[arg(long = "owner", value_name = "USER_ID")]
        owners: Vec<String>,
        #[arg(long = "user", value_name = "USER_ID")]
        users: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCmd {
    List {
        /// Workspace id; opens the picker when omitted.
        #[arg(long)]
        workspace: Option<String>,
        /// Server-side search.
        #[arg(long)]
        search: Option<String>,
        /// owner, admin, user, or all.
        #[arg(long, default_value = "all")]
        role: String,
        #[arg(long, value_enum)]
        sort: Option<UserSort>,
        #[command(flatten)]
        table: TableArgs,
    },
    Invite {
        #[arg(long)]
        workspace: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    Update {
        #[arg(long)]
        workspace: String,
        #[arg(long)]
        user: String,
        #[arg(long = "given-name")]
        given_name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Remove {
        #[arg(long)]
        workspace: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserSort {
    Email,
    GivenName,
    Surname,
    Role,
    Status,
    LastLogin,
}

impl From<UserSort> for UserColumn {
    fn from(value: UserSort) -> Self {
        match value {
            UserSort::Email => Self::Email,
            UserSort::GivenName => Self::GivenName,
            UserSort::Surname => Self::Surname,
            UserSort::Role => Self::Role,
            UserSort::Status => Self::Status,
            UserSort::LastLogin => Self::LastLogin,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum PrefsCmd {
    Show {
        /// Workspace id; opens the picker when omitted.
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Set a key. Values are parsed as JSON and fall back to plain text.
    Set {
        #[arg(long)]
        workspace: Option<String>,
        key: String,
        value: String,
    },
    Unset {
        #[arg(long)]
        workspace: Option<String>,
        key: String,
    },
}
