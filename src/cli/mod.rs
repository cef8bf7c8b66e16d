//! Command line definitions.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use issuedesk_api::{Choice, IssuePriority, IssueSeverity, IssueStatus, SortOrder};

pub mod commands;
pub mod repl;

/// issuedesk - terminal client for the issue tracker API
#[derive(Parser, Debug)]
#[command(name = "issuedesk", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// API base URL (overrides the config file and ISSUEDESK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Keep the session in memory only; nothing is written to the keyring or disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login(LoginArgs),

    /// Create an account (does not sign in)
    Register(RegisterArgs),

    /// Forget the stored session
    Logout,

    /// Show the current session
    Whoami,

    /// List issues
    List(ListArgs),

    /// Show one issue
    Show {
        id: String,
    },

    /// Per-status issue totals
    Counts,

    /// Create an issue
    Create(CreateArgs),

    /// Change fields of an issue
    Update(UpdateArgs),

    /// Mark an issue as resolved
    Resolve {
        id: String,
    },

    /// Mark an issue as closed
    Close {
        id: String,
    },

    /// Delete an issue
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Interactive dashboard reading commands from stdin
    Dashboard,

    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long, short)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(long, env = "ISSUEDESK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long, short)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,

    /// Prompted for when omitted
    #[arg(long)]
    pub confirm_password: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Free-text search
    #[arg(long, short)]
    pub search: Option<String>,

    /// Open, "In Progress", Resolved, Closed or all
    #[arg(long)]
    pub status: Option<Choice<IssueStatus>>,

    /// Low, Medium, High, Critical or all
    #[arg(long)]
    pub priority: Option<Choice<IssuePriority>>,

    /// Minor, Major, Critical or all
    #[arg(long)]
    pub severity: Option<Choice<IssueSeverity>>,

    #[arg(long)]
    pub page: Option<u32>,

    /// Page size (defaults to the configured page_size)
    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub sort_by: Option<String>,

    /// asc or desc
    #[arg(long)]
    pub order: Option<SortOrder>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub title: String,

    #[arg(long, short, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "Medium")]
    pub priority: IssuePriority,

    #[arg(long, default_value = "Minor")]
    pub severity: IssueSeverity,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short)]
    pub description: Option<String>,

    #[arg(long)]
    pub status: Option<IssueStatus>,

    #[arg(long)]
    pub priority: Option<IssuePriority>,

    #[arg(long)]
    pub severity: Option<IssueSeverity>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Change one setting
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum ConfigKey {
    ApiBaseUrl,
    PageSize,
    SearchDebounceMs,
    RequestTimeoutSecs,
    ConnectTimeoutSecs,
    CredentialBackend,
}

impl Cli {
    /// Log filter for `-v` flags; `RUST_LOG` still wins when set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
