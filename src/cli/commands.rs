//! Executes parsed commands against the application store.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

use issuedesk_api::{ApiClient, ApiError, IssueFilters, IssueFiltersPatch, IssuePatch};

use super::{Cli, Command, ConfigCommand, ConfigKey, CreateArgs, ListArgs, UpdateArgs};
use crate::config::{AppConfig, ConfigManager, CredentialBackend};
use crate::secrets::open_credential_store;
use crate::store::{AppStore, StatusChange};
use crate::view::render;
use crate::view::{FormError, IssueForm, LoginForm, SignupForm};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not authenticated. Run `issuedesk login` first.")]
    NotAuthenticated,
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("{0}")]
    Failed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Nothing to update")]
    NothingToUpdate,
    #[error("Cancelled")]
    Cancelled,
}

/// Prints either human-readable text or pretty JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), CliError> {
        if self.json {
            let rendered = serde_json::to_string_pretty(value).map_err(ApiError::from)?;
            println!("{rendered}");
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Builds the store from configuration and the global flags.
pub fn build_store(cli: &Cli, config: &AppConfig) -> Result<AppStore, CliError> {
    let credentials = open_credential_store(config.credential_backend, cli.ephemeral)?;
    let client = ApiClient::new(config.api_config(), credentials)?;
    Ok(AppStore::new(
        client,
        IssueFilters::default().with_limit(config.page_size),
    ))
}

/// Effective configuration: file, then environment, then `--api-url`.
pub fn effective_config(cli: &Cli, manager: &ConfigManager) -> AppConfig {
    let mut config = manager.load().with_env_overrides();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    config.normalize()
}

pub async fn execute(cli: &Cli, manager: &ConfigManager) -> Result<(), CliError> {
    let out = Output::new(cli.json);
    if let Command::Config { command } = &cli.command {
        return config_command(command, manager, &out);
    }

    let config = effective_config(cli, manager);
    log::debug!("using api at {}", config.api_base_url);
    let store = build_store(cli, &config)?;
    let mut input = BufReader::new(io::stdin());

    match &cli.command {
        Command::Login(args) => {
            let password = match &args.password {
                Some(password) => password.clone(),
                None => prompt(&mut input, "Password: ").await?,
            };
            let credentials = LoginForm::new(args.email.clone(), password).validate()?;
            let user = store
                .auth
                .login(&credentials.email, &credentials.password)
                .await
                .map_err(CliError::Failed)?;
            out.emit(&user, || format!("Signed in as {}", render::user_line(&user)))
        }
        Command::Register(args) => {
            let password = match &args.password {
                Some(password) => password.clone(),
                None => prompt(&mut input, "Password: ").await?,
            };
            let confirm_password = match &args.confirm_password {
                Some(confirm) => confirm.clone(),
                None => prompt(&mut input, "Confirm password: ").await?,
            };
            let credentials = SignupForm {
                email: args.email.clone(),
                password,
                confirm_password,
            }
            .validate()?;
            let user = store
                .auth
                .register(&credentials.email, &credentials.password)
                .await
                .map_err(CliError::Failed)?;
            out.emit(&user, || {
                format!("Account created for {}. Run `issuedesk login` to sign in.", user.email)
            })
        }
        Command::Logout => {
            store.auth.logout();
            out.emit(&json!({ "authenticated": false }), || "Signed out".to_string())
        }
        Command::Whoami => {
            let auth = store.auth.snapshot();
            if !auth.is_authenticated() {
                return Err(CliError::NotAuthenticated);
            }
            let value = json!({ "authenticated": true, "user": auth.user() });
            out.emit(&value, || render::session_line(&auth))
        }
        command => {
            require_session(&store)?;
            protected_command(command, &store, &config, &out, &mut input).await
        }
    }
}

/// Commands that need a stored session.
async fn protected_command(
    command: &Command,
    store: &AppStore,
    config: &AppConfig,
    out: &Output,
    input: &mut (impl AsyncBufRead + Unpin),
) -> Result<(), CliError> {
    let issues = &store.issues;
    match command {
        Command::List(args) => {
            store.issues.set_filters(list_patch(args));
            let filters = issues.filters();
            let listed = issues.fetch_issues(&filters).await.map_err(CliError::Failed)?;
            let state = issues.snapshot();
            let value = json!({ "issues": listed, "pagination": state.pagination });
            out.emit(&value, || {
                let mut text = render::issue_table(&state.issues);
                if let Some(pagination) = &state.pagination {
                    text.push_str("\n\n");
                    text.push_str(&render::pagination_line(pagination));
                }
                text
            })
        }
        Command::Show { id } => {
            let issue = issues.fetch_issue_by_id(id).await.map_err(CliError::Failed)?;
            out.emit(&issue, || render::issue_detail(&issue))
        }
        Command::Counts => {
            let counts = issues
                .fetch_issue_counts()
                .await
                .ok_or_else(|| CliError::Failed("Failed to fetch counts".to_string()))?;
            out.emit(&counts, || render::counts_line(&counts))
        }
        Command::Create(args) => {
            let new_issue = create_form(args).validate()?;
            let issue = issues.create_issue(&new_issue).await.map_err(CliError::Failed)?;
            out.emit(&issue, || format!("Created issue {}\n\n{}", issue.id, render::issue_row(&issue)))
        }
        Command::Update(args) => {
            let patch = update_patch(args)?;
            let issue = issues
                .update_issue(&args.id, &patch)
                .await
                .map_err(CliError::Failed)?;
            out.emit(&issue, || render::issue_detail(&issue))
        }
        Command::Resolve { id } => status_command(store, id, StatusChange::Resolve, out).await,
        Command::Close { id } => status_command(store, id, StatusChange::Close, out).await,
        Command::Delete { id, yes } => {
            if !yes && !confirm(input, &format!("Delete issue {id}? [y/N] ")).await? {
                return Err(CliError::Cancelled);
            }
            issues.delete_issue(id).await.map_err(CliError::Failed)?;
            out.emit(&json!({ "deleted": id }), || format!("Deleted issue {id}"))
        }
        Command::Dashboard => super::repl::run(store.clone(), config.search_debounce()).await,
        Command::Login(_)
        | Command::Register(_)
        | Command::Logout
        | Command::Whoami
        | Command::Config { .. } => Ok(()),
    }
}

async fn status_command(
    store: &AppStore,
    id: &str,
    change: StatusChange,
    out: &Output,
) -> Result<(), CliError> {
    let issue = store
        .issues
        .change_status(id, change)
        .await
        .map_err(CliError::Failed)?;
    out.emit(&issue, || format!("{} is now {}", issue.id, issue.status))
}

fn require_session(store: &AppStore) -> Result<(), CliError> {
    if store.auth.snapshot().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotAuthenticated)
    }
}

pub fn list_patch(args: &ListArgs) -> IssueFiltersPatch {
    IssueFiltersPatch {
        search: args.search.as_ref().map(|text| text.trim().to_string()),
        status: args.status,
        priority: args.priority,
        severity: args.severity,
        page: args.page,
        limit: args.limit,
        sort_by: args.sort_by.clone(),
        order: args.order,
    }
}

fn create_form(args: &CreateArgs) -> IssueForm {
    IssueForm {
        title: args.title.clone(),
        description: args.description.clone(),
        priority: args.priority,
        severity: args.severity,
    }
}

/// Builds a patch from the flags that were given. A given title must not be blank.
pub fn update_patch(args: &UpdateArgs) -> Result<IssuePatch, CliError> {
    let title = match &args.title {
        Some(title) if title.trim().is_empty() => return Err(FormError::TitleRequired.into()),
        Some(title) => Some(title.trim().to_string()),
        None => None,
    };
    let patch = IssuePatch {
        title,
        description: args.description.as_ref().map(|text| text.trim().to_string()),
        status: args.status,
        priority: args.priority,
        severity: args.severity,
    };
    if patch.is_empty() {
        return Err(CliError::NothingToUpdate);
    }
    Ok(patch)
}

fn config_command(command: &ConfigCommand, manager: &ConfigManager, out: &Output) -> Result<(), CliError> {
    match command {
        ConfigCommand::Show => {
            let config = manager.load();
            out.emit(&config, || {
                serde_json::to_string_pretty(&config).unwrap_or_else(|err| err.to_string())
            })
        }
        ConfigCommand::Path => {
            let path = manager.path().display().to_string();
            out.emit(&json!({ "path": path }), || path.clone())
        }
        ConfigCommand::Set { key, value } => {
            let config = apply_setting(manager.load(), *key, value)?;
            manager.save(&config)?;
            out.emit(&config, || format!("Saved {}", manager.path().display()))
        }
    }
}

pub fn apply_setting(mut config: AppConfig, key: ConfigKey, value: &str) -> Result<AppConfig, CliError> {
    let value = value.trim();
    let number = |value: &str| {
        value
            .parse::<u64>()
            .map_err(|err| CliError::Config(format!("{value}: {err}")))
    };
    match key {
        ConfigKey::ApiBaseUrl => config.api_base_url = value.to_string(),
        ConfigKey::PageSize => {
            config.page_size = u32::try_from(number(value)?)
                .map_err(|err| CliError::Config(format!("{value}: {err}")))?
        }
        ConfigKey::SearchDebounceMs => config.search_debounce_ms = number(value)?,
        ConfigKey::RequestTimeoutSecs => config.request_timeout_secs = number(value)?,
        ConfigKey::ConnectTimeoutSecs => config.connect_timeout_secs = number(value)?,
        ConfigKey::CredentialBackend => {
            config.credential_backend = value.parse::<CredentialBackend>().map_err(CliError::Config)?
        }
    }
    Ok(config.normalize())
}

async fn prompt(input: &mut (impl AsyncBufRead + Unpin), label: &str) -> Result<String, CliError> {
    let mut stderr = io::stderr();
    stderr.write_all(label.as_bytes()).await?;
    stderr.flush().await?;
    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

async fn confirm(input: &mut (impl AsyncBufRead + Unpin), question: &str) -> Result<bool, CliError> {
    let answer = prompt(input, question).await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedesk_api::{Choice, IssueStatus};

    #[test]
    fn update_requires_some_field() {
        let args = UpdateArgs {
            id: "a".into(),
            title: None,
            description: None,
            status: None,
            priority: None,
            severity: None,
        };
        assert!(matches!(update_patch(&args), Err(CliError::NothingToUpdate)));
    }

    #[test]
    fn update_rejects_blank_title() {
        let args = UpdateArgs {
            id: "a".into(),
            title: Some("  ".into()),
            description: None,
            status: Some(IssueStatus::Closed),
            priority: None,
            severity: None,
        };
        assert!(matches!(
            update_patch(&args),
            Err(CliError::Invalid(FormError::TitleRequired))
        ));
    }

    #[test]
    fn list_patch_trims_search() {
        let args = ListArgs {
            search: Some("  crash ".into()),
            status: Some(Choice::Only(IssueStatus::Open)),
            ..ListArgs::default()
        };
        let patch = list_patch(&args);
        assert_eq!(patch.search.as_deref(), Some("crash"));
        assert_eq!(patch.status, Some(Choice::Only(IssueStatus::Open)));
        assert!(patch.page.is_none());
    }

    #[test]
    fn settings_are_parsed_and_clamped() {
        let config = apply_setting(AppConfig::default(), ConfigKey::PageSize, "250").unwrap();
        assert_eq!(config.page_size, 100);

        let config = apply_setting(config, ConfigKey::CredentialBackend, "file").unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::File);

        assert!(matches!(
            apply_setting(AppConfig::default(), ConfigKey::SearchDebounceMs, "soon"),
            Err(CliError::Config(_))
        ));
    }

    #[tokio::test]
    async fn protected_commands_require_a_session() {
        let server = mockito::Server::new_async().await;
        let cli = Cli {
            command: Command::Counts,
            api_url: Some(server.url()),
            json: false,
            ephemeral: true,
            verbose: 0,
        };
        let config = AppConfig {
            api_base_url: server.url(),
            ..AppConfig::default()
        };
        let store = build_store(&cli, &config).unwrap();
        assert!(matches!(require_session(&store), Err(CliError::NotAuthenticated)));
    }
}
