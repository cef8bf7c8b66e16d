//! Line-oriented dashboard: reads commands from stdin and re-renders on state changes.

use std::str::FromStr;
use std::time::Duration;

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use issuedesk_api::{Choice, IssueCounts, IssuePriority, IssueSeverity, IssueStatus};

use super::commands::CliError;
use crate::store::{AppStore, IssuesState, StatusChange};
use crate::view::render;
use crate::view::{Dashboard, IssueForm};

const HELP: &str = "\
commands:
  search <text>            filter by text (empty clears)
  status|priority|severity <value|all>
  page <n> | next | prev   paginate
  clear                    reset all filters
  retry                    reload the list and counts
  show <id>                issue detail
  new <title>              create an issue
  edit <id> <field> <value>  field: title, description, status, priority, severity
  resolve <id> | close <id>
  delete <id>              then 'confirm' or 'cancel'
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Description,
    Status,
    Priority,
    Severity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    Retry,
    Search(String),
    Status(Choice<IssueStatus>),
    Priority(Choice<IssuePriority>),
    Severity(Choice<IssueSeverity>),
    Page(u32),
    Next,
    Prev,
    Clear,
    Show(String),
    New(String),
    Edit {
        id: String,
        field: EditField,
        value: String,
    },
    Resolve(String),
    Close(String),
    Delete(String),
    Confirm,
    Cancel,
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest)
    }
}

impl FromStr for ReplCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let command = match verb.to_lowercase().as_str() {
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "retry" | "refresh" => ReplCommand::Retry,
            "search" | "/" => ReplCommand::Search(rest.to_string()),
            "status" => ReplCommand::Status(required(rest, "status <value|all>")?.parse().map_err(|err| format!("{err}"))?),
            "priority" => ReplCommand::Priority(required(rest, "priority <value|all>")?.parse().map_err(|err| format!("{err}"))?),
            "severity" => ReplCommand::Severity(required(rest, "severity <value|all>")?.parse().map_err(|err| format!("{err}"))?),
            "page" => ReplCommand::Page(
                required(rest, "page <n>")?
                    .parse()
                    .map_err(|_| format!("not a page number: {rest}"))?,
            ),
            "next" => ReplCommand::Next,
            "prev" => ReplCommand::Prev,
            "clear" => ReplCommand::Clear,
            "show" => ReplCommand::Show(required(rest, "show <id>")?.to_string()),
            "new" => ReplCommand::New(required(rest, "new <title>")?.to_string()),
            "edit" => {
                let usage = "edit <id> <field> <value>";
                let mut parts = required(rest, usage)?.splitn(3, char::is_whitespace);
                let id = parts.next().unwrap_or_default().to_string();
                let field = match parts.next().map(str::to_lowercase).as_deref() {
                    Some("title") => EditField::Title,
                    Some("description") => EditField::Description,
                    Some("status") => EditField::Status,
                    Some("priority") => EditField::Priority,
                    Some("severity") => EditField::Severity,
                    _ => return Err(format!("usage: {usage}")),
                };
                let value = parts.next().unwrap_or_default().trim().to_string();
                ReplCommand::Edit { id, field, value }
            }
            "resolve" => ReplCommand::Resolve(required(rest, "resolve <id>")?.to_string()),
            "close" => ReplCommand::Close(required(rest, "close <id>")?.to_string()),
            "delete" => ReplCommand::Delete(required(rest, "delete <id>")?.to_string()),
            "confirm" | "yes" => ReplCommand::Confirm,
            "cancel" | "no" => ReplCommand::Cancel,
            other => return Err(format!("unknown command '{other}', type 'help'")),
        };
        Ok(command)
    }
}

pub async fn run(store: AppStore, search_window: Duration) -> Result<(), CliError> {
    let mut dashboard = Dashboard::new(store.clone(), search_window);
    let renderer = tokio::spawn(render_on_change(store.issues.subscribe()));
    if let Err(message) = dashboard.load().await {
        log::debug!("dashboard: initial load failed: {}", message);
    }
    println!("type 'help' for commands");

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<ReplCommand>() {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(message) = handle(&mut dashboard, command).await {
            println!("{}", render::error_banner(&message));
        }
    }

    renderer.abort();
    Ok(())
}

async fn handle(dashboard: &mut Dashboard, command: ReplCommand) -> Result<(), String> {
    let issues = dashboard.store().issues.clone();
    match command {
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Quit => {}
        ReplCommand::Retry => dashboard.load().await?,
        ReplCommand::Search(text) => dashboard.type_search(text),
        ReplCommand::Status(status) => dashboard.select_status(status).await?,
        ReplCommand::Priority(priority) => dashboard.select_priority(priority).await?,
        ReplCommand::Severity(severity) => dashboard.select_severity(severity).await?,
        ReplCommand::Page(page) => dashboard.go_to_page(page).await?,
        ReplCommand::Next | ReplCommand::Prev => {
            let state = issues.snapshot();
            let current = state.filters.page.unwrap_or(1);
            let target = match (&command, state.pagination) {
                (ReplCommand::Next, Some(info)) if info.has_next_page => current + 1,
                (ReplCommand::Prev, Some(info)) if info.has_prev_page => current.saturating_sub(1),
                _ => return Err("no more pages".to_string()),
            };
            dashboard.go_to_page(target).await?;
        }
        ReplCommand::Clear => dashboard.clear_filters().await?,
        ReplCommand::Show(id) => {
            let shown = issues.fetch_issue_by_id(&id).await;
            issues.clear_selected_issue();
            println!("{}", render::issue_detail(&shown?));
        }
        ReplCommand::New(title) => {
            dashboard.open_create();
            let created = dashboard.submit_create(&IssueForm::titled(title)).await;
            dashboard.close_modal();
            let issue = created.map_err(|err| err.to_string())?;
            println!("created {}", issue.id);
        }
        ReplCommand::Edit { id, field, value } => {
            let mut form = dashboard
                .open_edit(&id)
                .ok_or_else(|| format!("issue {id} is not in the current list"))?;
            let parsed = match field {
                EditField::Title => {
                    form.title = value;
                    Ok(())
                }
                EditField::Description => {
                    form.description = value;
                    Ok(())
                }
                EditField::Status => value.parse().map(|status| form.status = status),
                EditField::Priority => value.parse().map(|priority| form.priority = priority),
                EditField::Severity => value.parse().map(|severity| form.severity = severity),
            };
            if let Err(err) = parsed {
                dashboard.close_modal();
                return Err(err.to_string());
            }
            let updated = dashboard.submit_edit(&form).await;
            dashboard.close_modal();
            match updated.map_err(|err| err.to_string())? {
                Some(issue) => println!("updated {}", issue.id),
                None => println!("nothing changed"),
            }
        }
        ReplCommand::Resolve(id) => {
            let issue = dashboard
                .change_status(&id, StatusChange::Resolve)
                .await
                .map_err(|err| err.to_string())?;
            println!("{} is now {}", issue.id, issue.status);
        }
        ReplCommand::Close(id) => {
            let issue = dashboard
                .change_status(&id, StatusChange::Close)
                .await
                .map_err(|err| err.to_string())?;
            println!("{} is now {}", issue.id, issue.status);
        }
        ReplCommand::Delete(id) => {
            dashboard.request_delete(&id);
            println!("type 'confirm' to delete {id} or 'cancel' to keep it");
        }
        ReplCommand::Confirm => {
            let deleted = dashboard.confirm_delete().await;
            dashboard.close_modal();
            println!("deleted {}", deleted.map_err(|err| err.to_string())?);
        }
        ReplCommand::Cancel => dashboard.close_modal(),
    }
    Ok(())
}

/// Prints the screen whenever a settled list, error or counts snapshot differs from the last one shown.
async fn render_on_change(mut state: watch::Receiver<IssuesState>) {
    let mut shown: Option<(u64, Option<String>, Option<IssueCounts>)> = None;
    while state.changed().await.is_ok() {
        let current = state.borrow_and_update().clone();
        if current.loading {
            continue;
        }
        let key = (current.list_revision, current.error.clone(), current.counts);
        if shown.as_ref() == Some(&key) {
            continue;
        }
        shown = Some(key);
        let search = current.filters.search.clone().unwrap_or_default();
        println!("\n{}", render::dashboard_screen(&current, &search));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filters_and_paging() {
        assert_eq!(
            "status in progress".parse::<ReplCommand>(),
            Ok(ReplCommand::Status(Choice::Only(IssueStatus::InProgress)))
        );
        assert_eq!(
            "priority ALL".parse::<ReplCommand>(),
            Ok(ReplCommand::Priority(Choice::All))
        );
        assert_eq!("page 3".parse::<ReplCommand>(), Ok(ReplCommand::Page(3)));
        assert!("page three".parse::<ReplCommand>().is_err());
    }

    #[test]
    fn search_keeps_remaining_text() {
        assert_eq!(
            "search  login   page".parse::<ReplCommand>(),
            Ok(ReplCommand::Search("login   page".to_string()))
        );
        assert_eq!("search".parse::<ReplCommand>(), Ok(ReplCommand::Search(String::new())));
    }

    #[test]
    fn edit_splits_id_field_and_value() {
        assert_eq!(
            "edit abc123 title Fix the login page".parse::<ReplCommand>(),
            Ok(ReplCommand::Edit {
                id: "abc123".to_string(),
                field: EditField::Title,
                value: "Fix the login page".to_string(),
            })
        );
        assert!("edit abc123 owner bob".parse::<ReplCommand>().is_err());
    }

    #[test]
    fn commands_needing_an_id_report_usage() {
        assert_eq!(
            "delete".parse::<ReplCommand>(),
            Err("usage: delete <id>".to_string())
        );
        assert!("frobnicate".parse::<ReplCommand>().is_err());
    }
}
