use std::fmt;
use std::io::Write;

use anyhow::{bail, Context, Result};

use crate::cli::{AddArgs, CliCommand, DeleteArgs, ListArgs, UpdateArgs};
use crate::core::{DeleteResult, NewTodo, SyncError, TodoItem, TodoPatch, TodoSync};

pub async fn execute<W: Write>(sync: &TodoSync, command: CliCommand, mut writer: W) -> Result<()> {
    let outcome = match command {
        CliCommand::List(args) => handle_list(sync, &args, &mut writer).await,
        CliCommand::Add(args) => handle_add(sync, args, &mut writer).await,
        CliCommand::Update(args) => handle_update(sync, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(sync, &args, &mut writer).await,
    };
    write_footer(sync, &mut writer)?;
    outcome
}

async fn handle_list<W: Write>(sync: &TodoSync, args: &ListArgs, mut writer: W) -> Result<()> {
    sync.set_filters(args.filters());

    if let Some(page) = args.page {
        let listing = sync
            .load_page(page)
            .await
            .with_context(|| format!("failed to load page {page}"))?;
        write_rows(&listing.items, &mut writer)?;
        writeln!(
            writer,
            "Page {page}: {} of {} tasks",
            listing.items.len(),
            listing.total
        )?;
        if let Some(next) = listing.next_page.filter(|_| listing.has_next_page) {
            writeln!(writer, "Next: --page {next}")?;
        }
        return Ok(());
    }

    if args.all {
        sync.fetch_all().await.context("failed to load tasks")?;
    } else {
        sync.fetch_next().await.context("failed to load tasks")?;
    }
    let snapshot = sync.snapshot();
    write_rows(&snapshot.items, &mut writer)?;
    if snapshot.has_more {
        writeln!(writer, "More tasks available (use --all)")?;
    }
    Ok(())
}

async fn handle_add<W: Write>(sync: &TodoSync, args: AddArgs, mut writer: W) -> Result<()> {
    let todo = sync
        .create(NewTodo::from(args))
        .await
        .context("failed to add task")?;
    writeln!(writer, "{}", TaskRow(&todo))?;
    Ok(())
}

async fn handle_update<W: Write>(sync: &TodoSync, args: &UpdateArgs, mut writer: W) -> Result<()> {
    let patch = TodoPatch::from(args);
    if patch.is_empty() {
        bail!("nothing to update for {}", args.id);
    }
    let todo = sync
        .update(&args.id, patch)
        .await
        .with_context(|| format!("failed to update {}", args.id))?;
    writeln!(writer, "{}", TaskRow(&todo))?;
    Ok(())
}

async fn handle_delete<W: Write>(sync: &TodoSync, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let mut results = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let deleted = match sync.delete(id).await {
            Ok(()) => true,
            Err(SyncError::NotFound(_)) => false,
            Err(err) => return Err(err).with_context(|| format!("failed to delete {id}")),
        };
        results.push(DeleteResult {
            id: id.clone(),
            deleted,
        });
    }
    let summary = DeleteSummary::from_results(&results);
    summary.write_to(&mut writer)?;
    Ok(())
}

fn write_rows<W: Write>(items: &[TodoItem], mut writer: W) -> Result<()> {
    if items.is_empty() {
        writeln!(writer, "No tasks")?;
    }
    for todo in items {
        writeln!(writer, "{}", TaskRow(todo))?;
    }
    Ok(())
}

fn write_footer<W: Write>(sync: &TodoSync, mut writer: W) -> Result<()> {
    for notice in sync.take_notices() {
        if notice.is_error() {
            writeln!(writer, "! {notice}")?;
        } else {
            writeln!(writer, "{notice}")?;
        }
    }
    if sync.remote().using_mock_data() {
        writeln!(writer, "(showing mock data: the API is unavailable)")?;
    }
    Ok(())
}

struct TaskRow<'a>(&'a TodoItem);

impl fmt::Display for TaskRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let todo = self.0;
        let mark = if todo.completed { 'x' } else { ' ' };
        let due = todo
            .due_date()
            .map(|date| date.to_string())
            .unwrap_or_else(|| "-".to_string());
        let priority = todo.priority.map(|p| p.as_str()).unwrap_or("-");
        write!(
            f,
            "[{mark}] {:<10} {:<6} {:<28} {}",
            due, priority, todo.id, todo.title
        )
    }
}

struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn from_results(results: &[DeleteResult]) -> Self {
        let mut deleted = 0usize;
        let mut missing = Vec::new();
        for result in results {
            if result.deleted {
                deleted += 1;
            } else {
                missing.push(result.id.clone());
            }
        }
        Self { deleted, missing }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::AppConfig;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn offline_sync() -> TodoSync {
        let config = AppConfig::for_api("http://127.0.0.1:9")
            .expect("config")
            .with_offline(true);
        TodoSync::from_config(&config).expect("sync")
    }

    async fn run(sync: &TodoSync, args: &[&str]) -> (Result<()>, String) {
        let cli = Cli::parse_from(std::iter::once("todosync").chain(args.iter().copied()));
        let mut output = Vec::new();
        let result = execute(sync, cli.command, &mut output).await;
        (result, String::from_utf8(output).expect("utf8"))
    }

    #[rstest]
    #[case(0, "No tasks deleted")]
    #[case(1, "Deleted 1 task")]
    #[case(3, "Deleted 3 tasks")]
    fn summary_line_pluralizes(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(SummaryLine::deleted(count).to_string(), expected);
    }

    #[tokio::test]
    async fn list_prints_the_derived_view() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["list", "--completed", "active", "--order", "asc"]).await;
        result.expect("list");
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].contains("2025-01-15"));
        assert!(lines[2].contains("2025-03-20"));
        assert!(!output.contains("[x]"));
        assert!(output.contains("showing mock data"));
    }

    #[tokio::test]
    async fn list_reports_remaining_pages() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["list", "--limit", "2"]).await;
        result.expect("list");
        assert!(output.contains("More tasks available"));

        let (result, output) = run(&sync, &["list", "--limit", "2", "--all"]).await;
        result.expect("list all");
        assert!(!output.contains("More tasks available"));
    }

    #[tokio::test]
    async fn page_mode_prints_totals() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["list", "--limit", "3", "--page", "1"]).await;
        result.expect("page");
        assert!(output.contains("Page 1: 3 of 4 tasks"));
        assert!(output.contains("Next: --page 2"));
    }

    #[tokio::test]
    async fn add_prints_the_task_and_notice() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["add", "Ship", "it", "--priority", "high"]).await;
        result.expect("add");
        assert!(output.contains("Ship it"));
        assert!(output.contains("high"));
        assert!(output.contains("Task Added!"));
    }

    #[tokio::test]
    async fn add_rejects_blank_title() {
        let sync = offline_sync();
        let (result, _) = run(&sync, &["add", " "]).await;
        let err = result.expect_err("blank title");
        assert!(format!("{err:#}").contains("title cannot be empty"));
    }

    #[tokio::test]
    async fn update_without_fields_is_an_error() {
        let sync = offline_sync();
        let (result, _) = run(&sync, &["update", "1"]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_missing_id_prints_failure_notice() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["update", "missing", "--completed", "true"]).await;
        assert!(result.is_err());
        assert!(output.contains("! Failed to update task"));
    }

    #[tokio::test]
    async fn delete_command_reports_deleted_and_missing() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["delete", "1", "missing"]).await;
        result.expect("delete");
        assert!(output.contains("Deleted 1 task"));
        assert!(output.contains("Not found: missing"));
    }

    #[tokio::test]
    async fn delete_command_handles_no_matches() {
        let sync = offline_sync();
        let (result, output) = run(&sync, &["delete", "missing"]).await;
        result.expect("delete");
        assert!(output.contains("No tasks deleted"));
    }
}
