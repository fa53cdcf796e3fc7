use chrono::NaiveDate;
use clap::{value_parser, Args, Parser, Subcommand};

use crate::core::{
    CompletedFilter, NewTodo, Priority, PriorityFilter, QueryPatch, SortField, SortOrder,
    TodoPatch,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todosync",
    version,
    about = "Browse and edit a remote todo list, with bundled data when the API is down.",
    after_help = "Examples:\n  todosync list --completed active --sort priority --order asc\n  todosync list --search css --all\n  todosync add Write release notes --priority high --date 2025-03-01\n  todosync update 42 --completed true\n  todosync --offline delete 1 2"
)]
pub struct Cli {
    /// API base URL (defaults to $TODOSYNC_API_URL, then the public demo API)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Serve everything from bundled mock data without contacting the API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true, value_parser = value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Tracing filter directive (e.g. "info", "todosync_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List todos for a filter and sort combination
    List(ListArgs),
    /// Create a todo
    Add(AddArgs),
    /// Change fields of an existing todo
    Update(UpdateArgs),
    /// Delete one or more todos by id
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub completed: Option<CompletedFilter>,

    #[arg(long, value_enum)]
    pub priority: Option<PriorityFilter>,

    /// Only todos due on or after DATE (YYYY-MM-DD)
    #[arg(long = "from", value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Only todos due on or before DATE (YYYY-MM-DD)
    #[arg(long = "to", value_name = "DATE")]
    pub to: Option<NaiveDate>,

    #[arg(long, value_enum)]
    pub sort: Option<SortField>,

    #[arg(long, value_enum)]
    pub order: Option<SortOrder>,

    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,

    /// Page size
    #[arg(long, value_parser = value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    /// Keep fetching until every page is loaded
    #[arg(long, conflicts_with = "page")]
    pub all: bool,

    /// Page-number listing instead of cursor paging
    #[arg(long, value_parser = value_parser!(u32).range(1..))]
    pub page: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Todo title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Due date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long = "start-date")]
    pub start_date: Option<String>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Create the todo already completed
    #[arg(long)]
    pub completed: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, value_name = "BOOL")]
    pub completed: Option<bool>,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long = "start-date")]
    pub start_date: Option<String>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more todo ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

impl ListArgs {
    pub fn filters(&self) -> QueryPatch {
        QueryPatch {
            completed: self.completed,
            priority: self.priority,
            date_gte: self.from.map(Some),
            date_lte: self.to.map(Some),
            sort: self.sort,
            order: self.order,
            search: self.search.clone(),
            limit: self.limit,
        }
    }
}

impl From<AddArgs> for NewTodo {
    fn from(args: AddArgs) -> Self {
        NewTodo {
            title: args.title.join(" "),
            completed: args.completed.then_some(true),
            date: args.date,
            start_date: args.start_date,
            priority: args.priority,
        }
    }
}

impl From<&UpdateArgs> for TodoPatch {
    fn from(args: &UpdateArgs) -> Self {
        TodoPatch {
            title: args.title.clone(),
            completed: args.completed,
            date: args.date.clone(),
            start_date: args.start_date.clone(),
            priority: args.priority,
        }
    }
}
