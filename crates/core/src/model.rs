use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Ordering rank for priority sorts. Items without a priority rank as `Low`.
    pub fn rank(priority: Option<Priority>) -> u8 {
        match priority.unwrap_or(Priority::Low) {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow!(
                "Unknown priority '{}': expected low|medium|high",
                other
            )),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        &[Priority::Low, Priority::Medium, Priority::High]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletedFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl CompletedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletedFilter::All => "all",
            CompletedFilter::Active => "active",
            CompletedFilter::Completed => "completed",
        }
    }

    pub fn matches(&self, completed: bool) -> bool {
        match self {
            CompletedFilter::All => true,
            CompletedFilter::Active => !completed,
            CompletedFilter::Completed => completed,
        }
    }
}

impl fmt::Display for CompletedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompletedFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(CompletedFilter::All),
            "active" | "open" => Ok(CompletedFilter::Active),
            "completed" | "done" => Ok(CompletedFilter::Completed),
            other => Err(anyhow!(
                "Unknown completion filter '{}': expected all|active|completed",
                other
            )),
        }
    }
}

impl ValueEnum for CompletedFilter {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            CompletedFilter::All,
            CompletedFilter::Active,
            CompletedFilter::Completed,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityFilter::All => "all",
            PriorityFilter::Low => "low",
            PriorityFilter::Medium => "medium",
            PriorityFilter::High => "high",
        }
    }

    pub fn as_priority(&self) -> Option<Priority> {
        match self {
            PriorityFilter::All => None,
            PriorityFilter::Low => Some(Priority::Low),
            PriorityFilter::Medium => Some(Priority::Medium),
            PriorityFilter::High => Some(Priority::High),
        }
    }

    /// An item without a priority only passes the `All` filter.
    pub fn matches(&self, priority: Option<Priority>) -> bool {
        match self.as_priority() {
            None => true,
            Some(wanted) => priority == Some(wanted),
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PriorityFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(PriorityFilter::All),
            other => other
                .parse::<Priority>()
                .map(PriorityFilter::from)
                .map_err(|_| {
                    anyhow!(
                        "Unknown priority filter '{}': expected all|low|medium|high",
                        other
                    )
                }),
        }
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PriorityFilter::Low,
            Priority::Medium => PriorityFilter::Medium,
            Priority::High => PriorityFilter::High,
        }
    }
}

impl ValueEnum for PriorityFilter {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            PriorityFilter::All,
            PriorityFilter::Low,
            PriorityFilter::Medium,
            PriorityFilter::High,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Date,
    Priority,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Priority => "priority",
        }
    }
}

impl FromStr for SortField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "date" | "due" => Ok(SortField::Date),
            "priority" => Ok(SortField::Priority),
            other => Err(anyhow!(
                "Unknown sort field '{}': expected date|priority",
                other
            )),
        }
    }
}

impl ValueEnum for SortField {
    fn value_variants<'a>() -> &'a [Self] {
        &[SortField::Date, SortField::Priority]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(anyhow!("Unknown sort order '{}': expected asc|desc", other)),
        }
    }
}

impl ValueEnum for SortOrder {
    fn value_variants<'a>() -> &'a [Self] {
        &[SortOrder::Asc, SortOrder::Desc]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// Sort key for the `date` field. Unparseable dates read as missing.
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        self.date.as_deref().and_then(parse_date_key)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_at().map(|at| at.date())
    }
}

/// Parse the loose date strings the API hands out: plain `YYYY-MM-DD`, RFC 3339
/// timestamps, or naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date_key(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.naive_utc());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Input for creating a todo from any client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn require_title(&self) -> Result<(), SyncError> {
        if self.title.trim().is_empty() {
            return Err(SyncError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.completed.is_none()
            && self.date.is_none()
            && self.start_date.is_none()
            && self.priority.is_none()
    }

    /// Merge the patch into `item` and stamp `updated_at`, never earlier than
    /// `created_at`.
    pub fn apply_to(&self, item: &mut TodoItem, stamped_at: DateTime<Utc>) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        if let Some(date) = &self.date {
            item.date = Some(date.clone());
        }
        if let Some(start_date) = &self.start_date {
            item.start_date = Some(start_date.clone());
        }
        if let Some(priority) = self.priority {
            item.priority = Some(priority);
        }
        item.updated_at = stamped_at.max(item.created_at);
    }
}

/// One page of cursor pagination (`GET /todos/scroll`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPage {
    #[serde(rename = "todos")]
    pub items: Vec<TodoItem>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasNextPage")]
    pub has_more: bool,
}

/// One page of page-number pagination (`GET /todos`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPage {
    #[serde(rename = "todos")]
    pub items: Vec<TodoItem>,
    #[serde(rename = "totalTodos")]
    pub total: usize,
    pub has_next_page: bool,
    #[serde(default)]
    pub next_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: String,
    pub deleted: bool,
}
