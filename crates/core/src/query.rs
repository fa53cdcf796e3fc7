//! Filter/sort state, its normalized cache key, and the filter and sort rules
//! shared by the mock backend and the derived view.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

use crate::model::{CompletedFilter, Priority, PriorityFilter, SortField, SortOrder, TodoItem};

pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoQuery {
    pub completed: CompletedFilter,
    pub priority: PriorityFilter,
    pub date_gte: Option<NaiveDate>,
    pub date_lte: Option<NaiveDate>,
    pub sort: SortField,
    pub order: SortOrder,
    pub search: String,
    pub limit: u32,
}

impl Default for TodoQuery {
    fn default() -> Self {
        Self {
            completed: CompletedFilter::All,
            priority: PriorityFilter::All,
            date_gte: None,
            date_lte: None,
            sort: SortField::Date,
            order: SortOrder::Desc,
            search: String::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TodoQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            ..Self::default()
        }
    }

    /// Normalized identity of the query. Cursor and limit are not part of it.
    pub fn key(&self) -> QueryKey {
        let date = |value: Option<NaiveDate>| {
            value
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        QueryKey(format!(
            "completed={}&priority={}&dateGte={}&dateLte={}&sort={}&order={}&search={}",
            self.completed,
            self.priority,
            date(self.date_gte),
            date(self.date_lte),
            self.sort.as_str(),
            self.order.as_str(),
            self.search.trim().to_lowercase(),
        ))
    }

    /// Query-string pairs for the HTTP API. `all` values and an empty search
    /// are omitted rather than sent literally.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.completed != CompletedFilter::All {
            params.push(("completed", self.completed.as_str().to_string()));
        }
        if self.priority != PriorityFilter::All {
            params.push(("priority", self.priority.as_str().to_string()));
        }
        if let Some(gte) = self.date_gte {
            params.push(("dateGte", gte.format("%Y-%m-%d").to_string()));
        }
        if let Some(lte) = self.date_lte {
            params.push(("dateLte", lte.format("%Y-%m-%d").to_string()));
        }
        params.push(("sort", self.sort.as_str().to_string()));
        params.push(("order", self.order.as_str().to_string()));
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        params
    }

    /// Completion, priority and date-range filters, in that order.
    pub fn matches(&self, item: &TodoItem) -> bool {
        if !self.completed.matches(item.completed) {
            return false;
        }
        if !self.priority.matches(item.priority) {
            return false;
        }
        if let Some(gte) = self.date_gte {
            match item.due_date() {
                Some(date) if date >= gte => {}
                _ => return false,
            }
        }
        if let Some(lte) = self.date_lte {
            match item.due_date() {
                Some(date) if date <= lte => {}
                _ => return false,
            }
        }
        true
    }

    /// Case-insensitive substring match on the title; empty search matches all.
    pub fn matches_search(&self, item: &TodoItem) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || item.title.to_lowercase().contains(&needle)
    }

    /// Stable sort: items with equal keys keep their input order in both
    /// directions.
    pub fn sort(&self, items: &mut [TodoItem]) {
        let order = self.order;
        match self.sort {
            SortField::Date => items.sort_by(|a, b| directed(a.due_at().cmp(&b.due_at()), order)),
            SortField::Priority => items.sort_by(|a, b| {
                directed(
                    Priority::rank(a.priority).cmp(&Priority::rank(b.priority)),
                    order,
                )
            }),
        }
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Partial update of a [`TodoQuery`]. Date bounds use a nested option so a
/// patch can clear a bound (`Some(None)`) as well as set one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    pub completed: Option<CompletedFilter>,
    pub priority: Option<PriorityFilter>,
    pub date_gte: Option<Option<NaiveDate>>,
    pub date_lte: Option<Option<NaiveDate>>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub search: Option<String>,
    pub limit: Option<u32>,
}

impl QueryPatch {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn date_range(gte: Option<NaiveDate>, lte: Option<NaiveDate>) -> Self {
        Self {
            date_gte: Some(gte),
            date_lte: Some(lte),
            ..Self::default()
        }
    }

    /// Apply to `query`, returning whether anything changed.
    pub fn apply(self, query: &mut TodoQuery) -> bool {
        let before = query.clone();
        if let Some(completed) = self.completed {
            query.completed = completed;
        }
        if let Some(priority) = self.priority {
            query.priority = priority;
        }
        if let Some(gte) = self.date_gte {
            query.date_gte = gte;
        }
        if let Some(lte) = self.date_lte {
            query.date_lte = lte;
        }
        if let Some(sort) = self.sort {
            query.sort = sort;
        }
        if let Some(order) = self.order {
            query.order = order;
        }
        if let Some(search) = self.search {
            query.search = search;
        }
        if let Some(limit) = self.limit {
            query.limit = limit.max(1);
        }
        *query != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
