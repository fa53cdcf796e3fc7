//! In-memory todo collection that stands in for the API once the backend is
//! unreachable.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use ulid::Ulid;

use crate::error::SyncError;
use crate::model::{NewTodo, OffsetPage, Priority, ScrollPage, TodoItem, TodoPatch};
use crate::query::TodoQuery;

struct Seed {
    id: &'static str,
    title: &'static str,
    completed: bool,
    date: &'static str,
    start_date: &'static str,
    priority: Priority,
    created: (i32, u32, u32),
    updated: (i32, u32, u32),
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "1",
        title: "Practice about Frontend Developer",
        completed: false,
        date: "2025-01-15",
        start_date: "2025-01-10",
        priority: Priority::Low,
        created: (2025, 1, 10),
        updated: (2025, 1, 10),
    },
    Seed {
        id: "2",
        title: "Complete JavaScript Algorithms",
        completed: false,
        date: "2025-02-12",
        start_date: "2025-01-15",
        priority: Priority::Medium,
        created: (2025, 1, 10),
        updated: (2025, 1, 10),
    },
    Seed {
        id: "3",
        title: "Build a Responsive Website",
        completed: false,
        date: "2025-03-20",
        start_date: "2025-02-01",
        priority: Priority::High,
        created: (2025, 1, 10),
        updated: (2025, 1, 10),
    },
    Seed {
        id: "4",
        title: "Explore CSS Frameworks",
        completed: true,
        date: "2025-01-15",
        start_date: "2025-01-05",
        priority: Priority::Low,
        created: (2025, 1, 5),
        updated: (2025, 1, 15),
    },
];

static SEED_TODOS: Lazy<Vec<TodoItem>> = Lazy::new(|| SEEDS.iter().map(seed_item).collect());

fn seed_item(seed: &Seed) -> TodoItem {
    TodoItem {
        id: seed.id.to_string(),
        title: seed.title.to_string(),
        completed: seed.completed,
        date: Some(seed.date.to_string()),
        start_date: Some(seed.start_date.to_string()),
        priority: Some(seed.priority),
        created_at: midnight(seed.created),
        updated_at: midnight(seed.updated),
    }
}

fn midnight((year, month, day): (i32, u32, u32)) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct MockStore {
    todos: Vec<TodoItem>,
}

impl MockStore {
    /// The four bundled sample todos.
    pub fn seeded() -> Self {
        Self::from_items(SEED_TODOS.clone())
    }

    pub fn from_items(todos: Vec<TodoItem>) -> Self {
        Self { todos }
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.todos
    }

    /// Filtered and sorted view of the whole store. Search is left to the
    /// derived view.
    pub fn filtered(&self, query: &TodoQuery) -> Vec<TodoItem> {
        let mut matches: Vec<TodoItem> = self
            .todos
            .iter()
            .filter(|todo| query.matches(todo))
            .cloned()
            .collect();
        query.sort(&mut matches);
        matches
    }

    /// Cursor pagination: the cursor is a literal offset. Anything that is not
    /// a number reads as the start.
    pub fn scroll(&self, query: &TodoQuery, cursor: Option<&str>) -> ScrollPage {
        let filtered = self.filtered(query);
        let start = cursor
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0)
            .min(filtered.len());
        let end = start.saturating_add(query.limit.max(1) as usize);
        let has_more = end < filtered.len();
        ScrollPage {
            items: filtered[start..end.min(filtered.len())].to_vec(),
            next_cursor: has_more.then(|| end.to_string()),
            has_more,
        }
    }

    /// Page-number pagination; pages start at 1.
    pub fn page(&self, query: &TodoQuery, page: u32) -> OffsetPage {
        let filtered = self.filtered(query);
        let page = page.max(1);
        let limit = query.limit.max(1) as usize;
        let start = ((page - 1) as usize)
            .saturating_mul(limit)
            .min(filtered.len());
        let end = start.saturating_add(limit);
        let has_next_page = end < filtered.len();
        OffsetPage {
            items: filtered[start..end.min(filtered.len())].to_vec(),
            total: filtered.len(),
            has_next_page,
            next_page: has_next_page.then_some(page + 1),
        }
    }

    /// Prepend a new todo, filling defaults: not completed, medium priority,
    /// dated today.
    pub fn create(&mut self, input: &NewTodo, now: DateTime<Utc>) -> TodoItem {
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let todo = TodoItem {
            id: self.fresh_id(),
            title: input.title.clone(),
            completed: input.completed.unwrap_or(false),
            date: Some(input.date.clone().unwrap_or_else(|| today.clone())),
            start_date: Some(input.start_date.clone().unwrap_or(today)),
            priority: Some(input.priority.unwrap_or(Priority::Medium)),
            created_at: now,
            updated_at: now,
        };
        self.todos.insert(0, todo.clone());
        todo
    }

    pub fn update(
        &mut self,
        id: &str,
        patch: &TodoPatch,
        now: DateTime<Utc>,
    ) -> Result<TodoItem, SyncError> {
        let todo = self
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        patch.apply_to(todo, now);
        Ok(todo.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), SyncError> {
        let index = self
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        self.todos.remove(index);
        Ok(())
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Ulid::new().to_string();
            if !self.todos.iter().any(|todo| todo.id == id) {
                return id;
            }
        }
    }
}
