use crate::model::TodoItem;
use crate::query::TodoQuery;

/// Items to render for `query`, recomputed from whatever pages were fetched.
///
/// Re-applies search, completion, priority and date-range filters and the
/// stable sort regardless of what the server already did, so a backend that
/// ignores a parameter still yields a correct list. Pure: the input slice is
/// not touched and equal inputs give equal outputs.
pub fn derive_items(fetched: &[TodoItem], query: &TodoQuery) -> Vec<TodoItem> {
    let mut items: Vec<TodoItem> = fetched
        .iter()
        .filter(|todo| query.matches_search(todo) && query.matches(todo))
        .cloned()
        .collect();
    query.sort(&mut items);
    items
}
