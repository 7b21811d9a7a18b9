use serde_json::json;

use tillpoint_store::{Query, Selector};

use crate::error::AppError;
use crate::repo::{Entity, Repository};

/// Direction the page's ids are sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOrder {
    Ascending,
    Descending,
}

/// Boundary selectors computed from the currently displayed page.
///
/// `first` matches records before the first displayed id and probes for a
/// previous page; `last` matches records after the last displayed id and
/// probes for a next page. Both are `None` when the page is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSelectors {
    pub first: Option<Selector>,
    pub last: Option<Selector>,
}

/// Compute cursor selectors from the displayed page's boundary records.
///
/// When a non-empty search `query` is active, the boundary comparison
/// operators are inverted relative to the no-query case. The legacy pager
/// behaves this way and callers depend on it; keep the two branches in sync
/// with it.
pub fn page_selectors<E: Entity>(
    page: &[E],
    order: IdOrder,
    query: Option<&str>,
    query_key: &str,
) -> PageSelectors {
    let (first_id, last_id) = match (page.first(), page.last()) {
        (Some(first), Some(last)) => (first.id(), last.id()),
        _ => {
            return PageSelectors {
                first: None,
                last: None,
            }
        }
    };

    let before = |id: &str| match order {
        IdOrder::Ascending => Selector::Lt("id".into(), json!(id)),
        IdOrder::Descending => Selector::Gt("id".into(), json!(id)),
    };
    let after = |id: &str| match order {
        IdOrder::Ascending => Selector::Gt("id".into(), json!(id)),
        IdOrder::Descending => Selector::Lt("id".into(), json!(id)),
    };

    match query.filter(|q| !q.is_empty()) {
        Some(query) => {
            let matches_query = Selector::ContainsCi(query_key.to_string(), query.to_string());
            PageSelectors {
                first: Some(Selector::And(vec![matches_query.clone(), after(first_id)])),
                last: Some(Selector::And(vec![matches_query, before(last_id)])),
            }
        }
        None => PageSelectors {
            first: Some(before(first_id)),
            last: Some(after(last_id)),
        },
    }
}

/// Whether the current page is the first and/or last page.
///
/// `true` means no further records exist in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatus {
    pub first_page: bool,
    pub last_page: bool,
}

/// Probe the collection for records beyond the displayed page's boundaries.
///
/// Issues two limit-1 existence probes. An empty page anchors nothing, so it
/// resolves to `{first_page: false, last_page: false}` — unknown rather than
/// asserting a boundary.
pub fn page_status<E: Entity>(
    repo: &Repository<E>,
    page: &[E],
    order: IdOrder,
    query: Option<&str>,
    query_key: &str,
    extra: Option<&Selector>,
) -> Result<PageStatus, AppError> {
    if page.is_empty() {
        return Ok(PageStatus {
            first_page: false,
            last_page: false,
        });
    }

    let selectors = page_selectors(page, order, query, query_key);
    let first_page = !probe(repo, selectors.first, extra)?;
    let last_page = !probe(repo, selectors.last, extra)?;
    Ok(PageStatus {
        first_page,
        last_page,
    })
}

/// Whether any record matches the boundary selector (plus an optional extra
/// filter).
fn probe<E: Entity>(
    repo: &Repository<E>,
    selector: Option<Selector>,
    extra: Option<&Selector>,
) -> Result<bool, AppError> {
    let selector = match selector {
        Some(selector) => selector,
        None => return Ok(false),
    };
    let combined = match extra {
        Some(extra) => Selector::And(vec![selector, extra.clone()]),
        None => selector,
    };
    let hit = repo.find_one(&Query::filtered(combined).with_limit(1))?;
    Ok(hit.is_some())
}
