//! Page slicing for the photo roster loop.
//!
//! The locomotive detail page iterates a pre-sliced page of photos
//! rather than the raw list.  The dispatcher derives the page number
//! from the `page` query parameter, slices here, and exposes the
//! result under its own identifier for the template loop to consume:
//!
//! ```
//! use railplate::pagination::{page_param, paginate, DEFAULT_PAGE_SIZE};
//! use railplate::{context, Value};
//!
//! let photos = Value::from_serialize(&(0..120).collect::<Vec<_>>());
//! let query = context! { page => "3" };
//! let page = paginate(&photos, DEFAULT_PAGE_SIZE, page_param(&query));
//! assert_eq!(page.items.len(), 20);
//! assert_eq!(page.total_pages, 3);
//! ```

use crate::value::{Value, ValueMap};

/// Photos shown per page on a locomotive detail page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A 1-based page slice of a larger list.
#[derive(Debug, Clone)]
pub struct Page {
    /// The items on this page, in list order.
    pub items: Vec<Value>,
    /// The 1-based page number, clamped to at least 1.
    pub page: usize,
    /// Number of pages the whole list spans.
    pub total_pages: usize,
    /// Length of the whole list.
    pub total_items: usize,
}

/// Slices a list (or record-set wrapper) into a 1-based page.
///
/// Out-of-range page numbers yield an empty slice, never an error; a
/// page number below 1 clamps to the first page.
pub fn paginate(list: &Value, page_size: usize, page: usize) -> Page {
    let items = list.as_list().unwrap_or(&[]);
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = (total_items + page_size - 1) / page_size;
    let start = (page - 1).saturating_mul(page_size);
    let slice = if start >= total_items {
        &[][..]
    } else {
        &items[start..(start + page_size).min(total_items)]
    };
    Page {
        items: slice.to_vec(),
        page,
        total_pages,
        total_items,
    }
}

/// Parses the 1-based `page` query parameter from a
/// `locals.query`-shaped record.  Anything that is not a positive
/// integer falls back to page 1.
pub fn page_param(query: &Value) -> usize {
    let raw = query.get_attr("page");
    let parsed = match raw.as_str() {
        Some(s) => s.trim().parse::<i64>().ok(),
        None => raw.as_f64().map(|f| f as i64),
    };
    match parsed {
        Some(page) if page >= 1 => page as usize,
        _ => 1,
    }
}

impl From<Page> for Value {
    fn from(page: Page) -> Value {
        let mut map = ValueMap::new();
        map.insert("items".to_string(), Value::from(page.items));
        map.insert("page".to_string(), Value::from(page.page));
        map.insert("totalPages".to_string(), Value::from(page.total_pages));
        map.insert("totalItems".to_string(), Value::from(page.total_items));
        Value::from(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn photos(count: usize) -> Value {
        Value::from((0..count as i64).map(Value::from).collect::<Vec<_>>())
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate(&photos(120), 50, 3);
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.items[0], Value::from(100));
        assert_eq!(page.items[19], Value::from(119));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 120);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let page = paginate(&photos(120), 50, 99);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_page_below_one_clamps() {
        let page = paginate(&photos(10), 50, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 10);
    }

    #[test]
    fn test_record_set_wrapper_slices_identically() {
        let bare = photos(7);
        let mut wrapper = ValueMap::new();
        wrapper.insert("results".to_string(), bare.clone());
        let wrapped = Value::from(wrapper);
        assert_eq!(
            paginate(&bare, 5, 2).items,
            paginate(&wrapped, 5, 2).items
        );
    }

    #[test]
    fn test_page_param() {
        assert_eq!(page_param(&crate::context! { page => "3" }), 3);
        assert_eq!(page_param(&crate::context! { page => 2 }), 2);
        assert_eq!(page_param(&crate::context! { page => "zero" }), 1);
        assert_eq!(page_param(&crate::context! { page => "-4" }), 1);
        assert_eq!(page_param(&crate::context! {}), 1);
    }

    #[test]
    fn test_page_param_from_locals_query() {
        // the dispatcher hands over `locals.query` from the request
        let ctx = crate::context! {
            locals => crate::context! { query => crate::context! { page => "2", q => "dash 9" } },
        };
        let query = ctx.get_attr("locals").get_attr("query");
        assert_eq!(page_param(&query), 2);
    }
}
