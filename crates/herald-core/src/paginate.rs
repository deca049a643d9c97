//! Cursor-based pagination conventions.
//!
//! A paginated response carries an explicit boolean "more pages" flag, an
//! opaque continuation cursor, and an array of result items. The aggregator
//! in [`crate::client`] re-issues the request with the cursor attached and
//! merges every page's items into the first response, preserving the remote
//! page order.

use serde_json::Value;

/// Field-name conventions of a paginated API, plus the page ceiling.
///
/// Defaults follow the content-management API
/// (`has_more`/`next_cursor`/`results`, cursor sent as `start_cursor`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRules {
    pub has_more: &'static str,
    pub next_cursor: &'static str,
    pub results: &'static str,
    /// Body field or query parameter carrying the cursor on follow-ups.
    pub cursor_param: &'static str,
    /// Hard bound on pages fetched per logical call. A remote that keeps
    /// returning a cursor that never advances would otherwise loop forever.
    pub max_pages: u32,
}

impl Default for PageRules {
    fn default() -> Self {
        Self {
            has_more: "has_more",
            next_cursor: "next_cursor",
            results: "results",
            cursor_param: "start_cursor",
            max_pages: 1_000,
        }
    }
}

impl PageRules {
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Continuation cursor of `response`, if it advertises more pages.
    ///
    /// A `has_more` of `true` with a null or absent cursor ends the chain,
    /// matching the remote's own termination signal.
    pub fn next_cursor_of(&self, response: &Value) -> Option<String> {
        if !response.get(self.has_more)?.as_bool()? {
            return None;
        }
        response
            .get(self.next_cursor)?
            .as_str()
            .map(str::to_owned)
    }

    /// Append `page`'s result items onto `merged`'s, in arrival order.
    pub fn merge_page(&self, merged: &mut Value, page: &Value) {
        let Some(items) = page.get(self.results).and_then(Value::as_array) else {
            return;
        };
        if let Some(accumulated) = merged.get_mut(self.results).and_then(Value::as_array_mut) {
            accumulated.extend(items.iter().cloned());
        }
    }
}

/// `url` with the cursor attached as a query parameter, percent-encoded.
pub fn url_with_cursor(url: &str, cursor_param: &str, cursor: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{separator}{cursor_param}={}",
        urlencoding::encode(cursor)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cursor_is_surfaced_only_while_more_pages_remain() {
        let rules = PageRules::default();

        let more = json!({"has_more": true, "next_cursor": "abc", "results": []});
        assert_eq!(rules.next_cursor_of(&more).as_deref(), Some("abc"));

        let done = json!({"has_more": false, "next_cursor": null, "results": []});
        assert_eq!(rules.next_cursor_of(&done), None);

        let more_but_null_cursor = json!({"has_more": true, "next_cursor": null});
        assert_eq!(rules.next_cursor_of(&more_but_null_cursor), None);

        let unpaginated = json!({"object": "page"});
        assert_eq!(rules.next_cursor_of(&unpaginated), None);
    }

    #[test]
    fn merging_appends_in_arrival_order() {
        let rules = PageRules::default();
        let mut merged = json!({"results": [1, 2], "has_more": true, "next_cursor": "x"});

        rules.merge_page(&mut merged, &json!({"results": [3, 4], "has_more": false}));

        assert_eq!(merged["results"], json!([1, 2, 3, 4]));
    }

    #[test]
    fn cursor_query_parameter_respects_existing_query_strings() {
        assert_eq!(
            url_with_cursor("https://x.test/users", "start_cursor", "a b"),
            "https://x.test/users?start_cursor=a%20b"
        );
        assert_eq!(
            url_with_cursor("https://x.test/comments?block_id=1", "start_cursor", "c"),
            "https://x.test/comments?block_id=1&start_cursor=c"
        );
    }
}
