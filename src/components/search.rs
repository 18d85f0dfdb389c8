use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use unicode_normalization::UnicodeNormalization;

use super::Component;
use crate::config::SiteConfig;
use crate::util::{announce, debounce, select_all};
use crate::{EventTarget, NodeId, Page, Result};

/// What the search and filter stubs were asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchActivity {
    pub queries: Vec<String>,
    pub filters: Vec<BTreeMap<String, String>>,
}

/// Search box and filter selects. Neither filters anything: requests are
/// announced, logged and recorded in [`SearchActivity`].
pub struct Search {
    config: Rc<SiteConfig>,
    activity: Rc<RefCell<SearchActivity>>,
}

impl Search {
    pub fn new(config: Rc<SiteConfig>) -> Self {
        Self {
            config,
            activity: Rc::default(),
        }
    }

    pub fn activity(&self) -> SearchActivity {
        self.activity.borrow().clone()
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new(Rc::default())
    }
}

pub(crate) fn normalize_query(raw: &str) -> String {
    raw.trim().nfkc().collect()
}

fn perform_search(page: &mut Page, activity: &RefCell<SearchActivity>, query: &str) -> Result<()> {
    tracing::info!(query, "search requested");
    page.console_log(&format!("Searching for: {query}"));
    activity.borrow_mut().queries.push(query.to_string());
    announce(page, &format!("Searching for {query}"))
}

fn collect_filters(page: &Page) -> Result<BTreeMap<String, String>> {
    let mut filters = BTreeMap::new();
    for select in select_all(page, ".filter-select", None)? {
        let Some(key) = page
            .attr(select, "data-filter")
            .or_else(|| page.attr(select, "name"))
            .filter(|key| !key.is_empty())
        else {
            continue;
        };
        let value = page.value(select)?;
        if !value.is_empty() {
            filters.insert(key, value);
        }
    }
    Ok(filters)
}

fn apply_filters(
    page: &mut Page,
    activity: &RefCell<SearchActivity>,
    announcement: &str,
) -> Result<()> {
    let filters = collect_filters(page)?;
    tracing::info!(?filters, "filters applied");
    page.console_log(&format!("Applying filters: {filters:?}"));
    activity.borrow_mut().filters.push(filters);
    announce(page, announcement)
}

impl Component for Search {
    fn name(&self) -> &'static str {
        "Search"
    }

    fn init(&self, page: &mut Page) -> Result<()> {
        let min_chars = self.config.timing.search_min_chars;
        let debounce_ms = self.config.timing.search_debounce_ms;

        for form in select_all(page, ".search-form", None)? {
            let input = page.query_within(form, ".search-input")?;
            let activity = self.activity.clone();
            page.add_event_listener(EventTarget::Node(form), "submit", move |page, event| {
                event.prevent_default();
                let Some(input) = input else {
                    return Ok(());
                };
                let query = normalize_query(&page.value(input)?);
                if query.is_empty() {
                    return Ok(());
                }
                perform_search(page, &activity, &query)
            });
        }

        for input in select_all(page, ".search-input", None)? {
            let activity = self.activity.clone();
            let delayed = debounce(debounce_ms, move |page| {
                let query = normalize_query(&page.value(input)?);
                if query.chars().count() > min_chars {
                    perform_search(page, &activity, &query)?;
                }
                Ok(())
            });
            page.add_event_listener(EventTarget::Node(input), "input", move |page, _| {
                delayed.call(page)
            });
        }

        for select in select_all(page, ".filter-select", None)? {
            let activity = self.activity.clone();
            page.add_event_listener(EventTarget::Node(select), "change", move |page, _| {
                apply_filters(page, &activity, "Filters applied")
            });
        }

        for clear in select_all(page, ".clear-filters, [data-action=\"clear-filters\"]", None)? {
            let activity = self.activity.clone();
            page.add_event_listener(EventTarget::Node(clear), "click", move |page, event| {
                event.prevent_default();
                clear_filters(page)?;
                apply_filters(page, &activity, "Filters cleared")
            });
        }
        tracing::debug!("search initialized");
        Ok(())
    }
}

fn clear_filters(page: &mut Page) -> Result<()> {
    let selects: Vec<NodeId> = select_all(page, ".filter-select", None)?;
    for select in selects {
        page.set_value(select, "")?;
    }
    Ok(())
}
