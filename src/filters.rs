use crate::models::{Category, Priority};
use crate::query::{CategoryFilter, PriorityFilter, QueryParams, SortOrder, StatusTab};

/// The list view's current tab, search text and filter choices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    params: QueryParams,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn tab(&self) -> StatusTab {
        self.params.tab
    }

    pub fn search(&self) -> &str {
        &self.params.search
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.params.category
    }

    pub fn priority(&self) -> PriorityFilter {
        self.params.priority
    }

    pub fn sort(&self) -> SortOrder {
        self.params.sort
    }

    pub fn set_tab(&mut self, tab: StatusTab) {
        self.params.tab = tab;
    }

    pub fn next_tab(&mut self) {
        self.params.tab = self.params.tab.next();
    }

    pub fn set_search(&mut self, text: &str) {
        self.params.search = text.to_string();
    }

    pub fn push_search(&mut self, c: char) {
        self.params.search.push(c);
    }

    pub fn pop_search(&mut self) {
        self.params.search.pop();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.params.category = category;
    }

    pub fn set_priority(&mut self, priority: PriorityFilter) {
        self.params.priority = priority;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.params.sort = sort;
    }

    /// True when category, priority or sort differ from their defaults.
    pub fn has_active_filters(&self) -> bool {
        self.params.category != CategoryFilter::All
            || self.params.priority != PriorityFilter::All
            || self.params.sort != SortOrder::NewestFirst
    }

    /// Resets category, priority and sort. Tab and search are left alone.
    pub fn clear_filters(&mut self) {
        self.params.category = CategoryFilter::All;
        self.params.priority = PriorityFilter::All;
        self.params.sort = SortOrder::NewestFirst;
    }

    /// Steps through `All` followed by each category with an id.
    pub fn cycle_category(&mut self, categories: &[Category], forward: bool) {
        let mut options = vec![CategoryFilter::All];
        options.extend(
            categories
                .iter()
                .filter_map(|c| c.id.clone())
                .map(CategoryFilter::Only),
        );
        let current = options
            .iter()
            .position(|o| *o == self.params.category)
            .unwrap_or(0);
        self.params.category = options[step(current, options.len(), forward)].clone();
    }

    pub fn cycle_priority(&mut self, forward: bool) {
        let mut options = vec![PriorityFilter::All];
        options.extend(Priority::ALL.iter().rev().map(|p| PriorityFilter::Only(*p)));
        let current = options
            .iter()
            .position(|o| *o == self.params.priority)
            .unwrap_or(0);
        self.params.priority = options[step(current, options.len(), forward)];
    }

    pub fn cycle_sort(&mut self, forward: bool) {
        let current = SortOrder::ALL
            .iter()
            .position(|s| *s == self.params.sort)
            .unwrap_or(0);
        self.params.sort = SortOrder::ALL[step(current, SortOrder::ALL.len(), forward)];
    }
}

pub(crate) fn step(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}
