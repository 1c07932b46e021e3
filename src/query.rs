//! Turns the full task list into the ordered subset the list view shows.
//!
//! Filters run in a fixed order (status, search, category, priority) and the
//! survivors are then sorted. Nothing here fails: missing or malformed fields
//! fall back to neutral values.

use crate::models::{Priority, Task, TaskStatus};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusTab {
    #[default]
    All,
    Active,
    Done,
}

impl StatusTab {
    pub const ALL: [StatusTab; 3] = [StatusTab::All, StatusTab::Active, StatusTab::Done];

    pub fn from_label(label: &str) -> Option<StatusTab> {
        match label.trim().to_lowercase().as_str() {
            "all" => Some(StatusTab::All),
            "active" => Some(StatusTab::Active),
            "done" => Some(StatusTab::Done),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusTab::All => "All",
            StatusTab::Active => "Active",
            StatusTab::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            StatusTab::All => 0,
            StatusTab::Active => 1,
            StatusTab::Done => 2,
        }
    }

    pub fn next(self) -> StatusTab {
        StatusTab::ALL[(self.index() + 1) % StatusTab::ALL.len()]
    }

    fn keeps(self, task: &Task) -> bool {
        match self {
            StatusTab::All => true,
            StatusTab::Active => task.status != TaskStatus::Completed,
            StatusTab::Done => task.status == TaskStatus::Completed,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn from_label(label: &str) -> CategoryFilter {
        if label == "All" {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(label.to_string())
        }
    }

    fn keeps(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => task.category_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    /// `All`, or a priority name in any case. Unknown labels filter nothing.
    pub fn from_label(label: &str) -> PriorityFilter {
        label
            .parse::<Priority>()
            .map(PriorityFilter::Only)
            .unwrap_or(PriorityFilter::All)
    }

    pub fn label(self) -> &'static str {
        match self {
            PriorityFilter::All => "All",
            PriorityFilter::Only(p) => p.label(),
        }
    }

    fn keeps(self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => task.priority.parse::<Priority>().ok() == Some(p),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    DueDate,
    Priority,
    Alphabetical,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::NewestFirst,
        SortOrder::DueDate,
        SortOrder::Priority,
        SortOrder::Alphabetical,
    ];

    /// Unrecognized labels fall back to newest first.
    pub fn from_label(label: &str) -> SortOrder {
        match label {
            "Due Date" => SortOrder::DueDate,
            "Priority" => SortOrder::Priority,
            "A-Z" => SortOrder::Alphabetical,
            _ => SortOrder::NewestFirst,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "Newest First",
            SortOrder::DueDate => "Due Date",
            SortOrder::Priority => "Priority",
            SortOrder::Alphabetical => "A-Z",
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortOrder::DueDate => a.due_millis().cmp(&b.due_millis()),
            SortOrder::Priority => a.priority_rank().cmp(&b.priority_rank()),
            SortOrder::Alphabetical => compare_titles(&a.title, &b.title),
            SortOrder::NewestFirst => b.created_millis().cmp(&a.created_millis()),
        }
    }
}

/// Key that orders text the way a base-strength collator would: accents and
/// case are ignored, so "Écrire" sorts with the other e's.
pub fn collation_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b))
}

/// Everything that decides which tasks are shown and in what order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub tab: StatusTab,
    pub search: String,
    pub category: CategoryFilter,
    pub priority: PriorityFilter,
    pub sort: SortOrder,
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(needle))
            .unwrap_or(false)
}

/// Filters and sorts `tasks`, returning references into the input.
///
/// The sort is stable, so tasks with equal keys keep their input order.
pub fn visible_tasks<'a>(tasks: Option<&'a [Task]>, params: &QueryParams) -> Vec<&'a Task> {
    let tasks = tasks.unwrap_or(&[]);

    let needle = if params.search.trim().is_empty() {
        None
    } else {
        Some(params.search.to_lowercase())
    };

    let mut result: Vec<&Task> = tasks
        .iter()
        .filter(|task| params.tab.keeps(task))
        .filter(|task| match &needle {
            Some(needle) => matches_search(task, needle),
            None => true,
        })
        .filter(|task| params.category.keeps(task))
        .filter(|task| params.priority.keeps(task))
        .collect();

    result.sort_by(|a, b| params.sort.compare(a, b));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, priority: &str, created_at: Option<&str>) -> Task {
        Task {
            id: Some(title.to_string()),
            title: title.to_string(),
            description: None,
            category_id: None,
            priority: priority.to_string(),
            due_date: None,
            status: TaskStatus::Pending,
            created_at: created_at.map(str::to_string),
            updated_at: None,
        }
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_absent_list_is_empty() {
        assert!(visible_tasks(None, &QueryParams::default()).is_empty());
    }

    #[test]
    fn test_tabs_split_by_status() {
        let mut a = task("A", "low", Some("2024-01-01T00:00:00Z"));
        a.status = TaskStatus::Completed;
        let b = task("B", "high", Some("2024-01-02T00:00:00Z"));
        let tasks = vec![a, b];

        let mut params = QueryParams {
            tab: StatusTab::Active,
            ..QueryParams::default()
        };
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["B"]);

        params.tab = StatusTab::Done;
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["A"]);

        params.tab = StatusTab::All;
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["B", "A"]);
    }

    #[test]
    fn test_search_matches_title_or_description() {
        let mut milk = task("Buy Milk", "low", None);
        milk.description = Some("from the corner shop".to_string());
        let mut bread = task("Bread", "low", None);
        bread.description = Some("Whole grain, not MILK bread".to_string());
        let eggs = task("Eggs", "low", None);
        let tasks = vec![milk, bread, eggs];

        for query in ["milk", "MILK", "Milk"] {
            let params = QueryParams {
                search: query.to_string(),
                ..QueryParams::default()
            };
            assert_eq!(
                titles(&visible_tasks(Some(&tasks), &params)),
                ["Buy Milk", "Bread"]
            );
        }

        let params = QueryParams {
            search: "corner".to_string(),
            ..QueryParams::default()
        };
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["Buy Milk"]);
    }

    #[test]
    fn test_blank_search_keeps_everything() {
        let tasks = vec![task("A", "low", None), task("B", "low", None)];
        let params = QueryParams {
            search: "   ".to_string(),
            ..QueryParams::default()
        };
        assert_eq!(visible_tasks(Some(&tasks), &params).len(), 2);
    }

    #[test]
    fn test_category_filter_compares_ids() {
        let mut work = task("Work", "low", None);
        work.category_id = Some("2".to_string());
        let mut home = task("Home", "low", None);
        home.category_id = Some("1".to_string());
        let loose = task("Loose", "low", None);
        let tasks = vec![work, home, loose];

        let params = QueryParams {
            category: CategoryFilter::from_label("2"),
            ..QueryParams::default()
        };
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["Work"]);

        let params = QueryParams {
            category: CategoryFilter::from_label("All"),
            ..QueryParams::default()
        };
        assert_eq!(visible_tasks(Some(&tasks), &params).len(), 3);
    }

    #[test]
    fn test_priority_filter_ignores_case() {
        let tasks = vec![
            task("A", "HIGH", None),
            task("B", "low", None),
            task("C", "High", None),
        ];
        let params = QueryParams {
            priority: PriorityFilter::from_label("high"),
            ..QueryParams::default()
        };
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["A", "C"]);
    }

    #[test]
    fn test_priority_sort_puts_unknown_last() {
        let tasks = vec![
            task("A", "whenever", None),
            task("B", "low", None),
            task("C", "High", None),
            task("D", "medium", None),
        ];
        let params = QueryParams {
            sort: SortOrder::Priority,
            ..QueryParams::default()
        };
        assert_eq!(
            titles(&visible_tasks(Some(&tasks), &params)),
            ["C", "D", "B", "A"]
        );
    }

    #[test]
    fn test_due_date_sort_treats_garbage_as_epoch() {
        let mut a = task("A", "low", None);
        a.due_date = Some("2024-03-01".to_string());
        let mut b = task("B", "low", None);
        b.due_date = Some("someday".to_string());
        let mut c = task("C", "low", None);
        c.due_date = Some("2024-02-01T09:00:00Z".to_string());
        let tasks = vec![a, b, c];

        let params = QueryParams {
            sort: SortOrder::DueDate,
            ..QueryParams::default()
        };
        assert_eq!(titles(&visible_tasks(Some(&tasks), &params)), ["B", "C", "A"]);
    }

    #[test]
    fn test_alphabetical_sort_is_case_insensitive() {
        let tasks = vec![
            task("banana", "low", None),
            task("Apple", "low", None),
            task("cherry", "low", None),
        ];
        let params = QueryParams {
            sort: SortOrder::from_label("A-Z"),
            ..QueryParams::default()
        };
        assert_eq!(
            titles(&visible_tasks(Some(&tasks), &params)),
            ["Apple", "banana", "cherry"]
        );
    }

    #[test]
    fn test_alphabetical_sort_ignores_accents() {
        let tasks = vec![
            task("Zebra", "low", None),
            task("Écrire", "low", None),
            task("apple", "low", None),
            task("ecrire", "low", None),
            task("Ölwechsel", "low", None),
        ];
        let params = QueryParams {
            sort: SortOrder::Alphabetical,
            ..QueryParams::default()
        };
        assert_eq!(
            titles(&visible_tasks(Some(&tasks), &params)),
            ["apple", "Écrire", "ecrire", "Ölwechsel", "Zebra"]
        );
    }

    #[test]
    fn test_collation_key() {
        assert_eq!(collation_key("Écrire"), "ecrire");
        assert_eq!(collation_key("CAFÉ"), collation_key("cafe"));
        assert_eq!(collation_key("Straße"), "straße");
    }

    #[test]
    fn test_priority_filter_matches_sort_rank() {
        let tasks = vec![
            task("padded", " High ", None),
            task("plain", "high", None),
            task("other", "urgent", None),
        ];
        let params = QueryParams {
            priority: PriorityFilter::Only(Priority::High),
            ..QueryParams::default()
        };
        let visible = visible_tasks(Some(&tasks), &params);
        assert_eq!(titles(&visible), ["padded", "plain"]);
        assert!(visible.iter().all(|t| t.priority_rank() == 0));
    }

    #[test]
    fn test_newest_first_puts_undated_last_and_keeps_ties() {
        let tasks = vec![
            task("undated-1", "low", None),
            task("old", "low", Some("2023-01-01T00:00:00Z")),
            task("new", "low", Some("2024-01-01T00:00:00Z")),
            task("undated-2", "low", None),
        ];
        let params = QueryParams {
            sort: SortOrder::from_label("something else"),
            ..QueryParams::default()
        };
        assert_eq!(
            titles(&visible_tasks(Some(&tasks), &params)),
            ["new", "old", "undated-1", "undated-2"]
        );
    }

    #[test]
    fn test_returns_references_into_input() {
        let tasks = vec![task("A", "low", None)];
        let visible = visible_tasks(Some(&tasks), &QueryParams::default());
        assert!(std::ptr::eq(visible[0], &tasks[0]));
    }

    #[test]
    fn test_labels() {
        assert_eq!(StatusTab::from_label("Done"), Some(StatusTab::Done));
        assert_eq!(StatusTab::from_label("later"), None);
        assert_eq!(StatusTab::Done.next(), StatusTab::All);
        assert_eq!(PriorityFilter::from_label("All"), PriorityFilter::All);
        for sort in SortOrder::ALL {
            assert_eq!(SortOrder::from_label(sort.label()), sort);
        }
    }
}
