//! Filter, sort and paging state for derived entity lists.
//!
//! The state lives in URL query parameters (`filter`, `sorton`, `sortdir`,
//! `pagesize`, `pageindex`) so that it survives navigation. Any other
//! parameter (e.g. `msel`, `userId`) is kept as an entity selection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::entity::Listable;
use crate::types::{EntityId, Timestamp};

pub const PARAM_FILTER: &str = "filter";
pub const PARAM_SORT_ON: &str = "sorton";
pub const PARAM_SORT_DIR: &str = "sortdir";
pub const PARAM_PAGE_SIZE: &str = "pagesize";
pub const PARAM_PAGE_INDEX: &str = "pageindex";

/// Page size used when the URL carries none (or an unusable one).
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `asc` / `desc` (case-insensitive). Anything else is ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A comparable value extracted from an entity for one sort column.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Time(Timestamp),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Time(_) => 4,
        }
    }

    /// Total order over keys. Text compares case-insensitively; `None`
    /// sorts first; mixed int/float compare numerically.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Option<&str>> for SortKey {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::None, Self::from)
    }
}

/// One page of a filtered, sorted list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of entities that passed the filter, across all pages.
    pub total: usize,
}

/// List state decoded from URL query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub filter: String,
    pub sort_on: Option<String>,
    pub sort_dir: SortDirection,
    pub page_size: usize,
    pub page_index: usize,
    selections: BTreeMap<String, String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort_on: None,
            sort_dir: SortDirection::Asc,
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 0,
            selections: BTreeMap::new(),
        }
    }
}

impl ListParams {
    /// Build from decoded query pairs. Unparsable numbers fall back to the
    /// defaults and a zero page size is treated as the default.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                PARAM_FILTER => params.filter = value.to_string(),
                PARAM_SORT_ON => {
                    params.sort_on = (!value.is_empty()).then(|| value.to_string());
                }
                PARAM_SORT_DIR => params.sort_dir = SortDirection::parse(value),
                PARAM_PAGE_SIZE => {
                    params.page_size = value
                        .parse()
                        .ok()
                        .filter(|size| *size > 0)
                        .unwrap_or(DEFAULT_PAGE_SIZE);
                }
                PARAM_PAGE_INDEX => params.page_index = value.parse().unwrap_or(0),
                other => {
                    params.selections.insert(other.to_string(), value.to_string());
                }
            }
        }
        params
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_on = Some(column.into());
        self.sort_dir = direction;
        self
    }

    pub fn with_page(mut self, page_size: usize, page_index: usize) -> Self {
        self.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        self.page_index = page_index;
        self
    }

    /// Raw value of a non-list parameter such as `msel` or `userId`.
    pub fn selection(&self, name: &str) -> Option<&str> {
        self.selections.get(name).map(String::as_str)
    }

    /// A selection parameter parsed as an entity id.
    pub fn selection_id(&self, name: &str) -> Option<EntityId> {
        self.selection(name).and_then(|raw| raw.parse().ok())
    }

    /// Filter, stable-sort and page `items`.
    pub fn apply<'a, T, I>(&self, items: I) -> Page<T>
    where
        T: Listable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let term = self.filter.trim().to_lowercase();
        let mut matched: Vec<&T> = items
            .into_iter()
            .filter(|item| term.is_empty() || item.search_text().to_lowercase().contains(&term))
            .collect();

        if let Some(column) = self.sort_on.as_deref() {
            matched.sort_by(|a, b| {
                let ordering = a.sort_key(column).compare(&b.sort_key(column));
                match self.sort_dir {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(self.page_index.saturating_mul(self.page_size))
            .take(self.page_size)
            .cloned()
            .collect();

        Page { items, total }
    }
}
