use std::str::FromStr;

use bolero::generator::{bolero_generator, TypeGenerator};

use crate::{validate_string, Error};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortDirection, Error> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidRequest(format!(
                "unknown sort direction {s:?}"
            ))),
        }
    }
}

/// One page of the flat comment listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ListQuery {
    /// Full-text search terms, all of which must match; empty means no filter
    pub search: String,

    /// 1-based
    pub page: u32,

    pub page_size: u32,
    pub sort: SortDirection,
}

impl Default for ListQuery {
    fn default() -> ListQuery {
        ListQuery {
            search: String::new(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortDirection::Asc,
        }
    }
}

impl ListQuery {
    /// Builds a query from raw request parameters. Unparseable or
    /// non-positive values fall back to their defaults instead of failing.
    pub fn sanitize(
        search: Option<&str>,
        page: Option<&str>,
        page_size: Option<&str>,
        sort: Option<&str>,
    ) -> ListQuery {
        let positive = |v: Option<&str>, default: u32| {
            v.and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        ListQuery {
            search: String::from(search.map(str::trim).unwrap_or("")),
            page: positive(page, DEFAULT_PAGE),
            page_size: positive(page_size, DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            sort: sort.and_then(|s| s.parse().ok()).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.search)
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Search terms, split the way the search predicate tokenizes them
    pub fn search_terms(&self) -> Vec<String> {
        tokenize(&self.search)
    }
}

/// Lowercased alphanumeric words of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}
