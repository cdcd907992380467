use crate::db::{MovieFilter, MovieQuery};
use crate::util::QueryParams;

use super::error::{CatalogError, CatalogResult};

pub const DEFAULT_LIMIT: u64 = 5;
pub const DEFAULT_OFFSET: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Pagination {
    /// Absent, non-numeric, zero and negative values all fall back to
    /// the default.
    pub fn new(limit: Option<&str>, offset: Option<&str>, default_limit: u64) -> Self {
        Self {
            limit: coerce(limit, default_limit),
            offset: coerce(offset, DEFAULT_OFFSET),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

fn coerce(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

/// Turns raw filter parameters into a movie query. The pagination keys
/// are ignored; any other unknown key is rejected.
pub fn build_query(params: QueryParams) -> CatalogResult<MovieQuery> {
    let mut query = MovieQuery::new();

    for (key, value) in params.into_inner() {
        if key == "limit" || key == "offset" {
            continue;
        }
        match MovieFilter::from_param(&key, value) {
            Some(filter) => query.push(filter),
            None => return Err(CatalogError::UnsupportedFilter(key)),
        }
    }

    Ok(query)
}

/// Splits listing parameters into pagination and the filter query.
pub fn listing_params(
    mut params: QueryParams,
    default_limit: u64,
) -> CatalogResult<(Pagination, MovieQuery)> {
    let limit = params.remove("limit");
    let offset = params.remove("offset");
    let pagination = Pagination::new(limit.as_deref(), offset.as_deref(), default_limit);
    Ok((pagination, build_query(params)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_build_query_maps_fields() {
        let query = build_query(params(&[("title", "Star"), ("genres", "g1")])).unwrap();
        assert_eq!(query.len(), 2);
        assert!(query.contains(&MovieFilter::TitlePrefix("Star".into())));
        assert!(query.contains(&MovieFilter::GenreIn(vec!["g1".into()])));
    }

    #[test]
    fn test_build_query_drops_pagination_keys() {
        let query = build_query(params(&[("limit", "3"), ("offset", "9"), ("title", "x")])).unwrap();
        assert_eq!(query, vec![MovieFilter::TitlePrefix("x".into())]);

        let query = build_query(params(&[("limit", "3"), ("offset", "9")])).unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_build_query_rejects_unknown_field() {
        let err = build_query(params(&[("director", "Kubrick")])).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedFilter(ref f) if f == "director"));
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::new(None, None, 5), Pagination { limit: 5, offset: 0 });
        assert_eq!(Pagination::new(Some("abc"), Some(""), 5), Pagination { limit: 5, offset: 0 });
        assert_eq!(Pagination::new(Some("0"), Some("-3"), 5), Pagination { limit: 5, offset: 0 });
        assert_eq!(Pagination::new(Some(" 12 "), Some("4"), 5), Pagination { limit: 12, offset: 4 });
    }

    #[test]
    fn test_listing_params() {
        let (page, query) =
            listing_params(params(&[("limit", "2"), ("genres", "g7")]), DEFAULT_LIMIT).unwrap();
        assert_eq!(page, Pagination { limit: 2, offset: 0 });
        assert_eq!(query.len(), 1);
    }
}
