use super::model::Movie;

/// A single listing filter. Each filterable field carries its own
/// predicate, so a field can only be matched the way it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieFilter {
    /// Case-insensitive prefix match on the title.
    TitlePrefix(String),
    /// The movie's genre set shares at least one of these ids.
    GenreIn(Vec<String>),
}

impl MovieFilter {
    /// Builds the filter for a query parameter, or `None` if the field
    /// cannot be filtered on.
    pub fn from_param(name: &str, value: String) -> Option<Self> {
        match name {
            "title" => Some(MovieFilter::TitlePrefix(value)),
            "genres" => Some(MovieFilter::GenreIn(vec![value])),
            _ => None,
        }
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        match self {
            MovieFilter::TitlePrefix(prefix) => movie
                .title
                .to_lowercase()
                .starts_with(&prefix.to_lowercase()),
            MovieFilter::GenreIn(values) => movie.genres.iter().any(|g| values.contains(g)),
        }
    }
}

/// All filters must hold for a movie to be listed.
pub type MovieQuery = Vec<MovieFilter>;

/// Evaluates a query against a single movie. Used by stores that cannot
/// push the filters down.
pub fn matches(query: &[MovieFilter], movie: &Movie) -> bool {
    query.iter().all(|filter| filter.matches(movie))
}
