pub mod error;
pub mod query;
pub mod service;

pub use error::{error_response, CatalogError, CatalogResult};
pub use query::{build_query, Pagination};
pub use service::{ActingUser, MovieDetail, MoviePage, MovieService};
