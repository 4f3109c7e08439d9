use std::fmt;

/// Route registration error
///
/// Returned by [`Router::add_route`](crate::router::Router::add_route) and the
/// dispatcher's registration methods when a pattern cannot be registered.
/// These are configuration mistakes and surface before any traffic is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A `:` segment with nothing after it
    EmptyParamName {
        /// The offending pattern
        pattern: String,
    },
    /// The same parameter name bound twice in one pattern
    ///
    /// Parameter keys are unique per request, so the second binding would
    /// silently overwrite the first.
    DuplicateParamName {
        /// The offending pattern
        pattern: String,
        /// The repeated name
        name: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::EmptyParamName { pattern } => {
                write!(
                    f,
                    "route error: pattern '{}' has a parameter segment without a name",
                    pattern
                )
            }
            RouteError::DuplicateParamName { pattern, name } => {
                write!(
                    f,
                    "route error: pattern '{}' binds parameter '{}' more than once",
                    pattern, name
                )
            }
        }
    }
}

impl std::error::Error for RouteError {}
