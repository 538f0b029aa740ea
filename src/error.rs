use std::fmt;

use http::{Method, StatusCode};

/// Errors produced while building a router or running its dispatch chain.
///
/// Registration-time variants (`PatternCompile`) are returned from the
/// registering call. Request-time variants travel through the composed
/// middleware chain unchanged so that an enclosing error handler can map
/// them with [`RouterError::status`].
#[derive(Debug)]
pub enum RouterError {
    /// A path pattern could not be compiled
    PatternCompile {
        /// The offending pattern
        pattern: String,
        /// What the compiler rejected
        reason: String,
    },
    /// A captured path segment could not be percent-decoded
    ParamDecode {
        /// Parameter name
        name: String,
        /// Raw captured value
        value: String,
        /// Decoder failure
        reason: String,
    },
    /// `route(name)` or `url(name, ..)` for a name that was never registered
    UnknownRoute {
        /// Requested route name
        name: String,
    },
    /// URL generation without a value for a required parameter
    MissingParam {
        /// Route path being reversed
        route: String,
        /// Parameter with no value
        name: String,
    },
    /// URL generation with a value that does not satisfy the parameter pattern
    InvalidParam {
        /// Route path being reversed
        route: String,
        /// Parameter name
        name: String,
        /// Encoded value that failed to match
        value: String,
    },
    /// URL generation requested for a layer backed by a raw regex
    NotReversible {
        /// Regex source of the layer
        route: String,
    },
    /// Request method not in the router's implemented set
    NotImplemented {
        /// Methods registered for the path
        allow: Vec<Method>,
    },
    /// Path exists but not for the request method
    MethodNotAllowed {
        /// Methods registered for the path
        allow: Vec<Method>,
    },
    /// A response header value could not be encoded
    InvalidHeader {
        /// Header name
        name: String,
    },
    /// Application error raised by a handler
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl RouterError {
    /// Wrap an application error so it can travel through the chain.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RouterError::Handler(err.into())
    }

    /// HTTP status an error handler should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::ParamDecode { .. } => StatusCode::BAD_REQUEST,
            RouterError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            RouterError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RouterError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::PatternCompile { pattern, reason } => {
                write!(f, "invalid path pattern '{}': {}", pattern, reason)
            }
            RouterError::ParamDecode {
                name,
                value,
                reason,
            } => {
                write!(
                    f,
                    "failed to decode param '{}' (value '{}'): {}",
                    name, value, reason
                )
            }
            RouterError::UnknownRoute { name } => write!(f, "no route found for name: {}", name),
            RouterError::MissingParam { route, name } => {
                write!(f, "expected param '{}' to build url for '{}'", name, route)
            }
            RouterError::InvalidParam { route, name, value } => {
                write!(
                    f,
                    "value '{}' for param '{}' does not match route '{}'",
                    value, name, route
                )
            }
            RouterError::NotReversible { route } => {
                write!(f, "cannot build a url from regex route '{}'", route)
            }
            RouterError::NotImplemented { allow } => {
                write!(f, "Not Implemented (allow: {})", join_methods(allow))
            }
            RouterError::MethodNotAllowed { allow } => {
                write!(f, "Method Not Allowed (allow: {})", join_methods(allow))
            }
            RouterError::InvalidHeader { name } => {
                write!(f, "invalid value for response header '{}'", name)
            }
            RouterError::Handler(err) => write!(f, "handler error: {}", err),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result alias used across the crate
pub type Result<T, E = RouterError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = RouterError::MethodNotAllowed {
            allow: vec![Method::GET],
        };
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.to_string(), "Method Not Allowed (allow: GET)");

        let err = RouterError::NotImplemented { allow: vec![] };
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_handler_error_source() {
        let err = RouterError::handler("boom");
        assert_eq!(err.to_string(), "handler error: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
