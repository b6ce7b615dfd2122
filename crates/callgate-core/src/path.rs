//! Method path parsing.

/// A `"<service>.<operation>"` path split on its last dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodPath<'a> {
    pub service: &'a str,
    pub operation: &'a str,
}

impl<'a> MethodPath<'a> {
    /// Split `path` on the rightmost `.`.
    ///
    /// The service part may itself contain dots. A path without any dot
    /// yields an empty service name.
    pub fn parse(path: &'a str) -> Self {
        match path.rsplit_once('.') {
            Some((service, operation)) => Self { service, operation },
            None => Self {
                service: "",
                operation: path,
            },
        }
    }
}
