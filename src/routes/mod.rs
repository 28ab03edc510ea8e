/// Router Module Index
///
/// Route tables grouped by access level. The website routes authenticate inside
/// each handler through the `AuthUser` extractor, which lets OPTIONS answer
/// before any token check.

/// Unauthenticated operational routes.
pub mod public;

/// The `/websites` resource. Every non-OPTIONS method requires a valid token.
pub mod websites;
