/// Router Module Index
///
/// Routes are split by who may reach them. Authorization beyond "is logged in" (role
/// allow-lists, module permissions, ownership) is checked inside the handlers.

/// Routes reachable without a token. Read handlers take an optional principal and
/// narrow what they return for anonymous callers.
pub mod public;

/// Routes behind the `AuthUser` middleware: content writes, media, dashboard.
pub mod authenticated;

/// User and role management, restricted to `super-admin`.
pub mod admin;
