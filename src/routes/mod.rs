/// Router Module Index
///
/// Routes are split by access level. Authentication is applied as a router layer on the
/// `authenticated` and `admin` modules, so a protected endpoint cannot be mounted without it.

/// Routes reachable without a token: health probes, login/registration and the published
/// course catalogue.
pub mod public;

/// Routes that require a valid bearer token (or the local `x-user-id` header).
pub mod authenticated;

/// Routes restricted to the ADMIN role. The role is checked by the services after the
/// authentication layer has resolved the caller.
pub mod admin;
