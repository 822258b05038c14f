//! gate
//!
//! Role gating for routed screens.
//!
//! # Architecture
//!
//! Each protected route declares a [`RoleRequirement`]. Gating compares the
//! current [`Session`] against it and decides whether the screen renders,
//! waits, or sends the caller to the login screen.
//!
//! # Invariants
//!
//! - Gating never allows a protected route for an unauthenticated session
//! - Gating never redirects before the first handshake has finished
//! - Gating is a pure function of the session and the requirement
//!
//! # Example
//!
//! ```
//! use pathways::gate::{decide, requirements, GateDecision, LOGIN_PATH};
//! use pathways::session::Session;
//!
//! // A session that has not finished its handshake is never redirected.
//! let session = Session::new();
//! assert_eq!(decide(&session, Some(&requirements::ADMIN)), GateDecision::Pending);
//! ```

mod routes;

pub use routes::{Page, Route, ROUTES};

use std::fmt;

use crate::session::{Role, Session};

/// Where unauthorized callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// Roles permitted to view a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement {
    /// Human-readable name for this requirement.
    pub name: &'static str,
    /// Roles that satisfy it.
    pub roles: &'static [Role],
}

impl RoleRequirement {
    /// Create a new requirement.
    pub const fn new(name: &'static str, roles: &'static [Role]) -> Self {
        Self { name, roles }
    }

    /// Check if `role` satisfies the requirement.
    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.roles.iter().map(Role::as_str).collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// Requirements of the role-gated screens.
pub mod requirements {
    use super::*;

    /// Clinicians only.
    pub const PRACTITIONER: RoleRequirement =
        RoleRequirement::new("practitioner", &[Role::Practitioner]);

    /// Human resources staff, or administrators.
    pub const HR: RoleRequirement = RoleRequirement::new("hr", &[Role::Hr, Role::Admin]);

    /// Administrators only.
    pub const ADMIN: RoleRequirement = RoleRequirement::new("admin", &[Role::Admin]);
}

/// Outcome of gating a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Render the screen.
    Allow,
    /// The first handshake is still running; render nothing yet.
    Pending,
    /// Send the caller elsewhere.
    Redirect {
        /// Path to navigate to.
        target: &'static str,
    },
}

impl GateDecision {
    /// Check if the screen may render.
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Decide whether `session` may view a route with `requirement`.
///
/// Routes without a requirement are public and render once the session is
/// ready.
pub fn decide(session: &Session, requirement: Option<&RoleRequirement>) -> GateDecision {
    if !session.is_ready() {
        return GateDecision::Pending;
    }

    match requirement {
        None => GateDecision::Allow,
        Some(requirement) if session.authenticated() && requirement.permits(session.role()) => {
            GateDecision::Allow
        }
        Some(_) => GateDecision::Redirect { target: LOGIN_PATH },
    }
}
