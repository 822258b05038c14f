//! gate::routes
//!
//! The route table of the application shell.

use super::{decide, requirements, GateDecision, RoleRequirement};
use crate::session::Session;

/// Screen rendered for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Product landing page.
    Landing,
    /// Public clinical chat.
    Chat,
    /// Sign-in screen.
    Login,
    /// Practitioner workspace.
    Practitioner,
    /// Human resources workspace.
    Hr,
    /// Administration.
    Admin,
}

/// A routed screen and who may see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Absolute path, without trailing slash except for the root.
    pub path: &'static str,
    /// Screen to render.
    pub page: Page,
    /// `None` for public routes.
    pub requirement: Option<RoleRequirement>,
}

/// Every route, in display order.
pub const ROUTES: &[Route] = &[
    Route {
        path: "/",
        page: Page::Landing,
        requirement: None,
    },
    Route {
        path: "/chat",
        page: Page::Chat,
        requirement: None,
    },
    Route {
        path: super::LOGIN_PATH,
        page: Page::Login,
        requirement: None,
    },
    Route {
        path: "/practitioner",
        page: Page::Practitioner,
        requirement: Some(requirements::PRACTITIONER),
    },
    Route {
        path: "/hr",
        page: Page::Hr,
        requirement: Some(requirements::HR),
    },
    Route {
        path: "/admin",
        page: Page::Admin,
        requirement: Some(requirements::ADMIN),
    },
];

impl Route {
    /// Find the route for `path`.
    ///
    /// Trailing slashes and a missing leading slash are tolerated; query
    /// strings and fragments are ignored.
    pub fn resolve(path: &str) -> Option<&'static Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_matches('/');
        ROUTES
            .iter()
            .find(|route| route.path.trim_start_matches('/') == trimmed)
    }

    /// Whether anyone may view this route.
    pub fn is_public(&self) -> bool {
        self.requirement.is_none()
    }

    /// Gate this route for `session`.
    pub fn decide(&self, session: &Session) -> GateDecision {
        decide(session, self.requirement.as_ref())
    }
}
