//! ui::header
//!
//! The header bar shown above every screen.

use std::fmt;

use crate::session::Session;

/// Product name shown in the header.
pub const PRODUCT_NAME: &str = "Pathways";

/// The single button the header offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    /// Start a login.
    Login,
    /// End the session.
    Logout,
}

impl HeaderAction {
    /// Button label, also the shell command that triggers it.
    pub fn label(&self) -> &'static str {
        match self {
            HeaderAction::Login => "login",
            HeaderAction::Logout => "logout",
        }
    }
}

/// Header contents for one session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Button to offer.
    pub action: HeaderAction,
    /// Who is signed in, with their role.
    pub identity: Option<String>,
}

impl Header {
    /// Build the header for `session`.
    pub fn for_session(session: &Session) -> Self {
        if !session.authenticated() {
            return Self {
                action: HeaderAction::Login,
                identity: None,
            };
        }

        let name = session.username().unwrap_or("signed in");
        Self {
            action: HeaderAction::Logout,
            identity: Some(format!("{} ({})", name, session.role())),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", PRODUCT_NAME)?;
        if let Some(identity) = &self.identity {
            write!(f, " | {}", identity)?;
        }
        write!(f, " | [{}]", self.action.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;

    #[test]
    fn signed_out_offers_login() {
        let header = Header::for_session(&Session::new().ready());
        assert_eq!(header.action, HeaderAction::Login);
        assert_eq!(header.to_string(), "Pathways | [login]");
    }

    #[test]
    fn signed_in_offers_logout_with_identity() {
        let mut credential = Credential::with_realm_roles(["practitioner"]);
        credential.preferred_username = Some("dr.ames".into());
        let session = Session::new().ready().with_credential(true, Some(&credential));

        let header = Header::for_session(&session);
        assert_eq!(header.action, HeaderAction::Logout);
        assert_eq!(header.to_string(), "Pathways | dr.ames (practitioner) | [logout]");
    }

    #[test]
    fn missing_username_still_shows_role() {
        let session = Session::new()
            .ready()
            .with_credential(true, Some(&Credential::with_realm_roles(["hr"])));
        assert_eq!(
            Header::for_session(&session).identity.as_deref(),
            Some("signed in (hr)")
        );
    }
}
