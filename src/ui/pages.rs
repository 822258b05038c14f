//! ui::pages
//!
//! Text rendering of the routed screens.

use chrono::{Datelike, Utc};

use crate::gate::Page;
use crate::session::Session;

/// Render `page` for `session`.
///
/// `api_url` is the chat backend the chat screen talks to.
pub fn render(page: Page, session: &Session, api_url: &str) -> String {
    match page {
        Page::Landing => landing(),
        Page::Chat => format!(
            "Clinical Chat\n\n\
             Ask a question about a clinical pathway. No login is required.\n\
             Backend: {}",
            api_url
        ),
        Page::Login => login(session),
        Page::Practitioner => workspace("Practitioner Workspace", session),
        Page::Hr => workspace("HR Workspace", session),
        Page::Admin => workspace("Administration", session),
    }
}

fn landing() -> String {
    format!(
        "Pathways Clinical Chat\n\
         An evidence-driven clinical decision support platform focused on\n\
         structured pathways, traceability, and safety-first AI assistance.\n\
         \n\
         About\n\
         Pathways Clinical Chat is an experimental system designed to assist\n\
         clinicians by structuring, contextualizing, and surfacing established\n\
         clinical pathways. The project emphasizes transparency, auditable\n\
         reasoning, and secure infrastructure.\n\
         \n\
         Application Areas\n\
         - Clinical Chat Interface (/chat)\n\
         - Pathway Explorer (coming soon)\n\
         - Evidence & References (coming soon)\n\
         - Authentication & User Access (coming soon)\n\
         \n\
         (c) {} Pathways Clinical Chat. Secure Clinical Infrastructure.",
        Utc::now().year()
    )
}

fn login(session: &Session) -> String {
    if session.authenticated() {
        let name = session.username().unwrap_or("an unnamed user");
        return format!("Sign in\n\nSigned in as {} ({}).", name, session.role());
    }
    "Sign in\n\nRun 'login' to sign in with your organization account.".to_string()
}

fn workspace(title: &str, session: &Session) -> String {
    let name = session.username().unwrap_or("unknown user");
    format!("{}\n\nSigned in as {} ({}).", title, name, session.role())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;

    #[test]
    fn landing_carries_product_copy() {
        let text = render(Page::Landing, &Session::new().ready(), "http://api");
        assert!(text.starts_with("Pathways Clinical Chat"));
        assert!(text.contains("safety-first AI assistance"));
        assert!(text.contains(&Utc::now().year().to_string()));
    }

    #[test]
    fn chat_names_the_backend() {
        let text = render(Page::Chat, &Session::new().ready(), "http://localhost:8000");
        assert!(text.contains("http://localhost:8000"));
    }

    #[test]
    fn login_page_reflects_session() {
        let signed_out = render(Page::Login, &Session::new().ready(), "");
        assert!(signed_out.contains("Run 'login'"));

        let session = Session::new()
            .ready()
            .with_credential(true, Some(&Credential::with_realm_roles(["admin"])));
        let signed_in = render(Page::Login, &session, "");
        assert!(signed_in.contains("(admin)"));
    }
}
