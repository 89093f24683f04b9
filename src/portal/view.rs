//! Pure mapping from session state to the screen to render.

use crate::db::UserProfile;

use super::session::{Session, View};

/// The screen selected for the current session, with the data it needs.
/// Static pages carry no data; their markup is owned by the render layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Composite home page: hero, services, technology showcase,
    /// interactive tools, testimonials, trust and compliance.
    Landing,
    Login,
    Portal { user: UserProfile },
    Providers,
    Book { subject: String },
    About,
    Services,
    Technology,
    Pricing,
    Contact,
    Careers,
    Press,
    Privacy,
    Terms,
    Hipaa,
}

/// Select the screen for a session. The portal screen is gated here as well
/// as in the controller, so a stale view value can never render patient
/// data without a user.
pub fn select_screen(session: &Session) -> Screen {
    match session.current_view() {
        View::Home => Screen::Landing,
        View::Login => Screen::Login,
        View::Portal => match session.user() {
            Some(user) => Screen::Portal { user: user.clone() },
            None => Screen::Login,
        },
        View::Providers => Screen::Providers,
        View::Book => Screen::Book {
            subject: session.pending_booking_subject().to_string(),
        },
        View::About => Screen::About,
        View::Services => Screen::Services,
        View::Technology => Screen::Technology,
        View::Pricing => Screen::Pricing,
        View::Contact => Screen::Contact,
        View::Careers => Screen::Careers,
        View::Press => Screen::Press,
        View::Privacy => Screen::Privacy,
        View::Terms => Screen::Terms,
        View::Hipaa => Screen::Hipaa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRole;
    use crate::portal::session::NavigationController;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: UserRole::Personal,
            subscription_plan: None,
        }
    }

    #[test]
    fn test_default_session_renders_landing() {
        let nav = NavigationController::new();
        assert_eq!(select_screen(nav.session()), Screen::Landing);
    }

    #[test]
    fn test_portal_screen_needs_user() {
        let mut nav = NavigationController::new();
        nav.navigate(View::Portal);
        assert_eq!(select_screen(nav.session()), Screen::Login);

        nav.login(profile());
        assert_eq!(
            select_screen(nav.session()),
            Screen::Portal { user: profile() }
        );
    }

    #[test]
    fn test_book_screen_carries_subject() {
        let mut nav = NavigationController::new();
        nav.book_provider("Dr. Evelyn Reed");
        assert_eq!(
            select_screen(nav.session()),
            Screen::Book {
                subject: "Dr. Evelyn Reed".to_string()
            }
        );
    }

    #[test]
    fn test_every_view_has_a_screen() {
        let mut nav = NavigationController::new();
        nav.login(profile());
        for slug in [
            "home", "login", "portal", "providers", "book", "about", "services", "technology",
            "pricing", "contact", "careers", "press", "privacy", "terms", "hipaa",
        ] {
            nav.navigate_slug(slug);
            // Dispatch is total: no view renders nothing
            let _ = select_screen(nav.session());
        }
    }
}
