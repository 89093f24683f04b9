//! Navigation and session state machine.
//!
//! `NavigationController` is the single authority for view transitions and
//! session mutation; screens receive callbacks into it and never touch the
//! session directly.

use thiserror::Error;
use tracing::warn;

use crate::db::{SubscriptionPlan, UserProfile};

/// Top-level screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Portal,
    Providers,
    Book,
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

impl View {
    /// Parse a view id. Unknown ids are invalid input; callers map them to
    /// `Home` so a bad link can never produce a blank screen.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "home" => Some(Self::Home),
            "login" => Some(Self::Login),
            "portal" => Some(Self::Portal),
            "providers" => Some(Self::Providers),
            "book" => Some(Self::Book),
            "about" => Some(Self::About),
            "services" => Some(Self::Services),
            "technology" => Some(Self::Technology),
            "pricing" => Some(Self::Pricing),
            "contact" => Some(Self::Contact),
            "careers" => Some(Self::Careers),
            "press" => Some(Self::Press),
            "privacy" => Some(Self::Privacy),
            "terms" => Some(Self::Terms),
            "hipaa" => Some(Self::Hipaa),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::Portal => "portal",
            Self::Providers => "providers",
            Self::Book => "book",
            Self::About => "about",
            Self::Services => "services",
            Self::Technology => "technology",
            Self::Pricing => "pricing",
            Self::Contact => "contact",
            Self::Careers => "careers",
            Self::Press => "press",
            Self::Privacy => "privacy",
            Self::Terms => "terms",
            Self::Hipaa => "hipaa",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The action needs a signed-in user. Surfaced instead of the silent
    /// drop the original behavior implied.
    #[error("not signed in")]
    NotSignedIn,
}

/// The current tab's login and navigation state. Lives for the process
/// lifetime; only the bearer token is durable across restarts.
#[derive(Debug, Clone)]
pub struct Session {
    user: Option<UserProfile>,
    current_view: View,
    pending_booking_subject: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            current_view: View::Home,
            pending_booking_subject: String::new(),
        }
    }
}

impl Session {
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn current_view(&self) -> View {
        self.current_view
    }

    pub fn pending_booking_subject(&self) -> &str {
        &self.pending_booking_subject
    }
}

/// Fields a profile edit may change.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default)]
pub struct NavigationController {
    session: Session,
    scroll_reset: bool,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Move to a view. Entering the portal without a user lands on the
    /// login screen instead; every other target is accepted as-is.
    pub fn navigate(&mut self, target: View) {
        if target == View::Portal && self.session.user.is_none() {
            self.session.current_view = View::Login;
            return;
        }
        self.session.current_view = target;
        self.scroll_reset = true;
    }

    /// Navigate by raw view id, mapping unknown ids to the home screen.
    pub fn navigate_slug(&mut self, slug: &str) {
        let target = View::from_slug(slug).unwrap_or_else(|| {
            warn!("Unknown view id {:?}, falling back to home", slug);
            View::Home
        });
        self.navigate(target);
    }

    /// Complete a login. The user is set before the portal transition runs,
    /// so the protected-route check passes instead of bouncing to login.
    pub fn login(&mut self, user: UserProfile) {
        self.session.user = Some(user);
        self.navigate(View::Portal);
        self.scroll_reset = true;
    }

    /// Set the user without navigating; used when rehydrating a session
    /// from a stored token on startup.
    pub fn restore(&mut self, user: UserProfile) {
        self.session.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.session.user = None;
        self.session.current_view = View::Home;
    }

    /// Merge profile edits into the signed-in user.
    pub fn update_user(&mut self, update: UserUpdate) -> Result<(), SessionError> {
        let user = self.session.user.as_mut().ok_or(SessionError::NotSignedIn)?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        Ok(())
    }

    /// Remember which provider the booking screen should prefill, then show
    /// the booking screen.
    pub fn book_provider(&mut self, provider_name: &str) {
        self.session.pending_booking_subject = provider_name.to_string();
        self.session.current_view = View::Book;
        self.scroll_reset = true;
    }

    /// Record a plan purchase on the signed-in user.
    pub fn subscribe(&mut self, plan: SubscriptionPlan) -> Result<(), SessionError> {
        let user = self.session.user.as_mut().ok_or(SessionError::NotSignedIn)?;
        user.subscription_plan = Some(plan);
        Ok(())
    }

    /// Consume the pending scroll-to-top request, if any. The render layer
    /// drains this after each transition.
    pub fn take_scroll_reset(&mut self) -> bool {
        std::mem::take(&mut self.scroll_reset)
    }
}
