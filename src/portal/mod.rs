//! Headless core of the patient-facing single-page app.
//!
//! Everything here is plain injectable state: the navigation/session state
//! machine, the pure view dispatch, the AI-tool widget state, and the
//! client for our own auth API. No rendering harness is required to drive
//! or test any of it.

pub mod auth_client;
pub mod session;
pub mod view;
pub mod widgets;

pub use auth_client::{AuthClient, AuthClientError, FileTokenStore, MemoryTokenStore, TokenStore};
pub use session::{NavigationController, Session, SessionError, UserUpdate, View};
pub use view::{select_screen, Screen};
pub use widgets::{
    BookingForm, ChatMessage, ChatWidget, HealthInsights, ImageAnalyzer, MessageRole, PromptTool,
    ToolError,
};
