//! State for the AI health tool widgets.
//!
//! Every async action is guarded by a `busy` flag: set before dispatch,
//! cleared when the call resolves, and checked on entry so an in-flight
//! request blocks a duplicate submission (the disabled-button contract).
//! Local validation failures surface inline and never set `busy`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::gemini::{ChatSession, GeminiClient, WebSource};

#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    /// A prior call from this widget has not resolved yet.
    #[error("request already in flight")]
    Busy,
}

const CHAT_GREETING: &str = "Hello! I'm JeevoBot. How can I help you today?";
const CHAT_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";
const TOOL_EMPTY_PROMPT: &str = "Please enter a query.";
const TOOL_FAILURE: &str = "An error occurred. Please try again.";
const IMAGE_MISSING_INPUT: &str = "Please upload an image and provide a prompt.";
const IMAGE_FAILURE: &str = "Failed to analyze the image. Please try again.";
const BOOKING_MISSING_FIELDS: &str = "Please fill in all required fields.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

/// One entry in a chat transcript. Append-only; the sequence is cleared
/// only when the widget is recreated or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<WebSource>,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: MessageRole::User,
            content: content.to_string(),
            sources: Vec::new(),
        }
    }

    fn model(content: &str) -> Self {
        Self {
            role: MessageRole::Model,
            content: content.to_string(),
            sources: Vec::new(),
        }
    }
}

/// The floating assistant: one persistent chat session, with an optional
/// search-grounded mode that answers single turns with citations.
pub struct ChatWidget {
    client: GeminiClient,
    session: ChatSession,
    messages: Vec<ChatMessage>,
    grounded: bool,
    busy: bool,
}

impl ChatWidget {
    pub fn new(client: &GeminiClient) -> Self {
        Self {
            client: client.clone(),
            session: client.start_chat(),
            messages: vec![ChatMessage::model(CHAT_GREETING)],
            grounded: false,
            busy: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    /// Discard the conversation: fresh session, fresh transcript.
    pub fn reset(&mut self) {
        self.session = self.client.start_chat();
        self.messages = vec![ChatMessage::model(CHAT_GREETING)];
    }

    /// Send the user's input. Service failures surface as a fallback model
    /// message rather than an error; the transcript always moves forward.
    pub async fn send(&mut self, input: &str) -> Result<(), ToolError> {
        if input.trim().is_empty() {
            return Ok(());
        }
        if self.busy {
            return Err(ToolError::Busy);
        }

        self.messages.push(ChatMessage::user(input));
        self.busy = true;

        let reply = if self.grounded {
            match self.client.complete_grounded(input).await {
                Ok(grounded) => ChatMessage {
                    role: MessageRole::Model,
                    content: grounded.text,
                    sources: grounded.sources,
                },
                Err(e) => {
                    warn!("Chatbot error: {}", e);
                    ChatMessage::model(CHAT_FALLBACK)
                }
            }
        } else {
            match self.session.send(input).await {
                Ok(text) => ChatMessage::model(&text),
                Err(e) => {
                    warn!("Chatbot error: {}", e);
                    ChatMessage::model(CHAT_FALLBACK)
                }
            }
        };

        self.messages.push(reply);
        self.busy = false;
        Ok(())
    }
}

/// Which model profile a prompt tool runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolProfile {
    /// Low-latency: the symptom checker.
    Fast,
    /// Extended reasoning: the medical research assistant.
    Thinking,
}

/// A single prompt-in, text-out tool card.
#[derive(Debug)]
pub struct PromptTool {
    profile: ToolProfile,
    result: Option<String>,
    error: Option<String>,
    busy: bool,
}

impl PromptTool {
    pub fn symptom_checker() -> Self {
        Self::new(ToolProfile::Fast)
    }

    pub fn research_assistant() -> Self {
        Self::new(ToolProfile::Thinking)
    }

    fn new(profile: ToolProfile) -> Self {
        Self {
            profile,
            result: None,
            error: None,
            busy: false,
        }
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn run(&mut self, client: &GeminiClient, prompt: &str) -> Result<(), ToolError> {
        if self.busy {
            return Err(ToolError::Busy);
        }
        if prompt.trim().is_empty() {
            self.error = Some(TOOL_EMPTY_PROMPT.to_string());
            return Ok(());
        }

        self.busy = true;
        self.error = None;
        self.result = None;

        let outcome = match self.profile {
            ToolProfile::Fast => client.complete_fast(prompt).await,
            ToolProfile::Thinking => client.complete_thinking(prompt).await,
        };

        match outcome {
            Ok(text) => self.result = Some(text),
            Err(e) => {
                warn!("Prompt tool error: {}", e);
                self.error = Some(TOOL_FAILURE.to_string());
            }
        }

        self.busy = false;
        Ok(())
    }
}

/// The diagnostic assistant: image plus prompt in, analysis out.
#[derive(Debug, Default)]
pub struct ImageAnalyzer {
    analysis: Option<String>,
    error: Option<String>,
    busy: bool,
}

impl ImageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn analyze(
        &mut self,
        client: &GeminiClient,
        prompt: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), ToolError> {
        if self.busy {
            return Err(ToolError::Busy);
        }
        if bytes.is_empty() || prompt.trim().is_empty() {
            self.error = Some(IMAGE_MISSING_INPUT.to_string());
            return Ok(());
        }
        // Reject unreadable or non-image files before dispatching anything
        if let Err(e) = crate::gemini::validate_image(file_name, bytes) {
            self.error = Some(e.to_string());
            return Ok(());
        }

        self.busy = true;
        self.error = None;
        self.analysis = None;

        match client.analyze_image(prompt, file_name, bytes).await {
            Ok(text) => self.analysis = Some(text),
            Err(e) => {
                warn!("Image analysis error: {}", e);
                self.error = Some(IMAGE_FAILURE.to_string());
            }
        }

        self.busy = false;
        Ok(())
    }
}

/// A confirmed appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub provider: String,
    pub date: String,
    pub time: String,
    pub sms_sent: bool,
}

/// The appointment booking form. The provider field is prefilled from the
/// session's pending booking subject when the screen opens.
#[derive(Debug, Default)]
pub struct BookingForm {
    pub provider: String,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub sms_reminder: bool,
    error: Option<String>,
    confirmation: Option<BookingConfirmation>,
    busy: bool,
}

impl BookingForm {
    pub fn new(prefilled_provider: &str) -> Self {
        Self {
            provider: prefilled_provider.to_string(),
            sms_reminder: true,
            ..Self::default()
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Submit the booking. Guarded like every other async action so a
    /// double click cannot book twice. On success the confirmation is
    /// available from [`BookingForm::confirmation`].
    pub async fn confirm(&mut self) -> Result<(), ToolError> {
        if self.busy {
            return Err(ToolError::Busy);
        }
        if self.provider.trim().is_empty()
            || self.date.trim().is_empty()
            || self.time.trim().is_empty()
        {
            self.error = Some(BOOKING_MISSING_FIELDS.to_string());
            return Ok(());
        }

        self.busy = true;
        self.error = None;

        self.confirmation = Some(BookingConfirmation {
            provider: self.provider.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            sms_sent: self.sms_reminder,
        });

        self.busy = false;
        Ok(())
    }
}

/// Portal panel that summarizes the patient's vitals and lab results.
#[derive(Debug, Default)]
pub struct HealthInsights {
    summary: Option<String>,
    error: Option<String>,
    busy: bool,
}

impl HealthInsights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn analyze(
        &mut self,
        client: &GeminiClient,
        record: &serde_json::Value,
    ) -> Result<(), ToolError> {
        if self.busy {
            return Err(ToolError::Busy);
        }

        self.busy = true;
        self.error = None;
        self.summary = None;

        match client.summarize_health_record(record).await {
            Ok(text) => self.summary = Some(text),
            Err(e) => {
                warn!("Health summary error: {}", e);
                self.error = Some(TOOL_FAILURE.to_string());
            }
        }

        self.busy = false;
        Ok(())
    }
}

/// Demo vitals and lab results shown in the patient portal.
pub fn mock_health_record() -> serde_json::Value {
    serde_json::json!({
        "vitals": {
            "heart_rate_bpm": 72,
            "blood_pressure": "118/76",
            "temperature_f": 98.4,
            "spo2_percent": 98
        },
        "lab_results": [
            { "test": "Hemoglobin A1c", "value": 5.4, "unit": "%", "reference_range": "4.0-5.6" },
            { "test": "LDL Cholesterol", "value": 142, "unit": "mg/dL", "reference_range": "<100" },
            { "test": "Vitamin D", "value": 28, "unit": "ng/mL", "reference_range": "30-100" }
        ]
    })
}
