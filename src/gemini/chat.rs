//! Stateful multi-turn chat session.
//!
//! The session is an explicit handle rather than a hidden singleton: "no
//! active session" is unrepresentable because sending requires a handle,
//! and resetting the conversation is replacing the handle with a fresh one
//! from [`GeminiClient::start_chat`].

use super::{extract_text, Content, GeminiClient, GeminiError, GenerateContentRequest, FAST_MODEL};

/// Fixed system instruction for every portal chat turn.
pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are JeevoBot, a helpful assistant for Jeevo. \
     Answer questions about healthcare and our services. \
     Be friendly, professional, and concise.";

pub struct ChatSession {
    client: GeminiClient,
    history: Vec<Content>,
}

impl ChatSession {
    pub(crate) fn new(client: GeminiClient) -> Self {
        Self {
            client,
            history: Vec::new(),
        }
    }

    /// Number of turns (user and model) exchanged so far.
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Send one message in the context of all prior turns. The model reply
    /// is appended to the history; a failed turn leaves the history as it
    /// was before the call.
    pub async fn send(&mut self, message: &str) -> Result<String, GeminiError> {
        self.history.push(Content::user(message));

        let request = GenerateContentRequest {
            contents: self.history.clone(),
            system_instruction: Some(Content::system(CHAT_SYSTEM_INSTRUCTION)),
            tools: None,
            generation_config: None,
        };

        let text = match self.client.generate(FAST_MODEL, &request).await {
            Ok(response) => match extract_text(&response) {
                Ok(text) => text,
                Err(e) => {
                    self.history.pop();
                    return Err(e);
                }
            },
            Err(e) => {
                self.history.pop();
                return Err(e);
            }
        };

        self.history.push(Content::model(&text));
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> GeminiClient {
        GeminiClient::new("key", "http://127.0.0.1:1")
    }

    #[test]
    fn test_fresh_session_has_no_context() {
        let client = offline_client();
        let mut session = client.start_chat();
        session.history.push(Content::user("hi"));
        session.history.push(Content::model("hello"));
        assert_eq!(session.turn_count(), 2);

        // Starting again yields a session with no prior turns
        let session = client.start_chat();
        assert_eq!(session.turn_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_unchanged() {
        let mut session = offline_client().start_chat();
        assert!(session.send("hi").await.is_err());
        assert_eq!(session.turn_count(), 0);
    }

    #[test]
    fn test_request_includes_full_history() {
        let mut session = offline_client().start_chat();
        session.history.push(Content::user("what is telehealth?"));
        session.history.push(Content::model("Remote care."));

        let request = GenerateContentRequest {
            contents: session.history.clone(),
            system_instruction: Some(Content::system(CHAT_SYSTEM_INSTRUCTION)),
            tools: None,
            generation_config: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"].as_array().unwrap().len(), 2);
        assert_eq!(json["contents"][1]["role"], "model");
        assert!(json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("JeevoBot"));
    }
}
