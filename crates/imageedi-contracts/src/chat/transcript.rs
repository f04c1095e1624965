use serde::Serialize;
use uuid::Uuid;

use crate::image::EncodedImage;

pub const WELCOME_TEXT: &str = "Welcome to ImageEdi! I'm powered by Gemini. Upload an image to start editing, or describe what you want to generate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: Option<String>,
    pub image: Option<EncodedImage>,
    pub reference_image: Option<EncodedImage>,
    pub is_error: bool,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: short_message_id(),
            role,
            text: Some(text.into()),
            image: None,
            reference_image: None,
            is_error: false,
        }
    }

    pub fn with_image(mut self, image: Option<EncodedImage>) -> Self {
        self.image = image;
        self
    }

    pub fn with_reference(mut self, reference_image: Option<EncodedImage>) -> Self {
        self.reference_image = reference_image;
        self
    }

    pub fn error(text: impl Into<String>) -> Self {
        let mut message = Self::new(Role::Model, text);
        message.is_error = true;
        message
    }
}

/// Conversation history for one session. Starts with the welcome message.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            messages: vec![Message {
                id: "welcome".to_string(),
                ..Message::new(Role::System, WELCOME_TEXT)
            }],
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn short_message_id() -> String {
    Uuid::new_v4().simple().to_string()[..9].to_string()
}
