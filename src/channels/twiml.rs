//! TwiML messaging responses.

use reqwest::Url;

use crate::error::ChannelError;

pub const CONTENT_TYPE: &str = "text/xml";

/// One outbound WhatsApp message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Media(String),
}

/// A multi-part reply, rendered as one `<Message>` per part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingResponse {
    messages: Vec<Message>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment: anything starting with `http` is sent as media.
    pub fn push_fragment(&mut self, fragment: &str) -> Result<(), ChannelError> {
        if fragment.starts_with("http") {
            return self.push_media(fragment);
        }
        self.push_text(fragment)
    }

    pub fn push_text(&mut self, text: &str) -> Result<(), ChannelError> {
        let cleaned = strip_control(text);
        if cleaned.trim().is_empty() {
            return Err(ChannelError::InvalidMessage("empty text fragment".into()));
        }
        self.messages.push(Message::Text(cleaned));
        Ok(())
    }

    pub fn push_media(&mut self, url: &str) -> Result<(), ChannelError> {
        let parsed = Url::parse(url.trim()).map_err(|e| ChannelError::InvalidMedia {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChannelError::InvalidMedia {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        self.messages.push(Message::Media(parsed.to_string()));
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the TwiML document.
    pub fn render(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for message in &self.messages {
            match message {
                Message::Text(text) => {
                    xml.push_str("<Message>");
                    xml.push_str(&escape_xml(text));
                    xml.push_str("</Message>");
                }
                Message::Media(url) => {
                    xml.push_str("<Message><Media>");
                    xml.push_str(&escape_xml(url));
                    xml.push_str("</Media></Message>");
                }
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

/// Drop control characters other than newline, carriage return, and tab.
fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
