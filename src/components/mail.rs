//! Outgoing mail.
//!
//! The default [`Mail`] service spools messages in memory and logs them; a
//! real transport is plugged in by registering another mailer provider.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: None,
            to: Vec::new(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn to(mut self, address: Address) -> Self {
        self.to.push(address);
        self
    }
}

/// SMTP settings, carried for transports that need them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub auth: bool,
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "MailConfig::default_from_email")]
    pub from_email: String,
    pub from_name: Option<String>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl MailConfig {
    fn default_from_email() -> String {
        "no-reply@localhost".to_string()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: Self::default_from_email(),
            from_name: None,
            smtp: None,
        }
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: Message) -> AppResult<()>;

    /// The sender used when a message has none.
    fn default_sender(&self) -> Address;
}

/// Spooling mailer.
#[derive(Debug, Default)]
pub struct Mail {
    config: MailConfig,
    outbox: Mutex<Vec<Message>>,
}

impl Mail {
    pub const CLASS: &'static str = "app_kernel::components::Mail";

    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Messages sent so far, oldest first.
    pub fn outbox(&self) -> Vec<Message> {
        self.outbox.lock().clone()
    }

    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.outbox.lock())
    }
}

impl Mailer for Mail {
    fn send(&self, mut message: Message) -> AppResult<()> {
        if message.to.is_empty() {
            return Err(AppError::Mail("message has no recipients".to_string()));
        }
        if let Some(bad) = message.to.iter().find(|a| !a.email.contains('@')) {
            return Err(AppError::Mail(format!("invalid recipient: {}", bad.email)));
        }

        if message.from.is_none() {
            message.from = Some(self.default_sender());
        }

        tracing::info!(
            subject = %message.subject,
            recipients = message.to.len(),
            "mail queued"
        );
        self.outbox.lock().push(message);
        Ok(())
    }

    fn default_sender(&self) -> Address {
        Address {
            email: self.config.from_email.clone(),
            name: self.config.from_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_fills_default_sender() {
        let mail = Mail::new(MailConfig {
            from_email: "no-reply@example.com".to_string(),
            from_name: Some("Example".to_string()),
            smtp: None,
        });

        mail.send(Message::new("Hi", "Body").to(Address::new("user@example.com")))
            .unwrap();

        let outbox = mail.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(
            outbox[0].from,
            Some(Address::named("no-reply@example.com", "Example"))
        );
    }

    #[test]
    fn test_send_requires_recipient() {
        let mail = Mail::default();
        let err = mail.send(Message::new("Hi", "Body")).unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
        assert!(mail.outbox().is_empty());
    }

    #[test]
    fn test_drain_empties_outbox() {
        let mail = Mail::default();
        mail.send(Message::new("a", "b").to(Address::new("x@y.z"))).unwrap();
        assert_eq!(mail.drain().len(), 1);
        assert!(mail.outbox().is_empty());
    }

    #[test]
    fn test_config_parses_smtp_block() {
        let config: MailConfig = serde_json::from_value(serde_json::json!({
            "from_email": "a@b.c",
            "smtp": { "auth": true, "host": "smtp.example.com", "port": 465 }
        }))
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert!(smtp.auth);
        assert_eq!(smtp.port, Some(465));
    }
}
