//! Contact form validation and the WhatsApp message built from it.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

const MIN_NAME_CHARS: usize = 2;
const MIN_MESSAGE_CHARS: usize = 10;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Email,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: ContactField,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Service, package or tour the visitor picked, if the form has one.
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub message: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl ContactForm {
    /// Returns every failing field, in form order.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            errors.push(FieldError {
                field: ContactField::Name,
                message: "Por favor, ingresa tu nombre completo.",
            });
        }

        if !is_valid_email(&self.email) {
            errors.push(FieldError {
                field: ContactField::Email,
                message: "Por favor, ingresa un correo electrónico válido.",
            });
        }

        if self.message.trim().chars().count() < MIN_MESSAGE_CHARS {
            errors.push(FieldError {
                field: ContactField::Message,
                message: "Por favor, escribe un mensaje más detallado.",
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Chat message with WhatsApp `*bold*` labels, ready for
    /// [`WhatsAppLink::url`](crate::whatsapp::WhatsAppLink::url).
    pub fn whatsapp_message(&self, greeting: &str) -> String {
        let mut message = format!("{greeting}\n\n");
        message.push_str(&format!("*Nombre:* {}\n", self.name.trim()));
        message.push_str(&format!("*Email:* {}\n", self.email.trim()));

        if let Some(phone) = present(&self.phone) {
            message.push_str(&format!("*Teléfono:* {phone}\n"));
        }
        if let Some(topic) = present(&self.topic) {
            message.push_str(&format!("*Consulta:* {topic}\n"));
        }

        message.push_str(&format!("\n*Mensaje:*\n{}", self.message.trim()));
        message
    }
}
