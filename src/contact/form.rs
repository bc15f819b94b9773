use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

const MIN_NAME_LEN: usize = 2;
const MIN_MESSAGE_LEN: usize = 10;
const MAX_MESSAGE_LEN: usize = 5000;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// `something@domain.tld`, no whitespace, exactly one `@`.
fn email_pattern() -> Option<&'static Regex> {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// Length as the relay measures it, in UTF-16 code units.
fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn is_valid_email(email: &str) -> bool {
    match email_pattern() {
        Some(re) => re.is_match(email),
        None => false,
    }
}

/// A contact form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Message,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Message => "message",
        })
    }
}

/// Every failed field with its user-facing message. Never empty when
/// returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, &'static str>,
}

impl ValidationErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.errors.iter().map(|(field, msg)| (*field, *msg))
    }

    fn add(&mut self, field: Field, message: &'static str) {
        self.errors.entry(field).or_insert(message);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid contact form")?;
        for (i, (field, message)) in self.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// What the visitor typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A form that passed validation, trimmed and ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
}

impl ContactForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// Checks all three fields and reports every failure at once.
    ///
    /// Lengths are counted in UTF-16 code units on the trimmed values, the
    /// same measure the relay applies, so a form accepted here is not
    /// refused there for its length.
    pub fn validate(&self) -> Result<ValidForm<'_>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();

        if name.is_empty() {
            errors.add(Field::Name, "El nombre es requerido");
        } else if text_len(name) < MIN_NAME_LEN {
            errors.add(Field::Name, "El nombre debe tener al menos 2 caracteres");
        }

        if email.is_empty() {
            errors.add(Field::Email, "El email es requerido");
        } else if !is_valid_email(email) {
            errors.add(Field::Email, "Por favor ingresa un email válido");
        }

        let message_len = text_len(message);
        if message.is_empty() {
            errors.add(Field::Message, "El mensaje es requerido");
        } else if message_len < MIN_MESSAGE_LEN {
            errors.add(Field::Message, "El mensaje debe tener al menos 10 caracteres");
        } else if message_len > MAX_MESSAGE_LEN {
            errors.add(Field::Message, "El mensaje no puede superar los 5000 caracteres");
        }

        if errors.is_empty() {
            Ok(ValidForm {
                name,
                email,
                message,
            })
        } else {
            Err(errors)
        }
    }
}
