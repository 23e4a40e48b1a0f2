//! Registration ledger — append-only sign-ups with uniqueness enforcement.
//!
//! DESIGN
//! ======
//! Validation and append happen under the relay write lock held by the
//! router, so two concurrent registrations with the same email cannot both
//! pass the duplicate check. Rejection reasons are typed; their `Display`
//! strings are the exact wire messages clients key on, so they must not
//! change wording.

use std::sync::OnceLock;

use regex::Regex;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::message::Registration;

/// Basic `local@domain.tld` shape. The same check every platform front-end
/// applies, so acceptance stays consistent across stacks.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Email does not match the `local@domain.tld` shape.
    #[error("Invalid email format")]
    InvalidFormat,
    /// An entry with the same email already exists. Matching is exact and
    /// case-sensitive.
    #[error("This email is already registered")]
    Duplicate,
}

#[derive(Default)]
pub struct Ledger {
    entries: Vec<Registration>,
}

// =============================================================================
// LEDGER
// =============================================================================

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append one sign-up. Assigns the current time when the
    /// client omits a timestamp. Rejections leave the ledger untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a malformed email and `Duplicate` when
    /// the email is already registered.
    pub fn try_register(
        &mut self,
        email: String,
        platform: String,
        timestamp: Option<String>,
    ) -> Result<Registration, RegistrationError> {
        if !email_regex().is_match(&email) {
            return Err(RegistrationError::InvalidFormat);
        }
        if self.entries.iter().any(|r| r.email == email) {
            return Err(RegistrationError::Duplicate);
        }

        let timestamp = timestamp.unwrap_or_else(now_rfc3339);
        let registration = Registration { email, platform, timestamp };
        self.entries.push(registration.clone());
        Ok(registration)
    }

    /// Full ledger snapshot, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Registration> {
        self.entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current UTC time as an RFC 3339 string. Formatting a UTC timestamp cannot
/// fail; the fallback keeps the signature infallible anyway.
fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
