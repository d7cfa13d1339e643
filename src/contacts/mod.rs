//! Contact book
//!
//! A flat, ordered list of contacts persisted wholesale as one JSON document.
//! State lives in an explicit [`AddressBook`] value; every command goes
//! through [`execute`], which takes the book and returns the updated book
//! together with an [`Outcome`] for the caller to display.
//!
//! ```rust
//! use philtrack::contacts::{execute, AddressBook, Command, ContactDraft};
//!
//! let contact = ContactDraft::new("ada")
//!     .unwrap()
//!     .last_name("lovelace")
//!     .email("skip")
//!     .build();
//! let (book, outcome) = execute(AddressBook::default(), Command::Add(contact));
//! assert!(outcome.mutated);
//! assert_eq!(book.contacts()[0].first_name, "Ada");
//! assert_eq!(book.contacts()[0].email, None);
//! ```

mod command;
mod store;

pub use command::{execute, Command, CommandKind, Outcome, HELP_TEXT};
pub use store::{ContactStore, DEFAULT_CONTACTS_FILE};

use serde::{Deserialize, Serialize};

/// Keyword that leaves an optional field empty
pub const SKIP_KEYWORD: &str = "skip";

/// One contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// First name, capitalised; never empty
    pub first_name: String,
    /// Last name, capitalised
    pub last_name: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Phone number, digits only by convention
    pub phone: Option<String>,
    /// Email address
    pub email: Option<String>,
}

impl Contact {
    /// "First Last", or just the first name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// Normalize raw input: trim and lowercase.
fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Upper-case the first character.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase with all whitespace removed, for name matching.
fn match_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse an optional field: blank or `skip` leaves it empty.
#[must_use]
pub fn optional_field(raw: &str) -> Option<String> {
    let value = normalize(raw);
    if value.is_empty() || value == SKIP_KEYWORD {
        None
    } else {
        Some(value)
    }
}

/// Contact under construction from user input.
#[derive(Debug, Clone)]
pub struct ContactDraft {
    contact: Contact,
}

impl ContactDraft {
    /// Start a draft from the first name.
    ///
    /// Returns `None` when the name is blank or `skip`; the caller re-prompts.
    #[must_use]
    pub fn new(first_name: &str) -> Option<Self> {
        let first_name = optional_field(first_name)?;
        Some(Self {
            contact: Contact {
                first_name: capitalize(&first_name),
                last_name: None,
                address: None,
                phone: None,
                email: None,
            },
        })
    }

    /// Set the last name (`skip` leaves it empty).
    #[must_use]
    pub fn last_name(mut self, raw: &str) -> Self {
        self.contact.last_name = optional_field(raw).map(|name| capitalize(&name));
        self
    }

    /// Set the address.
    #[must_use]
    pub fn address(mut self, raw: &str) -> Self {
        self.contact.address = optional_field(raw);
        self
    }

    /// Set the phone number.
    #[must_use]
    pub fn phone(mut self, raw: &str) -> Self {
        self.contact.phone = optional_field(raw);
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn email(mut self, raw: &str) -> Self {
        self.contact.email = optional_field(raw);
        self
    }

    /// Fields entered so far, for echoing back while prompting.
    #[must_use]
    pub fn entered(&self) -> Vec<String> {
        let c = &self.contact;
        std::iter::once(c.first_name.clone())
            .chain(
                [&c.last_name, &c.address, &c.phone, &c.email]
                    .into_iter()
                    .flatten()
                    .cloned(),
            )
            .collect()
    }

    /// Finish the contact.
    #[must_use]
    pub fn build(self) -> Contact {
        self.contact
    }
}

/// Ordered collection of contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    contacts: Vec<Contact>,
}

impl AddressBook {
    /// Create a book from contacts, keeping their order.
    #[must_use]
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// Contacts in insertion order.
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Indices of contacts whose first name matches, ignoring case and spaces.
    #[must_use]
    pub fn find_by_first_name(&self, name: &str) -> Vec<usize> {
        let needle = match_key(name);
        self.contacts
            .iter()
            .enumerate()
            .filter(|(_, c)| match_key(&c.first_name) == needle)
            .map(|(i, _)| i)
            .collect()
    }

    /// Numbered listing, one contact per line.
    #[must_use]
    pub fn listing(&self) -> String {
        self.contacts
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} | Name: {}\n", i + 1, c.display_name()))
            .collect()
    }

    fn push(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    fn remove(&mut self, index: usize) -> Contact {
        self.contacts.remove(index)
    }

    fn insert(&mut self, index: usize, contact: Contact) {
        self.contacts.insert(index, contact);
    }

    fn clear(&mut self) {
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_rejects_blank_and_skip_first_name() {
        assert!(ContactDraft::new("").is_none());
        assert!(ContactDraft::new("   ").is_none());
        assert!(ContactDraft::new(" Skip ").is_none());
    }

    #[test]
    fn test_draft_normalizes_fields() {
        let contact = ContactDraft::new("  gREGORIO ")
            .unwrap()
            .last_name("skip")
            .address(" 1 Main St ")
            .phone("5551234")
            .email("SKIP")
            .build();

        assert_eq!(contact.first_name, "Gregorio");
        assert_eq!(contact.last_name, None);
        assert_eq!(contact.address.as_deref(), Some("1 main st"));
        assert_eq!(contact.phone.as_deref(), Some("5551234"));
        assert_eq!(contact.email, None);
        assert_eq!(contact.display_name(), "Gregorio");
    }

    #[test]
    fn test_entered_echoes_filled_fields() {
        let draft = ContactDraft::new("ada").unwrap().last_name("lovelace");
        assert_eq!(draft.entered(), vec!["Ada", "Lovelace"]);
    }

    #[test]
    fn test_find_by_first_name_ignores_case_and_spaces() {
        let book = AddressBook::new(vec![
            ContactDraft::new("mary ann").unwrap().build(),
            ContactDraft::new("bob").unwrap().build(),
        ]);
        assert_eq!(book.find_by_first_name("MaryAnn"), vec![0]);
        assert_eq!(book.find_by_first_name(" BOB "), vec![1]);
        assert!(book.find_by_first_name("nobody").is_empty());
    }

    #[test]
    fn test_listing_is_numbered_from_one() {
        let book = AddressBook::new(vec![ContactDraft::new("ada")
            .unwrap()
            .last_name("lovelace")
            .build()]);
        assert_eq!(book.listing(), "1 | Name: Ada Lovelace\n");
    }
}
