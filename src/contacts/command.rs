//! Command dispatch for the contact book
//!
//! Every handler has the same shape: it takes the current [`AddressBook`] by
//! value plus the command's input and returns the (possibly updated) book with
//! an [`Outcome`]. Persisting a mutated book is the caller's job.

use super::{AddressBook, Contact};

/// Command list shown by `help`
pub const HELP_TEXT: &str = "\
Command List:
add -> add new contact
edit -> edit contact
delete -> delete contact
show -> display all contacts
reset -> clear entire address book
exit -> exit program
";

/// Phrase that must be typed to confirm a reset (case-insensitive)
pub const RESET_PHRASE: &str = "deleteaddressbook";

/// Keyword that cancels a delete or edit
pub const CANCEL_KEYWORD: &str = "exit";

/// Command keyword typed at the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `add`
    Add,
    /// `help`
    Help,
    /// `edit`
    Edit,
    /// `show`
    Show,
    /// `delete`
    Delete,
    /// `reset`
    Reset,
    /// `hello` or `hi`
    Greet,
    /// `exit`
    Exit,
    /// Anything else
    Unknown,
}

impl CommandKind {
    /// Parse a menu keyword, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "add" => Self::Add,
            "help" => Self::Help,
            "edit" => Self::Edit,
            "show" => Self::Show,
            "delete" => Self::Delete,
            "reset" => Self::Reset,
            "hello" | "hi" => Self::Greet,
            "exit" => Self::Exit,
            _ => Self::Unknown,
        }
    }
}

/// A fully-specified command, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a contact
    Add(Contact),
    /// Show the command list
    Help,
    /// Replace the contact with this first name
    Edit {
        /// First name to search for
        name: String,
        /// New contact details
        replacement: Contact,
    },
    /// List all contacts
    Show,
    /// Remove the contact with this first name
    Delete(String),
    /// Clear the book
    Reset {
        /// Answer to "are you sure? (y/n)"
        answer: String,
        /// Typed confirmation phrase
        confirmation: String,
    },
    /// Say hello
    Greet,
    /// Leave the program
    Exit,
    /// Unrecognised input
    Unknown,
}

/// What a command did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Text to show the user
    pub message: String,
    /// Whether the book changed and must be persisted
    pub mutated: bool,
    /// Whether the program should stop
    pub exit: bool,
}

impl Outcome {
    fn unchanged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn changed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            mutated: true,
            exit: false,
        }
    }
}

/// Execute a command against the book.
#[must_use]
pub fn execute(book: AddressBook, command: Command) -> (AddressBook, Outcome) {
    match command {
        Command::Add(contact) => add(book, contact),
        Command::Help => (book, Outcome::unchanged(HELP_TEXT)),
        Command::Edit { name, replacement } => edit(book, &name, replacement),
        Command::Show => show(book),
        Command::Delete(name) => delete(book, &name),
        Command::Reset {
            answer,
            confirmation,
        } => reset(book, &answer, &confirmation),
        Command::Greet => (
            book,
            Outcome::unchanged("Hello there! I hope you're having a good day ʕ•ᴥ•ʔﾉ♡"),
        ),
        Command::Exit => (
            book,
            Outcome {
                message: "Goodbye!".to_string(),
                mutated: false,
                exit: true,
            },
        ),
        Command::Unknown => (book, Outcome::unchanged("Please enter a command!")),
    }
}

fn add(mut book: AddressBook, contact: Contact) -> (AddressBook, Outcome) {
    let message = format!("Added {} to Address Book!", contact.first_name);
    book.push(contact);
    (book, Outcome::changed(message))
}

fn show(book: AddressBook) -> (AddressBook, Outcome) {
    let message = if book.is_empty() {
        "The address book is empty.".to_string()
    } else {
        book.listing()
    };
    (book, Outcome::unchanged(message))
}

/// Resolve a first name to exactly one index, or explain why not.
fn locate(book: &AddressBook, name: &str) -> Result<usize, Outcome> {
    if name.trim().eq_ignore_ascii_case(CANCEL_KEYWORD) {
        return Err(Outcome::unchanged("Cancelled."));
    }

    let matches = book.find_by_first_name(name);
    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(Outcome::unchanged(format!(
            "Sorry, I couldn't find {} in the address book!",
            name.trim()
        ))),
        many => {
            let listing: String = many
                .iter()
                .map(|&i| format!("{} | Name: {}\n", i + 1, book.contacts()[i].display_name()))
                .collect();
            Err(Outcome::unchanged(format!(
                "More than one {} was found!\n{listing}",
                name.trim()
            )))
        }
    }
}

fn delete(mut book: AddressBook, name: &str) -> (AddressBook, Outcome) {
    match locate(&book, name) {
        Ok(index) => {
            let removed = book.remove(index);
            let message = format!("Deleted {} from Address Book!", removed.display_name());
            (book, Outcome::changed(message))
        }
        Err(outcome) => (book, outcome),
    }
}

fn edit(mut book: AddressBook, name: &str, replacement: Contact) -> (AddressBook, Outcome) {
    match locate(&book, name) {
        Ok(index) => {
            book.remove(index);
            let message = format!("Updated {}!", replacement.display_name());
            book.insert(index, replacement);
            (book, Outcome::changed(message))
        }
        Err(outcome) => (book, outcome),
    }
}

fn reset(mut book: AddressBook, answer: &str, confirmation: &str) -> (AddressBook, Outcome) {
    if !answer.trim().eq_ignore_ascii_case("y") {
        return (book, Outcome::unchanged("Reset cancelled."));
    }
    let typed: String = confirmation.split_whitespace().collect();
    if !typed.eq_ignore_ascii_case(RESET_PHRASE) {
        return (book, Outcome::unchanged("Confirmation did not match; reset cancelled."));
    }

    book.clear();
    (book, Outcome::changed("Address book has been cleared!"))
}
