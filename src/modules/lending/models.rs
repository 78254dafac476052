use serde::{Deserialize, Serialize};
use time::Date;

/// Catalog identifier of a title.
pub type Isbn = u64;

/// Identifier of a library member.
pub type MemberId = u64;

/// Snapshot of a catalogued title.
///
/// Values handed out by the catalog are copies; the canonical record stays
/// behind the catalog lock and is only changed through lending operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    isbn: Isbn,
    title: String,
    author: String,
    genre: String,
    total_copies: u32,
    copies_available: u32,
    issue_date: Option<Date>,
}

impl Book {
    pub fn new(
        isbn: Isbn,
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        copies: u32,
    ) -> Self {
        Self {
            isbn,
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            total_copies: copies,
            copies_available: copies,
            issue_date: None,
        }
    }

    pub fn isbn(&self) -> Isbn {
        self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    pub fn copies_available(&self) -> u32 {
        self.copies_available
    }

    /// Oldest issue date among the outstanding loans of this title.
    pub fn issue_date(&self) -> Option<Date> {
        self.issue_date
    }

    pub(crate) fn set_copies_available(&mut self, copies: u32) {
        self.copies_available = copies;
    }

    pub(crate) fn set_issue_date(&mut self, issue_date: Option<Date>) {
        self.issue_date = issue_date;
    }
}

/// Snapshot of a library member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    /// Borrowed titles in borrow order. Resolve them through the catalog to
    /// see current availability.
    borrowed: Vec<Isbn>,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            borrowed: Vec::new(),
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn borrowed(&self) -> &[Isbn] {
        &self.borrowed
    }

    pub(crate) fn borrow_book(&mut self, isbn: Isbn) {
        self.borrowed.push(isbn);
    }

    /// Position of the first borrowed copy of `isbn`, if any.
    pub(crate) fn position_of(&self, isbn: Isbn) -> Option<usize> {
        self.borrowed.iter().position(|&borrowed| borrowed == isbn)
    }

    pub(crate) fn release_at(&mut self, position: usize) -> Isbn {
        self.borrowed.remove(position)
    }
}

/// One outstanding copy of a title lent to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub isbn: Isbn,
    pub member_id: MemberId,
    pub issued_on: Date,
}

impl Loan {
    /// Whole days elapsed between issuance and `as_of`.
    pub fn days_out(&self, as_of: Date) -> i64 {
        (as_of - self.issued_on).whole_days()
    }

    /// A loan is overdue once strictly more than `threshold_days` have passed.
    pub fn is_overdue(&self, as_of: Date, threshold_days: i64) -> bool {
        self.days_out(as_of) > threshold_days
    }
}
