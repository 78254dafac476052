//! Reasons a lending operation can be refused.

use thiserror::Error;

use super::models::{Isbn, MemberId};

/// Expected business failures. None of them leaves partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingError {
    #[error("book {isbn} is not in the catalog")]
    BookNotFound { isbn: Isbn },

    #[error("member {member_id} is not registered")]
    MemberNotFound { member_id: MemberId },

    #[error("no copies of book {isbn} are available")]
    Unavailable { isbn: Isbn },

    #[error("member {member_id} has not borrowed book {isbn}")]
    NotBorrowed { isbn: Isbn, member_id: MemberId },

    #[error("book {isbn} is already catalogued")]
    DuplicateBook { isbn: Isbn },

    #[error("member {member_id} is already registered")]
    DuplicateMember { member_id: MemberId },
}

impl LendingError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            LendingError::BookNotFound { .. } => "book_not_found",
            LendingError::MemberNotFound { .. } => "member_not_found",
            LendingError::Unavailable { .. } => "unavailable",
            LendingError::NotBorrowed { .. } => "not_borrowed",
            LendingError::DuplicateBook { .. } => "duplicate_book",
            LendingError::DuplicateMember { .. } => "duplicate_member",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_identifiers() {
        let error = LendingError::NotBorrowed {
            isbn: 2,
            member_id: 102,
        };
        assert_eq!(error.to_string(), "member 102 has not borrowed book 2");
        assert_eq!(error.code(), "not_borrowed");
    }

    #[test]
    fn test_unavailable_code() {
        assert_eq!(LendingError::Unavailable { isbn: 1 }.code(), "unavailable");
    }
}
