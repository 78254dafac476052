use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::Date;

use super::error::LendingError;
use super::models::{Book, Isbn, Loan, MemberId};

/// Canonical state of one title: the public snapshot plus its outstanding loans.
#[derive(Debug)]
pub(crate) struct BookRecord {
    book: Book,
    loans: Vec<Loan>,
}

impl BookRecord {
    fn new(book: Book) -> Self {
        Self {
            book,
            loans: Vec::new(),
        }
    }

    pub(crate) fn book(&self) -> &Book {
        &self.book
    }

    /// Take one copy off the shelf for `member_id`.
    pub(crate) fn lend(&mut self, member_id: MemberId, today: Date) -> Result<Loan, LendingError> {
        let available = self.book.copies_available();
        if available == 0 {
            return Err(LendingError::Unavailable {
                isbn: self.book.isbn(),
            });
        }

        let loan = Loan {
            isbn: self.book.isbn(),
            member_id,
            issued_on: today,
        };
        self.loans.push(loan);
        self.book.set_copies_available(available - 1);
        self.refresh_issue_date();
        Ok(loan)
    }

    /// Put back the oldest copy `member_id` holds.
    pub(crate) fn take_back(&mut self, member_id: MemberId) -> Result<Loan, LendingError> {
        let position = self
            .loans
            .iter()
            .position(|loan| loan.member_id == member_id)
            .ok_or(LendingError::NotBorrowed {
                isbn: self.book.isbn(),
                member_id,
            })?;

        let loan = self.loans.remove(position);
        self.book
            .set_copies_available(self.book.copies_available() + 1);
        self.refresh_issue_date();
        Ok(loan)
    }

    fn refresh_issue_date(&mut self) {
        let oldest = self.loans.iter().map(|loan| loan.issued_on).min();
        self.book.set_issue_date(oldest);
        debug_assert_eq!(
            self.book.copies_available() as usize + self.loans.len(),
            self.book.total_copies() as usize
        );
    }
}

/// Owns every book record; all access goes through one read/write lock.
#[derive(Debug, Default)]
pub struct Catalog {
    records: RwLock<BTreeMap<Isbn, BookRecord>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new title. Identifiers are unique.
    pub fn add(&self, book: Book) -> Result<(), LendingError> {
        let mut records = self.write();
        let isbn = book.isbn();
        if records.contains_key(&isbn) {
            return Err(LendingError::DuplicateBook { isbn });
        }

        tracing::debug!(
            isbn,
            title = book.title(),
            copies = book.total_copies(),
            "book catalogued"
        );
        records.insert(isbn, BookRecord::new(book));
        Ok(())
    }

    pub fn find(&self, isbn: Isbn) -> Option<Book> {
        self.read().get(&isbn).map(|record| record.book.clone())
    }

    /// Snapshot of every title, ordered by ISBN.
    pub fn list(&self) -> Vec<Book> {
        self.read()
            .values()
            .map(|record| record.book.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Titles whose oldest outstanding loan is more than `threshold_days` old
    /// as of `as_of`.
    pub fn find_overdue(&self, as_of: Date, threshold_days: i64) -> Vec<Book> {
        self.read()
            .values()
            .filter(|record| {
                record
                    .book
                    .issue_date()
                    .is_some_and(|issued_on| (as_of - issued_on).whole_days() > threshold_days)
            })
            .map(|record| record.book.clone())
            .collect()
    }

    /// Every outstanding loan past the threshold, oldest title first.
    pub fn overdue_loans(&self, as_of: Date, threshold_days: i64) -> Vec<Loan> {
        self.read()
            .values()
            .flat_map(|record| record.loans.iter())
            .filter(|loan| loan.is_overdue(as_of, threshold_days))
            .copied()
            .collect()
    }

    /// Outstanding loans of one title in issue order.
    pub fn loans_of(&self, isbn: Isbn) -> Option<Vec<Loan>> {
        self.read().get(&isbn).map(|record| record.loans.clone())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Isbn, BookRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Isbn, BookRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn catalog_with(books: &[(Isbn, u32)]) -> Catalog {
        let catalog = Catalog::new();
        for &(isbn, copies) in books {
            catalog
                .add(Book::new(isbn, format!("title {isbn}"), "author", "genre", copies))
                .unwrap();
        }
        catalog
    }

    fn lend_on(catalog: &Catalog, isbn: Isbn, member_id: MemberId, on: Date) -> Loan {
        catalog
            .write()
            .get_mut(&isbn)
            .unwrap()
            .lend(member_id, on)
            .unwrap()
    }

    #[test]
    fn test_duplicate_isbn_is_rejected() {
        let catalog = catalog_with(&[(1, 5)]);
        let err = catalog
            .add(Book::new(1, "Another", "Someone", "Fiction", 1))
            .unwrap_err();

        assert_eq!(err, LendingError::DuplicateBook { isbn: 1 });
        assert_eq!(catalog.find(1).unwrap().title(), "title 1");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_list_is_ordered_snapshot() {
        let catalog = catalog_with(&[(3, 1), (1, 5), (2, 3)]);
        let listed: Vec<Isbn> = catalog.list().iter().map(Book::isbn).collect();
        assert_eq!(listed, vec![1, 2, 3]);
        assert!(catalog.find(4).is_none());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_overdue_boundary_is_strict() {
        let catalog = catalog_with(&[(1, 1), (2, 1), (3, 1)]);
        let today = date!(2024 - 05 - 20);
        lend_on(&catalog, 1, 101, date!(2024 - 05 - 13)); // 7 days
        lend_on(&catalog, 2, 101, date!(2024 - 05 - 12)); // 8 days

        let overdue: Vec<Isbn> = catalog
            .find_overdue(today, 7)
            .iter()
            .map(Book::isbn)
            .collect();
        assert_eq!(overdue, vec![2]);
    }

    #[test]
    fn test_issue_date_tracks_oldest_outstanding_loan() {
        let catalog = catalog_with(&[(1, 3)]);
        lend_on(&catalog, 1, 101, date!(2024 - 05 - 01));
        lend_on(&catalog, 1, 102, date!(2024 - 05 - 10));
        assert_eq!(catalog.find(1).unwrap().issue_date(), Some(date!(2024 - 05 - 01)));

        catalog.write().get_mut(&1).unwrap().take_back(101).unwrap();
        assert_eq!(catalog.find(1).unwrap().issue_date(), Some(date!(2024 - 05 - 10)));

        catalog.write().get_mut(&1).unwrap().take_back(102).unwrap();
        let book = catalog.find(1).unwrap();
        assert_eq!(book.issue_date(), None);
        assert_eq!(book.copies_available(), 3);
    }

    #[test]
    fn test_lend_refuses_empty_shelf() {
        let catalog = catalog_with(&[(1, 1)]);
        lend_on(&catalog, 1, 101, date!(2024 - 05 - 01));

        let err = catalog
            .write()
            .get_mut(&1)
            .unwrap()
            .lend(102, date!(2024 - 05 - 02))
            .unwrap_err();
        assert_eq!(err, LendingError::Unavailable { isbn: 1 });
        assert_eq!(catalog.loans_of(1).unwrap().len(), 1);
    }

    #[test]
    fn test_take_back_requires_a_loan() {
        let catalog = catalog_with(&[(1, 2)]);
        let err = catalog
            .write()
            .get_mut(&1)
            .unwrap()
            .take_back(101)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::NotBorrowed {
                isbn: 1,
                member_id: 101
            }
        );
        assert_eq!(catalog.find(1).unwrap().copies_available(), 2);
    }

    #[test]
    fn test_overdue_loans_are_per_borrower() {
        let catalog = catalog_with(&[(1, 2)]);
        lend_on(&catalog, 1, 101, date!(2024 - 05 - 01));
        lend_on(&catalog, 1, 102, date!(2024 - 05 - 15));

        let loans = catalog.overdue_loans(date!(2024 - 05 - 16), 7);
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].member_id, 101);

        // the title is flagged because its oldest loan is late
        assert_eq!(catalog.find_overdue(date!(2024 - 05 - 16), 7).len(), 1);
    }
}
