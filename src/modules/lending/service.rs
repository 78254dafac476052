use std::collections::BTreeMap;
use std::sync::Arc;

use time::Date;

use super::catalog::{BookRecord, Catalog};
use super::clock::Clock;
use super::error::LendingError;
use super::members::MembershipRegistry;
use super::models::{Book, Isbn, Loan, Member, MemberId};

/// Issues and takes back copies.
///
/// Both operations hold the catalog write lock and then the registry write
/// lock for their whole check-and-mutate step. Locks are always taken in
/// that order.
#[derive(Debug, Clone)]
pub struct LendingService {
    catalog: Arc<Catalog>,
    members: Arc<MembershipRegistry>,
    clock: Arc<dyn Clock>,
}

impl LendingService {
    pub fn new(
        catalog: Arc<Catalog>,
        members: Arc<MembershipRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            members,
            clock,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn members(&self) -> &Arc<MembershipRegistry> {
        &self.members
    }

    /// Lend one copy of `isbn` to `member_id`; `false` when refused.
    pub fn issue(&self, isbn: Isbn, member_id: MemberId) -> bool {
        self.try_issue(isbn, member_id).is_ok()
    }

    /// Take back one copy of `isbn` from `member_id`; `false` when refused.
    pub fn return_book(&self, isbn: Isbn, member_id: MemberId) -> bool {
        self.try_return(isbn, member_id).is_ok()
    }

    pub fn try_issue(&self, isbn: Isbn, member_id: MemberId) -> Result<Loan, LendingError> {
        let today = self.clock.today();
        let mut books = self.catalog.write();
        let mut members = self.members.write();

        let result = lend_locked(&mut books, &mut members, isbn, member_id, today);

        match result {
            Ok((loan, remaining)) => {
                tracing::info!(
                    isbn,
                    member_id,
                    remaining,
                    issued_on = %loan.issued_on,
                    "book issued"
                );
                Ok(loan)
            }
            Err(err) => {
                tracing::debug!(isbn, member_id, reason = err.code(), "issue refused");
                Err(err)
            }
        }
    }

    pub fn try_return(&self, isbn: Isbn, member_id: MemberId) -> Result<Loan, LendingError> {
        let mut books = self.catalog.write();
        let mut members = self.members.write();

        let result = return_locked(&mut books, &mut members, isbn, member_id);

        match result {
            Ok((loan, remaining)) => {
                tracing::info!(isbn, member_id, remaining, "book returned");
                Ok(loan)
            }
            Err(err) => {
                tracing::debug!(isbn, member_id, reason = err.code(), "return refused");
                Err(err)
            }
        }
    }

    /// Current catalog snapshots of everything `member_id` holds, in borrow
    /// order. `None` for an unknown member.
    pub fn borrowed_books(&self, member_id: MemberId) -> Option<Vec<Book>> {
        let borrowed = self.members.find(member_id)?.borrowed().to_vec();
        let books = self.catalog.read();
        Some(
            borrowed
                .iter()
                .filter_map(|isbn| books.get(isbn).map(|record| record.book().clone()))
                .collect(),
        )
    }
}

type Records = BTreeMap<Isbn, BookRecord>;
type Members = BTreeMap<MemberId, Member>;

fn lend_locked(
    books: &mut Records,
    members: &mut Members,
    isbn: Isbn,
    member_id: MemberId,
    today: Date,
) -> Result<(Loan, u32), LendingError> {
    let record = books
        .get_mut(&isbn)
        .ok_or(LendingError::BookNotFound { isbn })?;
    let member = members
        .get_mut(&member_id)
        .ok_or(LendingError::MemberNotFound { member_id })?;

    let loan = record.lend(member_id, today)?;
    member.borrow_book(isbn);
    Ok((loan, record.book().copies_available()))
}

fn return_locked(
    books: &mut Records,
    members: &mut Members,
    isbn: Isbn,
    member_id: MemberId,
) -> Result<(Loan, u32), LendingError> {
    let record = books
        .get_mut(&isbn)
        .ok_or(LendingError::BookNotFound { isbn })?;
    let member = members
        .get_mut(&member_id)
        .ok_or(LendingError::MemberNotFound { member_id })?;

    // validate both sides before touching either
    let position = member
        .position_of(isbn)
        .ok_or(LendingError::NotBorrowed { isbn, member_id })?;
    let loan = record.take_back(member_id)?;
    member.release_at(position);
    Ok((loan, record.book().copies_available()))
}
