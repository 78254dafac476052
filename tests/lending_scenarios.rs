// End-to-end lending and overdue scanning scenarios.
use std::sync::{Arc, Barrier};
use std::time::Duration;

use lending_app::{
    Book, Catalog, ChannelSink, Isbn, LendingService, ManualClock, Member, MembershipRegistry,
    OverdueReport, OverdueScanner,
};
use lending_kernel::settings::ScannerSettings;
use time::macros::date;
use time::Date;

const TODAY: Date = date!(2024 - 09 - 16);

fn library(books: &[(Isbn, u32)], members: &[u64]) -> (LendingService, Arc<ManualClock>) {
    let catalog = Arc::new(Catalog::new());
    for &(isbn, copies) in books {
        catalog
            .add(Book::new(isbn, format!("Title {isbn}"), "Author", "Genre", copies))
            .unwrap();
    }
    let registry = Arc::new(MembershipRegistry::new());
    for &member_id in members {
        registry
            .add(Member::new(member_id, format!("Member {member_id}")))
            .unwrap();
    }
    let clock = Arc::new(ManualClock::new(TODAY));
    (LendingService::new(catalog, registry, clock.clone()), clock)
}

#[test]
fn reference_issue_and_return_scenario() {
    let (service, _) = library(&[(1, 5)], &[101]);

    assert!(service.issue(1, 101));
    let book = service.catalog().find(1).unwrap();
    assert_eq!(book.copies_available(), 4);
    assert_eq!(book.issue_date(), Some(TODAY));

    assert!(!service.issue(1, 999));
    assert_eq!(service.catalog().find(1).unwrap().copies_available(), 4);

    assert!(service.return_book(1, 101));
    let book = service.catalog().find(1).unwrap();
    assert_eq!(book.copies_available(), 5);
    assert_eq!(book.issue_date(), None);
    assert!(service.members().find(101).unwrap().borrowed().is_empty());
}

#[test]
fn issue_on_empty_shelf_changes_nothing() {
    let (service, _) = library(&[(1, 1)], &[101, 102]);
    assert!(service.issue(1, 101));

    let books_before = service.catalog().list();
    let members_before = service.members().list();
    assert!(!service.issue(1, 102));
    assert_eq!(service.catalog().list(), books_before);
    assert_eq!(service.members().list(), members_before);
}

#[test]
fn concurrent_issues_for_last_copy_have_one_winner() {
    for _ in 0..50 {
        let (service, _) = library(&[(1, 1)], &[101, 102]);
        let barrier = Barrier::new(2);

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = [101, 102]
                .into_iter()
                .map(|member_id| {
                    let service = &service;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        service.issue(1, member_id)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|&&won| won).count(), 1);
        assert_eq!(service.catalog().find(1).unwrap().copies_available(), 0);
        let holders = [101, 102]
            .iter()
            .filter(|&&id| !service.members().find(id).unwrap().borrowed().is_empty())
            .count();
        assert_eq!(holders, 1);
    }
}

#[test]
fn mixed_concurrent_traffic_keeps_counts_consistent() {
    let members: Vec<u64> = (1..=8).collect();
    let (service, _) = library(&[(1, 3), (2, 1)], &members);

    std::thread::scope(|scope| {
        for &member_id in &members {
            let service = &service;
            scope.spawn(move || {
                for round in 0..200u64 {
                    let isbn = 1 + (round + member_id) % 2;
                    if service.issue(isbn, member_id) {
                        assert!(service.return_book(isbn, member_id));
                    } else {
                        assert!(!service.return_book(isbn, member_id));
                    }
                }
            });
        }
    });

    for book in service.catalog().list() {
        assert_eq!(book.copies_available(), book.total_copies());
        assert_eq!(book.issue_date(), None);
    }
}

#[test]
fn overdue_threshold_boundary() {
    let (service, clock) = library(&[(1, 1), (2, 1)], &[101]);
    clock.set(date!(2024 - 09 - 09));
    assert!(service.issue(1, 101)); // 7 days before TODAY
    clock.set(date!(2024 - 09 - 08));
    assert!(service.issue(2, 101)); // 8 days before TODAY

    let overdue = service.catalog().find_overdue(TODAY, 7);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].isbn(), 2);
}

#[tokio::test(start_paused = true)]
async fn scanner_reports_overdue_until_returned() {
    let (service, clock) = library(&[(1, 5), (2, 3)], &[101]);
    clock.set(date!(2024 - 09 - 06));
    assert!(service.issue(1, 101));
    clock.set(TODAY);

    let (sink, mut reports) = ChannelSink::new(8);
    let scanner = OverdueScanner::new(
        service.catalog().clone(),
        clock.clone(),
        &ScannerSettings::default(),
    )
    .with_interval(Duration::from_secs(5));
    let handle = scanner.start(Arc::new(sink));

    let first = reports.recv().await.unwrap();
    let titles: Vec<Isbn> = first.books().iter().map(Book::isbn).collect();
    assert_eq!(titles, vec![1]);
    assert_eq!(first.as_of(), TODAY);

    assert!(service.return_book(1, 101));
    let next = reports.recv().await.unwrap();
    assert_eq!(next, OverdueReport::AllClear { as_of: TODAY });

    let summary = handle.stop().await.unwrap();
    assert_eq!(summary.overdue_reports, 1);
    assert!(summary.all_clear_reports >= 1);
}
