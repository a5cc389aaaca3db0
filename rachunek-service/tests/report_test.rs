//! Reports, search and CSV export.

mod common;

use chrono::NaiveDate;
use rachunek_service::services::Password;
use rust_decimal_macros::dec;

use common::{draft, spawn_app, TestApp};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Three invoices in August, one in September, one extra August invoice
/// soft-deleted.
async fn seeded_app() -> TestApp {
    let app = spawn_app().await;
    app.manager
        .create_invoice_dated(&draft("Nowak", "2025-08-04", "100.00"), date(2025, 8, 4))
        .await
        .unwrap();
    app.manager
        .create_invoice_dated(&draft("Nowak", "2025-08-12", "200.00"), date(2025, 8, 12))
        .await
        .unwrap();
    app.manager
        .create_invoice_dated(
            &draft("Wiśniewska", "2025-08-18", "300.00"),
            date(2025, 8, 18),
        )
        .await
        .unwrap();
    app.manager
        .create_invoice_dated(&draft("Nowak", "2025-09-02", "50.00"), date(2025, 9, 2))
        .await
        .unwrap();

    let doomed = app
        .manager
        .create_invoice_dated(
            &draft("Zielińska", "2025-08-25", "999.00"),
            date(2025, 8, 25),
        )
        .await
        .unwrap()
        .invoice;
    let token = app
        .manager
        .authenticate(&Password::new("admin123".to_string()))
        .await
        .unwrap();
    app.manager
        .soft_delete(&token, doomed.id, "anulowany")
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn monthly_report_excludes_deleted_invoices() {
    let app = seeded_app().await;
    let report = app.manager.monthly_report(2025).await.unwrap();
    assert_eq!(report.len(), 2);

    let august = &report[0];
    assert_eq!(august.month, 8);
    assert_eq!(august.month_name, "Sierpień");
    assert_eq!(august.invoice_count, 3);
    assert_eq!(august.total, dec!(600.00));
    assert_eq!(august.mean, dec!(200.00));
    assert_eq!(august.min, dec!(100.00));
    assert_eq!(august.max, dec!(300.00));

    let september = &report[1];
    assert_eq!(september.month, 9);
    assert_eq!(september.total, dec!(50.00));
}

#[tokio::test]
async fn yearly_report_aggregates_across_months() {
    let app = seeded_app().await;
    let report = app.manager.yearly_report().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].year, 2025);
    assert_eq!(report[0].invoice_count, 4);
    assert_eq!(report[0].total, dec!(650.00));
    assert_eq!(report[0].mean, dec!(162.50));
}

#[tokio::test]
async fn top_buyers_rank_by_total_then_recency() {
    let app = seeded_app().await;
    let buyers = app.manager.top_buyers(10).await.unwrap();
    assert_eq!(buyers.len(), 2);

    // Nowak: 100 + 200 + 50 = 350; Wiśniewska: 300.
    assert_eq!(buyers[0].buyer_name, "Anna Nowak");
    assert_eq!(buyers[0].invoice_count, 3);
    assert_eq!(buyers[0].total, dec!(350.00));
    assert_eq!(buyers[0].last_issue_date, date(2025, 9, 2));
    assert_eq!(buyers[1].buyer_name, "Anna Wiśniewska");
    assert_eq!(buyers[1].total, dec!(300.00));
}

#[tokio::test]
async fn tied_buyers_break_by_most_recent_issue_date() {
    let app = spawn_app().await;
    app.manager
        .create_invoice_dated(&draft("Nowak", "2025-08-04", "100.00"), date(2025, 8, 4))
        .await
        .unwrap();
    app.manager
        .create_invoice_dated(
            &draft("Wiśniewska", "2025-08-18", "100.00"),
            date(2025, 8, 18),
        )
        .await
        .unwrap();

    let buyers = app.manager.top_buyers(10).await.unwrap();
    assert_eq!(buyers[0].buyer_name, "Anna Wiśniewska");
    assert_eq!(buyers[1].buyer_name, "Anna Nowak");
}

#[tokio::test]
async fn overall_stats_cover_the_active_set() {
    let app = seeded_app().await;
    let stats = app.manager.overall_stats().await.unwrap();
    assert_eq!(stats.invoice_count, 4);
    assert_eq!(stats.total, dec!(650.00));
    assert_eq!(stats.mean, dec!(162.50));
    assert_eq!(stats.distinct_buyers, 2);
    assert_eq!(stats.first_issue_date, Some(date(2025, 8, 4)));
    assert_eq!(stats.last_issue_date, Some(date(2025, 9, 2)));
}

#[tokio::test]
async fn overall_stats_on_an_empty_database() {
    let app = spawn_app().await;
    let stats = app.manager.overall_stats().await.unwrap();
    assert_eq!(stats.invoice_count, 0);
    assert_eq!(stats.total, dec!(0.00));
    assert!(stats.first_issue_date.is_none());
    assert!(stats.last_issue_date.is_none());
}

#[tokio::test]
async fn search_matches_number_and_buyer_name() {
    let app = seeded_app().await;

    let by_number = app.manager.search("2/08").await.unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].number, "2/08/2025");

    let by_buyer = app.manager.search("Wiśniewska").await.unwrap();
    assert_eq!(by_buyer.len(), 1);
    assert_eq!(by_buyer[0].buyer_name, "Anna Wiśniewska");

    let by_date = app.manager.search("2025-09").await.unwrap();
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].number, "1/09/2025");

    // The soft-deleted invoice never surfaces.
    assert!(app.manager.search("Zielińska").await.unwrap().is_empty());
}

#[tokio::test]
async fn month_listing_is_chronological() {
    let app = seeded_app().await;
    let invoices = app.manager.invoices_for_month(8, 2025).await.unwrap();
    assert_eq!(invoices.len(), 3);
    assert_eq!(invoices[0].issue_date, date(2025, 8, 4));
    assert_eq!(invoices[2].issue_date, date(2025, 8, 18));
}

#[tokio::test]
async fn csv_export_is_complete_and_repeatable() {
    let app = seeded_app().await;
    let path = app.dir.path().join("eksport.csv");

    let exported = app.manager.export_csv(&path).await.unwrap();
    assert_eq!(exported, 4);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines[0],
        "Numer rachunku,Data wystawienia,Nabywca,Kwota (PLN)"
    );
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "1/08/2025,2025-08-04,Anna Nowak,100.00");
    assert!(!contents.contains("Zielińska"));

    // Re-export replaces the file with identical content.
    app.manager.export_csv(&path).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
}
