//! Shared test harness: a fully assembled [`InvoiceManager`] over a
//! throwaway file-backed SQLite database.

use rachunek_core::config::Config;
use rachunek_service::models::{InvoiceDraft, Party};
use rachunek_service::services::InvoiceManager;
use tempfile::TempDir;

pub struct TestApp {
    pub manager: InvoiceManager,
    // Held so the database and documents outlive the test body.
    #[allow(dead_code)]
    pub dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Config::default()).await
}

pub async fn spawn_app_with(mut config: Config) -> TestApp {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("rachunki.db");
    config.database_url = format!("sqlite://{}", db_path.display());

    let manager = InvoiceManager::new(&config, dir.path().join("dokumenty"))
        .await
        .expect("failed to assemble the invoice manager");
    TestApp { manager, dir }
}

pub fn party(first_name: &str, last_name: &str) -> Party {
    Party {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        street: "Polna".to_string(),
        house_number: "12a/3".to_string(),
        postal_code: "00-950".to_string(),
        city: "Warszawa".to_string(),
    }
}

/// A valid draft for the given buyer, service date and unit price.
pub fn draft(buyer_last_name: &str, service_date: &str, unit_price: &str) -> InvoiceDraft {
    InvoiceDraft {
        seller: Some(party("Jan", "Kowalski")),
        buyer: Some(party("Anna", buyer_last_name)),
        service_date: Some(service_date.to_string()),
        service_description: Some("Korepetycje z matematyki".to_string()),
        unit_price: Some(unit_price.to_string()),
    }
}
