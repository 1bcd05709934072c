mod common;

use anyhow::Result;
use common::{endpoint, session, FakeCentral};
use reqwest::Method;
use std::collections::HashSet;
use std::io::Write;
use tamper_toggle::domain::model::RosterRow;
use tamper_toggle::domain::ports::RosterSource;
use tamper_toggle::{CentralApi, CentralError, CsvRoster, NoPacer, SweepOptions, TamperSweep};
use tempfile::NamedTempFile;

struct StaticRoster(Vec<RosterRow>);

impl RosterSource for StaticRoster {
    fn rows(&self) -> tamper_toggle::Result<Vec<RosterRow>> {
        Ok(self.0.clone())
    }
}

fn row(row: usize, group: &str, name: &str) -> RosterRow {
    RosterRow {
        row,
        group: group.to_string(),
        name: name.to_string(),
    }
}

fn options(groups: &[&str]) -> SweepOptions {
    SweepOptions {
        groups: groups.iter().map(|g| g.to_string()).collect::<HashSet<_>>(),
        page_size: 500,
        enable: false,
        dry_run: false,
    }
}

fn fleet() -> FakeCentral {
    FakeCentral::new(
        vec![
            endpoint("e1", "LAPTOP-ALICE", "Alice Smith", "CORP\\asmith"),
            endpoint("e2", "DESKTOP-ALICE", "Smith, A.", "CORP\\Alice Smith"),
            endpoint("e3", "LAPTOP-BOB", "Bob Brown", "CORP\\bbrown"),
            endpoint("e4", "LAPTOP-CAROL", "Carol White", "CORP\\cwhite"),
        ],
        vec![],
    )
}

#[tokio::test]
async fn test_sweep_disables_matching_endpoints() -> Result<()> {
    let api = CentralApi::new(fleet(), NoPacer);
    let roster = StaticRoster(vec![
        row(2, "group A", "Alice Smith"),
        row(3, "group C", "Bob Brown"),
        row(4, "group B", "Carol"),
    ]);

    let report = TamperSweep::new(&api, roster, options(&["group A", "group B"]))
        .run(&session())
        .await?;

    assert_eq!(report.rows_matched, 2);
    assert_eq!(report.endpoints_matched, 3);
    assert_eq!(report.endpoints_updated, 3);
    assert!(report.is_clean());
    assert!(report.ensure_clean().is_ok());

    let fake = api.transport();
    assert_eq!(fake.tamper_enabled("e1"), Some(false));
    assert_eq!(fake.tamper_enabled("e2"), Some(false));
    assert_eq!(fake.tamper_enabled("e3"), Some(true));
    assert_eq!(fake.tamper_enabled("e4"), Some(false));

    // 端點清單只抓一次，並帶上 pageSize
    let listings = fake.requests_to(Method::GET, "/endpoint/v1/endpoints");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].query_value("pageSize"), Some("500"));
    Ok(())
}

#[tokio::test]
async fn test_sweep_continues_after_endpoint_failure() -> Result<()> {
    let api = CentralApi::new(fleet().failing_on("e1"), NoPacer);
    let roster = StaticRoster(vec![row(2, "group A", "Alice Smith"), row(3, "group A", "Bob")]);

    let report = TamperSweep::new(&api, roster, options(&["group A"]))
        .run(&session())
        .await?;

    assert_eq!(report.endpoints_matched, 3);
    assert_eq!(report.endpoints_updated, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].endpoint_id, "e1");
    assert_eq!(report.failures[0].hostname, "LAPTOP-ALICE");
    assert!(report.failures[0].message.contains("get"));

    // 有失敗的端點時整體結果為錯誤，結束碼非 0
    let err = report.ensure_clean().unwrap_err();
    assert!(matches!(
        err,
        CentralError::SweepIncomplete {
            failed: 1,
            matched: 3
        }
    ));
    assert_eq!(err.exit_code(), 2);

    let fake = api.transport();
    assert_eq!(fake.tamper_enabled("e2"), Some(false));
    assert_eq!(fake.tamper_enabled("e3"), Some(false));
    Ok(())
}

#[tokio::test]
async fn test_dry_run_reads_but_does_not_change() -> Result<()> {
    let api = CentralApi::new(fleet(), NoPacer);
    let roster = StaticRoster(vec![row(2, "group A", "Bob Brown")]);
    let mut options = options(&["group A"]);
    options.dry_run = true;

    let report = TamperSweep::new(&api, roster, options).run(&session()).await?;

    assert_eq!(report.endpoints_matched, 1);
    assert_eq!(report.endpoints_updated, 0);

    let fake = api.transport();
    assert_eq!(fake.tamper_enabled("e3"), Some(true));
    assert_eq!(
        fake.requests_to(Method::GET, "/endpoint/v1/endpoints/e3/tamper-protection")
            .len(),
        1
    );
    assert!(fake
        .requests_to(Method::POST, "/endpoint/v1/endpoints/e3/tamper-protection")
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sweep_can_enable() -> Result<()> {
    let api = CentralApi::new(fleet(), NoPacer);
    api.set_tamper_status(&session(), "e4", false).await?;

    let mut options = options(&["group A"]);
    options.enable = true;
    let roster = StaticRoster(vec![row(2, "group A", "cwhite")]);

    let report = TamperSweep::new(&api, roster, options).run(&session()).await?;

    assert_eq!(report.endpoints_updated, 1);
    assert_eq!(api.transport().tamper_enabled("e4"), Some(true));
    Ok(())
}

#[tokio::test]
async fn test_sweep_from_csv_roster() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "id,name,department,group")?;
    writeln!(file, "1,Alice Smith,IT,group A")?;
    writeln!(file, "2,Bob Brown,Sales,group C")?;
    writeln!(file, "3,Carol White,HR,group B")?;

    let roster = CsvRoster::new(file.path(), "D", "B")?;
    let api = CentralApi::new(fleet(), NoPacer);

    let report = TamperSweep::new(&api, roster, options(&["group A", "group B"]))
        .run(&session())
        .await?;

    assert_eq!(report.rows_matched, 2);
    assert_eq!(report.endpoints_updated, 3);
    assert_eq!(api.transport().tamper_enabled("e3"), Some(true));
    Ok(())
}

#[tokio::test]
async fn test_missing_roster_aborts_before_any_request() {
    let roster = CsvRoster::new("/nonexistent/roster.csv", "D", "B").unwrap();
    let api = CentralApi::new(fleet(), NoPacer);

    let result = TamperSweep::new(&api, roster, options(&["group A"]))
        .run(&session())
        .await;

    assert!(result.is_err());
    assert!(api.transport().requests().is_empty());
}
