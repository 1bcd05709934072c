use crate::core::queries::CentralApi;
use crate::domain::model::{EndpointRecord, Query, RosterRow, Session, SweepFailure, SweepReport};
use crate::domain::ports::{Pacer, RosterSource, Transport};
use crate::utils::error::{Result, TamperOperationError};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub groups: HashSet<String>,
    pub page_size: u32,
    /// 目標狀態
    pub enable: bool,
    pub dry_run: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            groups: HashSet::new(),
            page_size: 500,
            enable: false,
            dry_run: false,
        }
    }
}

/// 名冊姓名比對端點：先比 associatedPerson.name，再比 viaLogin，皆為子字串比對
pub fn endpoints_for_name<'a>(endpoints: &'a [EndpointRecord], name: &str) -> Vec<&'a EndpointRecord> {
    endpoints
        .iter()
        .filter(|endpoint| {
            endpoint.person_name().is_some_and(|n| n.contains(name))
                || endpoint.via_login().is_some_and(|l| l.contains(name))
        })
        .collect()
}

/// 依名冊切換端點的 tamper protection
pub struct TamperSweep<'a, T: Transport, P: Pacer, R: RosterSource> {
    api: &'a CentralApi<T, P>,
    roster: R,
    options: SweepOptions,
}

impl<'a, T: Transport, P: Pacer, R: RosterSource> TamperSweep<'a, T, P, R> {
    pub fn new(api: &'a CentralApi<T, P>, roster: R, options: SweepOptions) -> Self {
        Self {
            api,
            roster,
            options,
        }
    }

    /// 名冊讀取或端點清單失敗時整體失敗；單一端點的錯誤記錄在報告中並繼續
    pub async fn run(&self, session: &Session) -> Result<SweepReport> {
        let rows = self.roster.rows()?;
        tracing::info!("📄 Loaded {} roster rows", rows.len());

        let endpoints = self
            .api
            .list_endpoints(session, &Query::new().with("pageSize", self.options.page_size))
            .await?;
        tracing::info!("💻 Fetched {} endpoints", endpoints.len());

        let mut report = SweepReport::default();
        for row in rows.iter().filter(|row| self.options.groups.contains(&row.group)) {
            self.process_row(session, row, &endpoints, &mut report).await;
        }

        tracing::info!(
            "✅ Sweep finished: {} rows, {} endpoints matched, {} updated, {} failed",
            report.rows_matched,
            report.endpoints_matched,
            report.endpoints_updated,
            report.failures.len()
        );
        Ok(report)
    }

    async fn process_row(
        &self,
        session: &Session,
        row: &RosterRow,
        endpoints: &[EndpointRecord],
        report: &mut SweepReport,
    ) {
        report.rows_matched += 1;
        if row.name.is_empty() {
            tracing::warn!("⚠️ Row {} ({}) has no name, skipping", row.row, row.group);
            return;
        }

        let matched = endpoints_for_name(endpoints, &row.name);
        tracing::info!("👤 {} (row {}): {} endpoint(s)", row.name, row.row, matched.len());
        report.endpoints_matched += matched.len();

        for endpoint in matched {
            match self.toggle(session, endpoint).await {
                Ok(true) => report.endpoints_updated += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("❌ {}: {}", endpoint.hostname_or_id(), e);
                    report.failures.push(SweepFailure {
                        endpoint_id: endpoint.id.clone(),
                        hostname: endpoint.hostname_or_id().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// 回傳是否實際送出變更
    async fn toggle(
        &self,
        session: &Session,
        endpoint: &EndpointRecord,
    ) -> std::result::Result<bool, TamperOperationError> {
        let hostname = endpoint.hostname_or_id();
        let status = self.api.get_tamper_status(session, &endpoint.id).await?;
        tracing::info!("   {}: tamper protection enabled = {}", hostname, status.enabled);
        self.api.pacer().pace().await;

        if self.options.dry_run {
            tracing::info!(
                "   {}: dry run, would set tamper protection to {}",
                hostname,
                self.options.enable
            );
            return Ok(false);
        }

        self.api
            .set_tamper_status(session, &endpoint.id, self.options.enable)
            .await?;
        tracing::info!(
            "   {}: tamper protection has been {}",
            hostname,
            if self.options.enable { "enabled" } else { "disabled" }
        );
        self.api.pacer().pace().await;
        Ok(true)
    }
}
