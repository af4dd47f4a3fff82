//! Read-only reporting over sales and violations, plus a CSV shaper.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{scope_to_station, Ctx};

/// Axis a sales report is grouped along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupBy {
    Station,
    Fuel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesReportRow {
    /// Station id or fuel type, depending on the grouping.
    pub group: String,
    pub litres: f64,
    pub amount: f64,
    pub transactions: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViolationsReportRow {
    pub station_id: String,
    pub open: u64,
    pub resolved: u64,
    pub dismissed: u64,
    pub fines_total: f64,
}

pub struct ReportsService {
    ctx: Arc<Ctx>,
}

impl ReportsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn sales_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        group_by: GroupBy,
    ) -> ServiceResponse<Vec<SalesReportRow>> {
        if from > to {
            return ServiceResponse::failure(&ServiceError::validation("from must not be after to"));
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("reports.sales", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let actor = actor.clone();
                async move {
                    let query = scope_to_station(
                        TableQuery::new(tables::SALES)
                            .gte("sold_on", from.to_string())
                            .lte("sold_on", to.to_string()),
                        &actor,
                    );
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let key_field = match group_by {
                        GroupBy::Station => "station_id",
                        GroupBy::Fuel => "fuel_type",
                    };
                    let mut groups: BTreeMap<String, SalesReportRow> = BTreeMap::new();
                    for row in &result.rows {
                        let key = match row.get(key_field).and_then(Value::as_str) {
                            Some(key) => key.to_owned(),
                            None => continue,
                        };
                        let entry = groups.entry(key.clone()).or_insert_with(|| SalesReportRow {
                            group: key,
                            litres: 0.0,
                            amount: 0.0,
                            transactions: 0,
                        });
                        entry.litres += row.get("litres").and_then(Value::as_f64).unwrap_or(0.0);
                        entry.amount += row.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
                        entry.transactions += 1;
                    }
                    Ok(groups.into_values().collect())
                }
            })
            .await
    }

    pub async fn violations_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResponse<Vec<ViolationsReportRow>> {
        if from > to {
            return ServiceResponse::failure(&ServiceError::validation("from must not be after to"));
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("reports.violations", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let actor = actor.clone();
                async move {
                    let query = scope_to_station(
                        TableQuery::new(tables::VIOLATIONS)
                            .gte("created_at", from.to_string())
                            .lt("created_at", to.succ_opt().unwrap_or(to).to_string()),
                        &actor,
                    );
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let mut groups: BTreeMap<String, ViolationsReportRow> = BTreeMap::new();
                    for row in &result.rows {
                        let station = match row.get("station_id").and_then(Value::as_str) {
                            Some(station) => station.to_owned(),
                            None => continue,
                        };
                        let entry = groups.entry(station.clone()).or_insert_with(|| ViolationsReportRow {
                            station_id: station,
                            open: 0,
                            resolved: 0,
                            dismissed: 0,
                            fines_total: 0.0,
                        });
                        match row.get("status").and_then(Value::as_str) {
                            Some("resolved") => entry.resolved += 1,
                            Some("dismissed") => entry.dismissed += 1,
                            _ => entry.open += 1,
                        }
                        entry.fines_total += row.get("fine_amount").and_then(Value::as_f64).unwrap_or(0.0);
                    }
                    Ok(groups.into_values().collect())
                }
            })
            .await
    }

    /// Render serializable rows as CSV. Pure shaping, no I/O; quoting covers
    /// commas, quotes and newlines.
    pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, ServiceError> {
        let mut out = String::new();
        for (i, row) in rows.iter().enumerate() {
            let value = serde_json::to_value(row)
                .map_err(|e| ServiceError::unexpected(format!("csv shaping failed: {e}")))?;
            let object = value
                .as_object()
                .ok_or_else(|| ServiceError::unexpected("csv rows must serialize to objects"))?;
            if i == 0 {
                let header: Vec<_> = object.keys().map(|k| csv_field(k)).collect();
                out.push_str(&header.join(","));
                out.push('\n');
            }
            let fields: Vec<_> = object.values().map(csv_value).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        Ok(out)
    }
}

fn csv_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => csv_field(s),
        other => other.to_string(),
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_awkward_fields() {
        let rows = vec![
            SalesReportRow { group: "petrol".into(), litres: 10.5, amount: 250.0, transactions: 3 },
            SalesReportRow { group: "a,b \"c\"".into(), litres: 1.0, amount: 24.0, transactions: 1 },
        ];
        let csv = ReportsService::to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "group,litres,amount,transactions");
        assert_eq!(lines.next().unwrap(), "petrol,10.5,250.0,3");
        assert_eq!(lines.next().unwrap(), "\"a,b \"\"c\"\"\",1.0,24.0,1");
    }

    #[test]
    fn csv_of_nothing_is_empty() {
        let rows: Vec<SalesReportRow> = vec![];
        assert_eq!(ReportsService::to_csv(&rows).unwrap(), "");
    }

    #[test]
    fn csv_rejects_non_object_rows() {
        let err = ReportsService::to_csv(&[1u32, 2]).unwrap_err();
        assert_eq!(err.code(), "UNEXPECTED_ERROR");
    }
}
