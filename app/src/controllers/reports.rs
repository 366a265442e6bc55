//! Payroll reports for one month

use campus::database::{Model, Trashed};
use campus::export::{format_minor_units, Csv};
use campus::{FrameworkError, HttpResponse, Request, Response, DB};
use chrono::{Datelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::support::authorize;
use crate::models::{payrolls, staff};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize)]
struct Period {
    month: Option<i32>,
    year: Option<i32>,
}

impl Period {
    /// Requested month, defaulting to the current one
    fn resolve(req: &Request) -> Result<(i32, i32), FrameworkError> {
        let period: Period = req.query()?;
        let today = Utc::now().date_naive();
        let month = period.month.unwrap_or(today.month() as i32);
        let year = period.year.unwrap_or(today.year());
        if !(1..=12).contains(&month) {
            return Err(FrameworkError::validation("month", "The month must be between 1 and 12."));
        }
        if !(2000..=2100).contains(&year) {
            return Err(FrameworkError::validation("year", "The year must be between 2000 and 2100."));
        }
        Ok((month, year))
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct Totals {
    count: usize,
    paid_count: usize,
    pending_count: usize,
    basic_salary: i64,
    allowances: i64,
    deductions: i64,
    net_salary: i64,
    paid: i64,
    outstanding: i64,
}

impl Totals {
    fn add(&mut self, payroll: &payrolls::Model) {
        self.count += 1;
        self.basic_salary += payroll.basic_salary;
        self.allowances += payroll.allowances;
        self.deductions += payroll.deductions;
        self.net_salary += payroll.net_salary;
        if payroll.status == payrolls::STATUS_PAID {
            self.paid_count += 1;
            self.paid += payroll.net_salary;
        } else {
            self.pending_count += 1;
            self.outstanding += payroll.net_salary;
        }
    }
}

async fn period_payrolls<C: ConnectionTrait>(
    db: &C,
    school_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<(payrolls::Model, Option<staff::Model>)>, FrameworkError> {
    Ok(payrolls::Entity::query(school_id, Trashed::Without)
        .filter(payrolls::Column::Month.eq(month))
        .filter(payrolls::Column::Year.eq(year))
        .find_also_related(staff::Entity)
        .order_by_asc(staff::Column::Name)
        .order_by_asc(payrolls::Column::Id)
        .all(db)
        .await?)
}

/// Totals plus one row per payroll of the month
pub async fn payroll(req: Request) -> Response {
    let user = authorize(&req, Resource::Reports, Ability::View)?;
    let (month, year) = Period::resolve(&req)?;
    let db = DB::connection()?;

    let rows = period_payrolls(db.inner(), user.school_id, month, year).await?;
    let mut totals = Totals::default();
    let rows: Vec<_> = rows
        .iter()
        .map(|(payroll, member)| {
            totals.add(payroll);
            json!({
                "id": payroll.id,
                "staff_id": payroll.staff_id,
                "staff_name": member.as_ref().map(|m| m.name.as_str()),
                "employee_no": member.as_ref().map(|m| m.employee_no.as_str()),
                "basic_salary": payroll.basic_salary,
                "allowances": payroll.allowances,
                "deductions": payroll.deductions,
                "net_salary": payroll.net_salary,
                "status": payroll.status,
                "paid_at": payroll.paid_at,
            })
        })
        .collect();

    HttpResponse::json(json!({
        "month": month,
        "year": year,
        "totals": totals,
        "rows": rows,
    }))
    .ok()
}

/// The same month as a CSV download
pub async fn export_payroll(req: Request) -> Response {
    let user = authorize(&req, Resource::Reports, Ability::Manage)?;
    let (month, year) = Period::resolve(&req)?;
    let db = DB::connection()?;

    let rows = period_payrolls(db.inner(), user.school_id, month, year).await?;
    let mut csv = Csv::new(&[
        "Employee No",
        "Staff",
        "Month",
        "Year",
        "Basic Salary",
        "Allowances",
        "Deductions",
        "Net Salary",
        "Status",
        "Paid At",
        "Payment Reference",
    ]);
    for (payroll, member) in &rows {
        csv.row([
            member.as_ref().map(|m| m.employee_no.clone()).unwrap_or_default(),
            member.as_ref().map(|m| m.name.clone()).unwrap_or_default(),
            payroll.month.to_string(),
            payroll.year.to_string(),
            format_minor_units(payroll.basic_salary),
            format_minor_units(payroll.allowances),
            format_minor_units(payroll.deductions),
            format_minor_units(payroll.net_salary),
            payroll.status.clone(),
            payroll.paid_at.map(|at| at.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default(),
            payroll.payment_reference.clone().unwrap_or_default(),
        ]);
    }

    tracing::info!(user_id = user.id, month, year, rows = csv.len(), "payroll report exported");
    Ok(csv.into_response(&format!("payroll-{}-{:02}.csv", year, month)))
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn payroll(app: &TestApp, token: &str, name: &str, month: i32, allowances: i64) -> i64 {
        let member = app.staff(app.school.id, name, None).await;
        let response = app
            .post(
                token,
                "/payrolls",
                json!({ "staff_id": member.id, "month": month, "year": 2025, "allowances": allowances, "deductions": 0 }),
            )
            .await;
        response.json_body()["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn summarises_one_month() {
        let app = TestApp::new().await;
        let token = app.token(Role::Accountant).await;
        let paid = payroll(&app, &token, "Zoe", 3, 10_000).await;
        payroll(&app, &token, "Adam", 3, 0).await;
        payroll(&app, &token, "Other Month", 4, 0).await;
        app.post(&token, &format!("/payrolls/{}/paid", paid), json!({})).await;

        let body = app.get(Some(&token), "/reports/payroll?month=3&year=2025").await.json_body();
        let totals = &body["totals"];
        assert_eq!(totals["count"], json!(2));
        assert_eq!(totals["paid_count"], json!(1));
        assert_eq!(totals["net_salary"], json!(510_000));
        assert_eq!(totals["paid"], json!(260_000));
        assert_eq!(totals["outstanding"], json!(250_000));
        assert_eq!(body["rows"][0]["staff_name"], json!("Adam"));
    }

    #[tokio::test]
    async fn exports_csv_for_managers_only() {
        let app = TestApp::new().await;
        let token = app.token(Role::Accountant).await;
        payroll(&app, &token, "Grace, Hopper", 3, 1_050).await;

        let response = app.get(Some(&token), "/reports/payroll/export?month=3&year=2025").await;
        expect!(response.status_code()).to_equal(200);
        assert_eq!(response.header_value("Content-Type"), Some("text/csv; charset=utf-8"));
        assert_eq!(
            response.header_value("Content-Disposition"),
            Some("attachment; filename=\"payroll-2025-03.csv\"")
        );
        let lines: Vec<&str> = response.body_str().lines().collect();
        expect!(lines.len()).to_equal(2);
        expect!(lines[1].contains("\"Grace, Hopper\",3,2025,2500.00,10.50,0.00,2510.50,pending")).to_be_true();

        let teacher = app.token(Role::Teacher).await;
        expect!(app.get(Some(&teacher), "/reports/payroll/export").await).to_have_status(403);
    }

    #[tokio::test]
    async fn rejects_out_of_range_months() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;

        expect!(app.get(Some(&token), "/reports/payroll?month=13").await).to_have_validation_error("month");
    }
}
