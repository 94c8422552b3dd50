use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::finance::FinanceReport;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Free text from users. A leading formula character is escaped so a
/// spreadsheet shows the cell as text instead of evaluating it.
fn text(s: &str) -> String {
    match s.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{s}"),
        _ => s.to_string(),
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S]) {
    let line = cells
        .iter()
        .map(|c| csv_quote(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn money(v: f64) -> String {
    format!("{v:.2}")
}

pub fn finance_csv(report: &FinanceReport) -> String {
    let mut out = String::new();
    push_row(&mut out, &["section", "group", "amount", "percentage"]);
    for g in &report.income.groups {
        push_row(
            &mut out,
            &["income".to_string(), text(&g.label), money(g.amount), money(g.percentage)],
        );
    }
    for g in &report.expense.groups {
        push_row(
            &mut out,
            &["expense".to_string(), text(&g.label), money(g.amount), money(g.percentage)],
        );
    }
    push_row(&mut out, &["total".to_string(), "income".into(), money(report.income.total), "100.00".into()]);
    push_row(&mut out, &["total".to_string(), "expense".into(), money(report.expense.total), "100.00".into()]);
    push_row(&mut out, &["total".to_string(), "net_profit".into(), money(report.net_profit), money(report.margin_percentage)]);

    out.push_str("\r\n");
    push_row(&mut out, &["month", "income", "expense", "net"]);
    for m in &report.monthly {
        push_row(
            &mut out,
            &[m.month.clone(), money(m.income), money(m.expense), money(m.net)],
        );
    }
    out
}

/// One roster line of the member export.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct MemberReportRow {
    pub member_id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    #[schema(value_type = String, format = "date")]
    pub joined_at: NaiveDate,
    pub active_enrolments: i64,
    pub total_enrolments: i64,
    pub attended: i64,
}

pub fn members_csv(rows: &[MemberReportRow]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &[
            "member_id",
            "name",
            "email",
            "phone",
            "status",
            "joined_at",
            "active_enrolments",
            "total_enrolments",
            "attended",
        ],
    );
    for r in rows {
        push_row(
            &mut out,
            &[
                r.member_id.to_string(),
                text(&r.name),
                text(&r.email),
                text(r.phone.as_deref().unwrap_or_default()),
                r.status.clone(),
                r.joined_at.format("%Y-%m-%d").to_string(),
                r.active_enrolments.to_string(),
                r.total_enrolments.to_string(),
                r.attended.to_string(),
            ],
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::finance::{DateWindow, Entry, build_report};

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quote("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn formula_cells_are_escaped() {
        assert_eq!(text("=HYPERLINK(\"http://x\")"), "'=HYPERLINK(\"http://x\")");
        assert_eq!(text("+62 812"), "'+62 812");
        assert_eq!(text("-1"), "'-1");
        assert_eq!(text("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(text("Siti"), "Siti");
        assert_eq!(text(""), "");
    }

    #[test]
    fn finance_export_lists_groups_then_months() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
        let income = vec![Entry { key: "1".into(), label: "Kids, Beginner".into(), amount: 1000.0, date: day }];
        let window = DateWindow::new(day, day).unwrap();
        let csv = finance_csv(&build_report(&income, &[], window).unwrap());
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "section,group,amount,percentage");
        assert_eq!(lines[1], "income,\"Kids, Beginner\",1000.00,100.00");
        assert!(lines.contains(&"total,net_profit,1000.00,100.00"));
        assert!(lines.contains(&"2026-10,1000.00,0.00,1000.00"));
    }

    #[test]
    fn member_export_has_one_line_per_member() {
        let rows = vec![MemberReportRow {
            member_id: 3,
            name: "Siti".into(),
            email: "siti@example.com".into(),
            phone: None,
            status: "active".into(),
            joined_at: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            active_enrolments: 1,
            total_enrolments: 2,
            attended: 14,
        }];
        let csv = members_csv(&rows);
        let lines: Vec<&str> = csv.trim_end().split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "3,Siti,siti@example.com,,active,2026-01-05,1,2,14");
    }

    #[test]
    fn member_names_cannot_inject_formulas() {
        let rows = vec![MemberReportRow {
            member_id: 4,
            name: "=cmd|' /C calc'!A0".into(),
            email: "eve@example.com".into(),
            phone: Some("+6281234".into()),
            status: "active".into(),
            joined_at: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            active_enrolments: 0,
            total_enrolments: 0,
            attended: 0,
        }];
        let csv = members_csv(&rows);
        let line = csv.trim_end().split("\r\n").nth(1).unwrap();
        assert_eq!(line, "4,'=cmd|' /C calc'!A0,eve@example.com,'+6281234,active,2026-02-01,0,0,0");
    }

    #[test]
    fn negative_amounts_stay_numeric() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
        let expense = vec![Entry { key: "pool_rent".into(), label: "Pool rent".into(), amount: 400.0, date: day }];
        let window = DateWindow::new(day, day).unwrap();
        let csv = finance_csv(&build_report(&[], &expense, window).unwrap());
        assert!(csv.contains("total,net_profit,-400.00,0.00"));
    }
}
