//! Grouped sums, shares and period-over-period growth for the finance report.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateWindow {
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Inclusive length in days.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The window of equal length that ends the day before this one starts,
    /// `None` when it would fall before the first representable date.
    pub fn previous(&self) -> Option<Self> {
        let end = self.start.pred_opt()?;
        let start = end.checked_sub_days(Days::new(self.days().unsigned_abs() - 1))?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One fetched row reduced to what the aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupShare {
    pub key: String,
    pub label: String,
    pub amount: f64,
    /// Share of the section total, rounded to two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Section {
    pub total: f64,
    pub previous_total: f64,
    pub growth_percentage: f64,
    pub groups: Vec<GroupShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthRow {
    #[schema(example = "2026-10")]
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinanceReport {
    pub window: DateWindow,
    pub previous_window: DateWindow,
    pub income: Section,
    pub expense: Section,
    pub net_profit: f64,
    pub previous_net_profit: f64,
    pub profit_growth_percentage: f64,
    pub margin_percentage: f64,
    pub monthly: Vec<MonthRow>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `(current - previous) / previous * 100`, and 0 when there is nothing
/// to compare against.
pub fn growth_percentage(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round2((current - previous) / previous * 100.0)
}

pub fn share_percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        round2(part / total * 100.0)
    }
}

fn sum_in(entries: &[Entry], window: &DateWindow) -> f64 {
    entries
        .iter()
        .filter(|e| window.contains(e.date))
        .map(|e| e.amount)
        .sum()
}

/// Groups the entries inside `window` by key. The section total is summed
/// over the groups in the order they are listed, so the two always agree.
pub fn summarize(entries: &[Entry], window: &DateWindow, previous: &DateWindow) -> Section {
    let mut grouped: BTreeMap<&str, (&str, f64)> = BTreeMap::new();
    for e in entries.iter().filter(|e| window.contains(e.date)) {
        let slot = grouped.entry(e.key.as_str()).or_insert((e.label.as_str(), 0.0));
        slot.1 += e.amount;
    }

    let mut groups: Vec<GroupShare> = grouped
        .into_iter()
        .map(|(key, (label, amount))| GroupShare {
            key: key.to_string(),
            label: label.to_string(),
            amount,
            percentage: 0.0,
        })
        .collect();
    groups.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.key.cmp(&b.key)));

    let total: f64 = groups.iter().map(|g| g.amount).sum();
    for group in &mut groups {
        group.percentage = share_percentage(group.amount, total);
    }
    let previous_total = sum_in(entries, previous);

    Section {
        total,
        previous_total,
        growth_percentage: growth_percentage(total, previous_total),
        groups,
    }
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn monthly(income: &[Entry], expense: &[Entry], window: &DateWindow) -> Vec<MonthRow> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    let mut cursor = NaiveDate::from_ymd_opt(window.start.year(), window.start.month(), 1);
    while let Some(first) = cursor {
        if first > window.end {
            break;
        }
        months.insert(month_key(first), (0.0, 0.0));
        cursor = first.checked_add_months(chrono::Months::new(1));
    }

    for e in income.iter().filter(|e| window.contains(e.date)) {
        months.entry(month_key(e.date)).or_default().0 += e.amount;
    }
    for e in expense.iter().filter(|e| window.contains(e.date)) {
        months.entry(month_key(e.date)).or_default().1 += e.amount;
    }

    months
        .into_iter()
        .map(|(month, (income, expense))| MonthRow {
            month,
            income,
            expense,
            net: income - expense,
        })
        .collect()
}

/// `income` and `expense` must cover both `window` and its previous window.
/// `None` when the window has no previous window to compare against.
pub fn build_report(income: &[Entry], expense: &[Entry], window: DateWindow) -> Option<FinanceReport> {
    let previous_window = window.previous()?;
    let income_section = summarize(income, &window, &previous_window);
    let expense_section = summarize(expense, &window, &previous_window);

    let net_profit = income_section.total - expense_section.total;
    let previous_net_profit = income_section.previous_total - expense_section.previous_total;

    Some(FinanceReport {
        window,
        previous_window,
        net_profit,
        previous_net_profit,
        profit_growth_percentage: growth_percentage(net_profit, previous_net_profit),
        margin_percentage: share_percentage(net_profit, income_section.total),
        monthly: monthly(income, expense, &window),
        income: income_section,
        expense: expense_section,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn entry(key: &str, amount: f64, date: NaiveDate) -> Entry {
        Entry {
            key: key.to_string(),
            label: key.to_uppercase(),
            amount,
            date,
        }
    }

    fn october() -> DateWindow {
        DateWindow::new(d(10, 1), d(10, 31)).unwrap()
    }

    fn september() -> DateWindow {
        october().previous().unwrap()
    }

    #[test]
    fn previous_window_has_equal_length() {
        let w = october();
        let prev = w.previous().unwrap();
        assert_eq!(prev, DateWindow { start: d(8, 31), end: d(9, 30) });
        assert_eq!(prev.days(), w.days());
        assert!(DateWindow::new(d(10, 2), d(10, 1)).is_none());
    }

    #[test]
    fn window_at_the_first_date_has_no_previous() {
        let first = DateWindow::new(NaiveDate::MIN, NaiveDate::MIN).unwrap();
        assert_eq!(first.previous(), None);
        assert_eq!(build_report(&[], &[], first), None);

        let far_past = DateWindow::new(NaiveDate::MIN + Days::new(10), NaiveDate::MIN + Days::new(40)).unwrap();
        assert_eq!(far_past.previous(), None);
    }

    #[test]
    fn growth_handles_zero_previous() {
        assert_eq!(growth_percentage(500.0, 0.0), 0.0);
        assert_eq!(growth_percentage(0.0, 0.0), 0.0);
        assert_eq!(growth_percentage(150.0, 100.0), 50.0);
        assert_eq!(growth_percentage(50.0, 100.0), -50.0);
        assert_eq!(growth_percentage(100.0, 300.0), -66.67);
        // a negative base flips the sign, as the plain formula does
        assert_eq!(growth_percentage(-50.0, -100.0), -50.0);
        assert_eq!(growth_percentage(100.0, -100.0), -200.0);
    }

    #[test]
    fn groups_sum_to_total_with_shares() {
        let entries = vec![
            entry("kids", 600.0, d(10, 3)),
            entry("adult", 300.0, d(10, 4)),
            entry("kids", 300.0, d(10, 20)),
            entry("kids", 1000.0, d(9, 15)),
            entry("adult", 999.0, d(11, 1)),
        ];
        let section = summarize(&entries, &october(), &september());
        assert_eq!(section.total, 1200.0);
        assert_eq!(section.previous_total, 1000.0);
        assert_eq!(section.growth_percentage, 20.0);
        assert_eq!(
            section.groups,
            vec![
                GroupShare { key: "kids".into(), label: "KIDS".into(), amount: 900.0, percentage: 75.0 },
                GroupShare { key: "adult".into(), label: "ADULT".into(), amount: 300.0, percentage: 25.0 },
            ]
        );
    }

    #[test]
    fn group_sum_matches_total_for_uneven_amounts() {
        let amounts = [0.1, 0.2, 0.3, 1234.56, 99.99, 0.07];
        let entries: Vec<Entry> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| entry(if i % 2 == 0 { "a" } else { "b" }, *a, d(10, 1 + i as u32)))
            .collect();
        let section = summarize(&entries, &october(), &september());
        let group_sum: f64 = section.groups.iter().map(|g| g.amount).sum();
        assert_eq!(group_sum, section.total);
    }

    #[test]
    fn total_follows_the_listed_group_order() {
        // key order a, b, c sums to 0.6000000000000001; listed order c, b, a to 0.6
        let entries = vec![
            entry("a", 0.1, d(10, 1)),
            entry("b", 0.2, d(10, 2)),
            entry("c", 0.3, d(10, 3)),
        ];
        let section = summarize(&entries, &october(), &september());
        let keys: Vec<_> = section.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
        let listed: f64 = section.groups.iter().map(|g| g.amount).sum();
        assert_eq!(listed, section.total);
        assert_eq!(section.total, 0.3 + 0.2 + 0.1);
    }

    #[test]
    fn empty_window_reports_zeroes() {
        let section = summarize(&[], &october(), &september());
        assert_eq!(section.total, 0.0);
        assert!(section.groups.is_empty());
        assert_eq!(section.growth_percentage, 0.0);
    }

    #[test]
    fn report_combines_income_and_expense() {
        let income = vec![entry("kids", 1000.0, d(10, 2)), entry("kids", 800.0, d(9, 10))];
        let expense = vec![entry("pool_rent", 400.0, d(10, 5)), entry("salary", 400.0, d(9, 5))];
        let report = build_report(&income, &expense, october()).unwrap();
        assert_eq!(report.net_profit, 600.0);
        assert_eq!(report.previous_net_profit, 400.0);
        assert_eq!(report.profit_growth_percentage, 50.0);
        assert_eq!(report.margin_percentage, 60.0);
        assert_eq!(
            report.monthly,
            vec![MonthRow { month: "2026-10".into(), income: 1000.0, expense: 400.0, net: 600.0 }]
        );
    }

    #[test]
    fn monthly_rows_cover_every_month_of_the_window() {
        let window = DateWindow::new(d(8, 15), d(10, 10)).unwrap();
        let report = build_report(&[], &[], window).unwrap();
        let months: Vec<_> = report.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2026-08", "2026-09", "2026-10"]);
    }
}
