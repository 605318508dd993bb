use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::trace;

use crate::dates::{self, YearFilter};
use crate::duration;
use crate::enrich;
use crate::models::{
    Driver, DriverPoints, Infraction, Invariant, InvariantCount, MonthlySeries, Partner,
    PartnerSummary, RecentInfraction, Report, ReportTimeField, SanctionRule, TypeCounts, ALARM,
    ALERT,
};

pub const DEFAULT_TOP_INVARIANTS: usize = 5;
pub const DEFAULT_RECENT_INFRACTIONS: usize = 5;

/// First partner flagged active.
pub fn active_partner(partners: &[Partner]) -> Option<&Partner> {
    partners.iter().find(|partner| partner.active)
}

pub fn partner_summary(partners: &[Partner]) -> PartnerSummary {
    PartnerSummary {
        total: partners.len(),
        active: partners.iter().filter(|partner| partner.active).count(),
    }
}

/// Records with a parseable date inside the year filter, paired with that date.
fn dated_in_year<'a, T>(
    records: &'a [T],
    date_of: impl Fn(&T) -> &str,
    year: YearFilter,
) -> Vec<(NaiveDate, &'a T)> {
    let mut skipped = 0usize;
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        match dates::normalize_date(date_of(record)) {
            Some(date) if year.matches(date) => kept.push((date, record)),
            Some(_) => {}
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        trace!(skipped, "records excluded for unparseable dates");
    }
    kept
}

/// Counter that remembers the order in which keys were first seen.
struct Tally<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V: Default + std::ops::AddAssign> Tally<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: &str, value: V) {
        let slot = match self.index.get(key) {
            Some(slot) => *slot,
            None => {
                self.entries.push((key.to_string(), V::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[slot].1 += value;
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

pub fn monthly_infraction_counts(infractions: &[Infraction], year: YearFilter) -> MonthlySeries {
    let mut series = MonthlySeries::default();
    for (date, _) in dated_in_year(infractions, |inf| &inf.date, year) {
        series.totals[dates::month_index(date)] += 1;
    }
    series
}

/// Hours per month for one duration column, rounded per slot after summing.
pub fn monthly_hour_totals(
    reports: &[Report],
    year: YearFilter,
    field: ReportTimeField,
) -> MonthlySeries {
    let mut hours = [0.0f64; 12];
    for (date, report) in dated_in_year(reports, |report| &report.date, year) {
        hours[dates::month_index(date)] += duration::hours_from_duration(report.time_field(field));
    }

    let mut series = MonthlySeries::default();
    for (slot, total) in series.totals.iter_mut().zip(hours) {
        *slot = total.round().max(0.0) as u64;
    }
    series
}

pub fn infractions_by_type(infractions: &[Infraction], year: YearFilter) -> TypeCounts {
    let mut counts = TypeCounts::default();
    for (_, infraction) in dated_in_year(infractions, |inf| &inf.date, year) {
        match infraction.kind.as_str() {
            ALERT => counts.alerts += 1,
            ALARM => counts.alarms += 1,
            _ => {}
        }
    }
    counts
}

/// Most frequent invariants, ties kept in first-seen order.
pub fn top_invariants_by_infraction_count(
    infractions: &[Infraction],
    invariants: &[Invariant],
    year: YearFilter,
    top_n: usize,
) -> Vec<InvariantCount> {
    let mut tally = Tally::<u64>::new();
    for (_, infraction) in dated_in_year(infractions, |inf| &inf.date, year) {
        if let Some(invariant_id) = infraction.invariant() {
            tally.add(invariant_id, 1);
        }
    }

    let titles = enrich::invariant_titles(invariants);
    let mut counts: Vec<InvariantCount> = tally
        .into_entries()
        .into_iter()
        .map(|(invariant_id, total)| InvariantCount {
            title: titles
                .get(invariant_id.as_str())
                .filter(|title| !title.is_empty())
                .map(|title| title.to_string())
                .unwrap_or_else(|| enrich::UNKNOWN_INVARIANT.to_string()),
            invariant_id,
            total,
        })
        .collect();

    counts.sort_by(|a, b| b.total.cmp(&a.total));
    counts.truncate(top_n);
    counts
}

fn rule_key(invariant_id: &str, kind: &str) -> String {
    format!("{invariant_id}-{kind}").to_lowercase()
}

/// SCP points lost per driver, highest first. Drivers at zero are omitted.
pub fn points_lost_per_driver(
    infractions: &[Infraction],
    rules: &[SanctionRule],
    drivers: &[Driver],
    year: YearFilter,
) -> Vec<DriverPoints> {
    let points_by_rule: HashMap<String, f64> = rules
        .iter()
        .map(|rule| (rule_key(&rule.invariant_id, &rule.kind), rule.value))
        .collect();

    let mut tally = Tally::<f64>::new();
    for (_, infraction) in dated_in_year(infractions, |inf| &inf.date, year) {
        let Some(driver_id) = infraction.driver() else {
            continue;
        };
        let points = infraction
            .invariant()
            .and_then(|invariant_id| points_by_rule.get(&rule_key(invariant_id, &infraction.kind)))
            .copied()
            .unwrap_or(0.0);
        tally.add(driver_id, points);
    }

    let names = enrich::driver_names(drivers);
    let mut totals: Vec<DriverPoints> = tally
        .into_entries()
        .into_iter()
        .filter(|(_, total)| *total > 0.0)
        .map(|(driver_id, total)| DriverPoints {
            name: names.get(driver_id.as_str()).cloned().unwrap_or_else(|| {
                let short: String = driver_id.chars().take(5).collect();
                format!("Conducteur {short}...")
            }),
            driver_id,
            total,
        })
        .collect();

    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Infractions dated in the same calendar month as `today`.
pub fn infractions_in_month(infractions: &[Infraction], today: NaiveDate) -> usize {
    infractions
        .iter()
        .filter_map(|infraction| dates::normalize_date(&infraction.date))
        .filter(|date| date.year() == today.year() && date.month() == today.month())
        .count()
}

/// Latest infractions first; undated ones sort last.
pub fn recent_infractions(
    infractions: &[Infraction],
    drivers: &[Driver],
    limit: usize,
) -> Vec<RecentInfraction> {
    let mut recent: Vec<RecentInfraction> = enrich::enrich_with_driver_name(infractions, drivers)
        .into_iter()
        .map(|enriched| RecentInfraction {
            date: dates::normalize_date(&enriched.record.date),
            infraction: enriched.record,
            driver_name: enriched.label,
        })
        .collect();

    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(limit);
    recent
}
