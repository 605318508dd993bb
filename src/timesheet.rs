//! Weekly work-time sheet for one driver and one calendar month.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::dates::{self, MonthSelection};
use crate::duration;
use crate::enrich::NOT_AVAILABLE;
use crate::models::{
    EnrichedReport, Invariant, Objective, Report, WeeklyAnalysis, WorkTimeAnalysis,
    DAILY_FREQUENCY, DAILY_WORK_TIME_INVARIANT,
};

#[derive(Debug, Clone, Copy)]
pub struct TimeSheetQuery<'a> {
    pub partner_id: &'a str,
    pub driver_id: &'a str,
    pub period: MonthSelection,
}

/// The partner's daily objective attached to the work-time invariant.
pub fn daily_work_time_objective<'a>(
    objectives: &'a [Objective],
    invariants: &[Invariant],
    partner_id: &str,
) -> Option<&'a Objective> {
    let invariant = invariants
        .iter()
        .find(|invariant| invariant.title == DAILY_WORK_TIME_INVARIANT)?;

    objectives.iter().find(|objective| {
        objective.invariant_id == invariant.id
            && objective.partner_id == partner_id
            && objective.frequency == DAILY_FREQUENCY
    })
}

/// Group the driver's reports for the month by Monday-start week.
///
/// Weeks come out in chronological order; reports inside a week keep their
/// input order. Each week's subtotal is the sum of its reports' durations.
pub fn weekly_time_sheet(
    reports: &[Report],
    query: &TimeSheetQuery<'_>,
    objectives: &[Objective],
    analyses: &[WorkTimeAnalysis],
    invariants: &[Invariant],
) -> Vec<WeeklyAnalysis> {
    let objective = daily_work_time_objective(objectives, invariants, query.partner_id)
        .map(Objective::label)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let analysis_by_report: HashMap<&str, &WorkTimeAnalysis> = analyses
        .iter()
        .map(|analysis| (analysis.report_id.as_str(), analysis))
        .collect();

    let mut weeks: BTreeMap<chrono::NaiveDate, WeeklyAnalysis> = BTreeMap::new();

    for report in reports {
        if report.driver_id.as_deref() != Some(query.driver_id) {
            continue;
        }
        let Some(date) = dates::normalize_date(&report.date) else {
            continue;
        };
        if !query.period.contains(date) {
            continue;
        }

        let range = dates::iso_week_range(date);
        let week = weeks.entry(range.start).or_insert_with(|| WeeklyAnalysis {
            week: range,
            label: range.label(),
            reports: Vec::new(),
            subtotal_seconds: 0.0,
        });

        week.subtotal_seconds += duration::parse_duration(&report.duration);
        week.reports.push(EnrichedReport {
            report: report.clone(),
            objective: objective.clone(),
            analysis: analysis_by_report.get(report.id.as_str()).map(|a| (*a).clone()),
        });
    }

    debug!(
        driver = query.driver_id,
        weeks = weeks.len(),
        period = %query.period.label(),
        "built weekly time sheet"
    );
    weeks.into_values().collect()
}

/// Sum of the week subtotals, formatted `HH:MM:SS`.
pub fn month_total(weeks: &[WeeklyAnalysis]) -> String {
    duration::format_duration(weeks.iter().map(|week| week.subtotal_seconds).sum())
}
