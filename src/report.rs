use std::fmt::Write;

use crate::dates::{MonthSelection, YearFilter};
use crate::enrich::{Enriched, VehicleLabel};
use crate::models::{Driver, DriverPoints, Equipment, MonthlySeries, SanctionRule, WeeklyAnalysis};
use crate::paginate::{total_pages, Pager};
use crate::snapshot::DashboardView;
use crate::timesheet;

fn year_label(year: YearFilter) -> String {
    match year {
        YearFilter::All => "Toutes années".to_string(),
        YearFilter::Year(year) => year.to_string(),
    }
}

fn write_series(output: &mut String, series: &MonthlySeries, unit: &str) {
    for (month, total) in series.labeled() {
        let _ = writeln!(output, "- {month}: {total}{unit}");
    }
}

pub fn points_section(output: &mut String, points: &[DriverPoints]) {
    if points.is_empty() {
        let _ = writeln!(output, "Aucun point perdu pour la période.");
        return;
    }
    for entry in points {
        let _ = writeln!(output, "- {}: {} points", entry.name, entry.total);
    }
}

pub fn dashboard_report(view: &DashboardView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Tableau de bord");
    let _ = writeln!(
        output,
        "Partenaire actif: {} ({})",
        view.partner_name,
        year_label(view.year)
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- Partenaires: {} (dont {} actif(s))",
        view.partners.total, view.partners.active
    );
    let _ = writeln!(output, "- Conducteurs: {}", view.driver_count);
    let _ = writeln!(output, "- Véhicules: {}", view.vehicle_count);
    let _ = writeln!(
        output,
        "- Infractions (ce mois-ci): {}",
        view.infractions_this_month
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Aperçu des Infractions");
    write_series(&mut output, &view.monthly_infractions, "");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Temps de Travail Mensuel");
    write_series(&mut output, &view.monthly_work_hours, "h");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Temps de Conduite Mensuel");
    write_series(&mut output, &view.monthly_driving_hours, "h");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Infractions par Type");
    if view.by_type.alerts == 0 && view.by_type.alarms == 0 {
        let _ = writeln!(output, "Aucune donnée pour ce graphique.");
    } else {
        let _ = writeln!(output, "- Alertes: {}", view.by_type.alerts);
        let _ = writeln!(output, "- Alarmes: {}", view.by_type.alarms);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Infractions par Invariant");
    if view.top_invariants.is_empty() {
        let _ = writeln!(output, "Aucune donnée pour ce graphique.");
    } else {
        for entry in &view.top_invariants {
            let _ = writeln!(output, "- {}: {}", entry.title, entry.total);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Points Perdus par Conducteur");
    points_section(&mut output, &view.points_lost);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Infractions récentes");
    if view.recent.is_empty() {
        let _ = writeln!(output, "Aucune infraction récente.");
    } else {
        for entry in &view.recent {
            let date = entry
                .date
                .map(|date| date.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| entry.infraction.date.clone());
            let _ = writeln!(
                output,
                "- {} ({}) le {}",
                entry.driver_name, entry.infraction.kind, date
            );
        }
    }

    output
}

pub fn timesheet_report(driver: &str, period: MonthSelection, weeks: &[WeeklyAnalysis]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Analyse des Temps de Travail");
    let _ = writeln!(output, "Chauffeur: {} ({})", driver, period.label());

    if weeks.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Aucun rapport pour cette période.");
        return output;
    }

    for week in weeks {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", week.label);
        let _ = writeln!(
            output,
            "| Date | Jour | Début | Fin | Durée | Objectif | Analyse | Action | Suivi |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for row in &week.reports {
            let (cause, action, follow_up) = row
                .analysis
                .as_ref()
                .map(|a| (a.cause.as_str(), a.action.as_str(), a.follow_up.as_str()))
                .unwrap_or(("-", "-", "-"));
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                row.report.date,
                row.report.weekday,
                row.report.trip_start,
                row.report.trip_end,
                row.report.duration,
                row.objective,
                cause,
                action,
                follow_up
            );
        }
        let _ = writeln!(output, "Sous-total: {}", week.subtotal());
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Total du mois: {}", timesheet::month_total(weeks));
    output
}

fn page_footer(output: &mut String, pager: &Pager, len: usize) {
    let pages = total_pages(len, pager.page_size());
    let _ = writeln!(
        output,
        "Page {} sur {} ({} lignes, {} par page)",
        pager.page(),
        pages.max(1),
        len,
        pager.page_size()
    );
}

pub fn drivers_table(rows: &[Enriched<Driver>], pager: &Pager) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        let _ = writeln!(output, "Aucun conducteur trouvé.");
        return output;
    }
    for row in pager.slice(rows) {
        let driver = &row.record;
        let _ = writeln!(
            output,
            "- {} | permis {} ({}) | OBC {} | {} | {}",
            driver.full_name(),
            driver.license_number,
            driver.license_category,
            driver.obc_key,
            driver.workplace,
            row.label
        );
    }
    page_footer(&mut output, pager, rows.len());
    output
}

pub fn sanctions_table(rows: &[Enriched<SanctionRule>], pager: &Pager) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        let _ = writeln!(output, "Aucune règle SCP trouvée.");
        return output;
    }
    for row in pager.slice(rows) {
        let rule = &row.record;
        let _ = writeln!(
            output,
            "- {} | {} | {} | {} points",
            row.label, rule.kind, rule.sanction, rule.value
        );
    }
    page_footer(&mut output, pager, rows.len());
    output
}

pub fn equipment_table(rows: &[Enriched<Equipment, VehicleLabel>], pager: &Pager) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        let _ = writeln!(output, "Aucun équipement trouvé.");
        return output;
    }
    let flag = |value: bool| if value { "oui" } else { "non" };
    for row in pager.slice(rows) {
        let equipment = &row.record;
        let _ = writeln!(
            output,
            "- {} | {} ({}) | balise {} | caméra {} | détecteur de fatigue {}",
            equipment.date,
            row.label.name,
            row.label.registration,
            flag(equipment.beacon),
            flag(equipment.camera),
            flag(equipment.fatigue_detector)
        );
    }
    page_footer(&mut output, pager, rows.len());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedReport, PartnerSummary, Report, TypeCounts, WorkTimeAnalysis};

    fn empty_view() -> DashboardView {
        DashboardView {
            partner_name: "Transports Sahel".to_string(),
            year: YearFilter::All,
            partners: PartnerSummary { total: 1, active: 1 },
            driver_count: 0,
            vehicle_count: 0,
            infractions_this_month: 0,
            monthly_infractions: MonthlySeries::default(),
            monthly_work_hours: MonthlySeries::default(),
            monthly_driving_hours: MonthlySeries::default(),
            by_type: TypeCounts::default(),
            top_invariants: Vec::new(),
            points_lost: Vec::new(),
            recent: Vec::new(),
        }
    }

    #[test]
    fn empty_dashboard_uses_placeholders() {
        let report = dashboard_report(&empty_view());
        assert!(report.contains("Transports Sahel (Toutes années)"));
        assert!(report.contains("- Jan: 0"));
        assert!(report.contains("- Déc: 0h"));
        assert!(report.contains("Aucun point perdu pour la période."));
        assert!(report.contains("Aucune infraction récente."));
    }

    #[test]
    fn dashboard_lists_points() {
        let mut view = empty_view();
        view.year = YearFilter::Year(2024);
        view.points_lost = vec![
            DriverPoints {
                driver_id: "d1".to_string(),
                name: "Awa Diallo".to_string(),
                total: 4.0,
            },
            DriverPoints {
                driver_id: "d2".to_string(),
                name: "Moussa Ndiaye".to_string(),
                total: 1.5,
            },
        ];
        view.by_type = TypeCounts { alerts: 2, alarms: 0 };

        let report = dashboard_report(&view);
        assert!(report.contains("(2024)"));
        assert!(report.contains("- Awa Diallo: 4 points"));
        assert!(report.contains("- Moussa Ndiaye: 1.5 points"));
        assert!(report.contains("- Alertes: 2"));
    }

    #[test]
    fn timesheet_shows_subtotals_and_analysis() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let week = crate::dates::iso_week_range(date);
        let weeks = vec![WeeklyAnalysis {
            week,
            label: week.label(),
            reports: vec![EnrichedReport {
                report: Report {
                    date: "2024-03-05".to_string(),
                    duration: "08:30:00".to_string(),
                    ..Report::default()
                },
                objective: "10 heures".to_string(),
                analysis: Some(WorkTimeAnalysis {
                    cause: "Trafic dense".to_string(),
                    ..WorkTimeAnalysis::default()
                }),
            }],
            subtotal_seconds: 30_600.0,
        }];

        let period = MonthSelection { year: 2024, month: 3 };
        let report = timesheet_report("Awa Diallo", period, &weeks);
        assert!(report.contains("Chauffeur: Awa Diallo (mars 2024)"));
        assert!(report.contains("## Semaine du 04 mars au 10 mars 2024"));
        assert!(report.contains("| Trafic dense |"));
        assert!(report.contains("Sous-total: 08:30:00"));
        assert!(report.contains("Total du mois: 08:30:00"));

        let empty = timesheet_report("Awa Diallo", period, &[]);
        assert!(empty.contains("Aucun rapport pour cette période."));
    }

    #[test]
    fn tables_show_only_current_page() {
        let rows: Vec<Enriched<SanctionRule>> = (1..=3u32)
            .map(|value| Enriched {
                record: SanctionRule {
                    sanction: format!("Sanction {value}"),
                    value: f64::from(value),
                    ..SanctionRule::default()
                },
                label: "Vitesse".to_string(),
            })
            .collect();
        let mut pager = Pager::new(2);
        pager.go_to(2);

        let table = sanctions_table(&rows, &pager);
        assert!(table.contains("Sanction 3"));
        assert!(!table.contains("Sanction 1"));
        assert!(table.contains("Page 2 sur 2 (3 lignes, 2 par page)"));
    }
}
