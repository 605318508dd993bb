use chrono::NaiveDate;

use crate::config::Settings;
use crate::dates::{MonthSelection, YearFilter};
use crate::metrics;
use crate::models::{
    Driver, DriverPoints, Equipment, Infraction, Invariant, InvariantCount, MonthlySeries,
    Objective, Partner, PartnerSummary, RecentInfraction, Report, ReportTimeField, SanctionRule,
    TypeCounts, Vehicle, WeeklyAnalysis, WorkTimeAnalysis,
};
use crate::timesheet::{self, TimeSheetQuery};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub partner: Partner,
    pub partners: Vec<Partner>,
    pub drivers: Vec<Driver>,
    pub vehicles: Vec<Vehicle>,
    pub invariants: Vec<Invariant>,
    pub infractions: Vec<Infraction>,
    pub sanction_rules: Vec<SanctionRule>,
    pub reports: Vec<Report>,
    pub analyses: Vec<WorkTimeAnalysis>,
    pub objectives: Vec<Objective>,
    pub equipment: Vec<Equipment>,
}

/// Everything shown on the dashboard for one year filter.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub partner_name: String,
    pub year: YearFilter,
    pub partners: PartnerSummary,
    pub driver_count: usize,
    pub vehicle_count: usize,
    pub infractions_this_month: usize,
    pub monthly_infractions: MonthlySeries,
    pub monthly_work_hours: MonthlySeries,
    pub monthly_driving_hours: MonthlySeries,
    pub by_type: TypeCounts,
    pub top_invariants: Vec<InvariantCount>,
    pub points_lost: Vec<DriverPoints>,
    pub recent: Vec<RecentInfraction>,
}

impl Snapshot {
    pub fn dashboard(&self, year: YearFilter, today: NaiveDate, settings: &Settings) -> DashboardView {
        DashboardView {
            partner_name: self.partner.name.clone(),
            year,
            partners: metrics::partner_summary(&self.partners),
            driver_count: self.drivers.len(),
            vehicle_count: self.vehicles.len(),
            infractions_this_month: metrics::infractions_in_month(&self.infractions, today),
            monthly_infractions: metrics::monthly_infraction_counts(&self.infractions, year),
            monthly_work_hours: metrics::monthly_hour_totals(
                &self.reports,
                year,
                ReportTimeField::WorkTime,
            ),
            monthly_driving_hours: metrics::monthly_hour_totals(
                &self.reports,
                year,
                ReportTimeField::DrivingTime,
            ),
            by_type: metrics::infractions_by_type(&self.infractions, year),
            top_invariants: metrics::top_invariants_by_infraction_count(
                &self.infractions,
                &self.invariants,
                year,
                settings.top_invariants,
            ),
            points_lost: self.points_lost(year),
            recent: metrics::recent_infractions(
                &self.infractions,
                &self.drivers,
                settings.recent_infractions,
            ),
        }
    }

    pub fn points_lost(&self, year: YearFilter) -> Vec<DriverPoints> {
        metrics::points_lost_per_driver(&self.infractions, &self.sanction_rules, &self.drivers, year)
    }

    pub fn time_sheet(&self, driver_id: &str, period: MonthSelection) -> Vec<WeeklyAnalysis> {
        let query = TimeSheetQuery {
            partner_id: &self.partner.id,
            driver_id,
            period,
        };
        timesheet::weekly_time_sheet(
            &self.reports,
            &query,
            &self.objectives,
            &self.analyses,
            &self.invariants,
        )
    }

    pub fn driver(&self, driver_id: &str) -> Option<&Driver> {
        self.drivers.iter().find(|driver| driver.id == driver_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ALARM, ALERT};

    fn snapshot() -> Snapshot {
        let partner = Partner {
            id: "p1".to_string(),
            name: "Transports Sahel".to_string(),
            active: true,
        };
        let infraction = |id: &str, date: &str, kind: &str| Infraction {
            id: id.to_string(),
            date: date.to_string(),
            partner_id: "p1".to_string(),
            driver_id: Some("d1".to_string()),
            invariant_id: Some("speed".to_string()),
            kind: kind.to_string(),
            count: 1.0,
            ..Infraction::default()
        };

        Snapshot {
            partners: vec![
                partner.clone(),
                Partner {
                    id: "p2".to_string(),
                    name: "Autre".to_string(),
                    active: false,
                },
            ],
            partner,
            drivers: vec![Driver {
                id: "d1".to_string(),
                first_name: "Awa".to_string(),
                last_name: "Diallo".to_string(),
                ..Driver::default()
            }],
            invariants: vec![Invariant {
                id: "speed".to_string(),
                title: "Vitesse".to_string(),
            }],
            infractions: vec![
                infraction("i1", "2024-03-05", ALERT),
                infraction("i2", "2024-03-20", ALARM),
                infraction("i3", "invalid", ALERT),
            ],
            sanction_rules: vec![SanctionRule {
                invariant_id: "speed".to_string(),
                kind: ALARM.to_string(),
                value: 4.0,
                ..SanctionRule::default()
            }],
            reports: vec![Report {
                id: "r1".to_string(),
                date: "2024-03-05".to_string(),
                driver_id: Some("d1".to_string()),
                duration: "08:30:00".to_string(),
                driving_time: "06:00:00".to_string(),
                ..Report::default()
            }],
            ..Snapshot::default()
        }
    }

    #[test]
    fn dashboard_combines_every_metric() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();
        let view = snapshot().dashboard(YearFilter::Year(2024), today, &Settings::default());

        assert_eq!(view.partner_name, "Transports Sahel");
        assert_eq!(view.partners, PartnerSummary { total: 2, active: 1 });
        assert_eq!(view.driver_count, 1);
        assert_eq!(view.infractions_this_month, 2);
        assert_eq!(view.monthly_infractions.totals[2], 2);
        assert_eq!(view.monthly_work_hours.totals[2], 9);
        assert_eq!(view.monthly_driving_hours.totals[2], 6);
        assert_eq!(view.by_type, TypeCounts { alerts: 1, alarms: 1 });
        assert_eq!(view.top_invariants[0].total, 2);
        assert_eq!(view.points_lost[0].total, 4.0);
        assert_eq!(view.recent.len(), 3);
        assert_eq!(view.recent[0].infraction.id, "i2");
    }

    #[test]
    fn time_sheet_uses_snapshot_partner() {
        let snapshot = snapshot();
        let period = MonthSelection { year: 2024, month: 3 };
        let weeks = snapshot.time_sheet("d1", period);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].subtotal(), "08:30:00");
        assert!(snapshot.time_sheet("nobody", period).is_empty());
        assert_eq!(snapshot.driver("d1").map(Driver::full_name), Some("Awa Diallo".to_string()));
    }
}
