use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dates::WeekRange;
use crate::duration;

pub const ALERT: &str = "Alerte";
pub const ALARM: &str = "Alarme";

/// Invariant title and frequency that identify the daily work-time objective.
pub const DAILY_WORK_TIME_INVARIANT: &str = "Temps de travail journalier";
pub const DAILY_FREQUENCY: &str = "Journalier";

/// A JSON document stored in one named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Unpin {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn partner_id(&self) -> Option<&str> {
        None
    }

    /// Stamp the owning partner on partner-scoped documents.
    fn assign_partner(&mut self, _partner_id: &str) {}

    /// Required-field checks applied before every write.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn require(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "actif", default)]
    pub active: bool,
}

impl Document for Partner {
    const COLLECTION: &'static str = "partenaires";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.name, "Le nom est requis.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "prenom", default)]
    pub first_name: String,
    #[serde(rename = "nom", default)]
    pub last_name: String,
    #[serde(rename = "numero_permis", default)]
    pub license_number: String,
    #[serde(rename = "categorie_permis", default)]
    pub license_category: String,
    #[serde(rename = "cle_obc", default)]
    pub obc_key: String,
    #[serde(rename = "lieu_travail", default)]
    pub workplace: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: Option<String>,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for Driver {
    const COLLECTION: &'static str = "conducteurs";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = Some(partner_id.to_string());
    }

    fn partner_id(&self) -> Option<&str> {
        non_empty(&self.partner_id)
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.last_name, "Le nom est requis.")?;
        require(&self.first_name, "Le prénom est requis.")?;
        require(&self.license_number, "Le numéro de permis est requis.")?;
        require(&self.license_category, "La catégorie est requise.")?;
        require(&self.obc_key, "La clé OBC est requise.")?;
        require(&self.workplace, "Le lieu de travail est requis.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nom", default)]
    pub name: String,
    #[serde(rename = "immatriculation", default)]
    pub registration: String,
}

impl Document for Vehicle {
    const COLLECTION: &'static str = "vehicules";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// On-board equipment fitted to a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "vehicule_id", default)]
    pub vehicle_id: String,
    #[serde(rename = "balise", default)]
    pub beacon: bool,
    #[serde(default)]
    pub camera: bool,
    #[serde(rename = "detecteur_de_fatigue", default)]
    pub fatigue_detector: bool,
}

impl Document for Equipment {
    const COLLECTION: &'static str = "equipements";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.date, "La date est requise.")?;
        require(&self.vehicle_id, "Le véhicule est requis.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "titre", default)]
    pub title: String,
}

impl Document for Invariant {
    const COLLECTION: &'static str = "invariants";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(rename = "conducteur_id", default)]
    pub driver_id: Option<String>,
    #[serde(rename = "invariant_id", default)]
    pub invariant_id: Option<String>,
    #[serde(rename = "rapports_id", default)]
    pub report_id: Option<String>,
    /// `Alerte` or `Alarme`; other tags are stored but ignored by type counts.
    #[serde(rename = "type_infraction", default)]
    pub kind: String,
    #[serde(rename = "nombre", default = "default_count")]
    pub count: f64,
    #[serde(rename = "mesure_disciplinaire", default)]
    pub disciplinary_measure: String,
    #[serde(rename = "autres_mesures_disciplinaire", default)]
    pub other_measures: String,
    #[serde(rename = "suivi", default)]
    pub followed_up: bool,
    #[serde(rename = "amelioration", default)]
    pub improved: bool,
    #[serde(rename = "date_suivi", default)]
    pub follow_up_date: String,
}

fn default_count() -> f64 {
    1.0
}

impl Infraction {
    pub fn driver(&self) -> Option<&str> {
        non_empty(&self.driver_id)
    }

    pub fn invariant(&self) -> Option<&str> {
        non_empty(&self.invariant_id)
    }
}

impl Document for Infraction {
    const COLLECTION: &'static str = "infractions";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.date, "La date est requise.")?;
        require(&self.kind, "Le type est requis.")?;
        if self.count.is_nan() || self.count < 0.0 {
            return Err("Le nombre doit être positif.".to_string());
        }
        Ok(())
    }
}

/// SCP rule: points lost for one (invariant, infraction type) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionRule {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(rename = "invariants_id", default)]
    pub invariant_id: String,
    #[serde(default)]
    pub sanction: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
}

impl Document for SanctionRule {
    const COLLECTION: &'static str = "scp";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.invariant_id, "Invariant is required.")?;
        require(&self.sanction, "Sanction is required.")?;
        require(&self.kind, "Type is required.")?;
        if self.value.is_nan() || self.value < 0.0 {
            return Err("Value must be a positive number.".to_string());
        }
        Ok(())
    }
}

/// Daily driving/work record for a driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "jour", default)]
    pub weekday: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(rename = "conducteur_id", default)]
    pub driver_id: Option<String>,
    #[serde(rename = "heure_debut_trajet", default)]
    pub trip_start: String,
    #[serde(rename = "heure_fin_trajet", default)]
    pub trip_end: String,
    /// Work time, `HH:MM:SS`.
    #[serde(rename = "duree", default)]
    pub duration: String,
    /// Driving time, `HH:MM:SS`.
    #[serde(rename = "temps_conduite", default)]
    pub driving_time: String,
}

impl Report {
    pub fn time_field(&self, field: ReportTimeField) -> &str {
        match field {
            ReportTimeField::WorkTime => &self.duration,
            ReportTimeField::DrivingTime => &self.driving_time,
        }
    }
}

impl Document for Report {
    const COLLECTION: &'static str = "rapports";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.date, "La date est requise.")
    }
}

/// Which duration column of a report to total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTimeField {
    WorkTime,
    DrivingTime,
}

/// Cause analysis saved against one report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkTimeAnalysis {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(rename = "rapports_id", default)]
    pub report_id: String,
    #[serde(rename = "analyse_cause", default)]
    pub cause: String,
    #[serde(rename = "action_prise", default)]
    pub action: String,
    #[serde(rename = "suivi", default)]
    pub follow_up: String,
}

impl Document for WorkTimeAnalysis {
    const COLLECTION: &'static str = "temps_travail";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.cause, "L'analyse est requise.")?;
        require(&self.action, "L'action est requise.")?;
        require(&self.follow_up, "Le suivi est requis.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub invariant_id: String,
    #[serde(rename = "partenaire_id", default)]
    pub partner_id: String,
    #[serde(rename = "cible", default)]
    pub target: f64,
    #[serde(rename = "unite", default)]
    pub unit: String,
    #[serde(rename = "chapitre", default)]
    pub chapter: String,
    #[serde(rename = "frequence", default)]
    pub frequency: String,
}

impl Objective {
    pub fn label(&self) -> String {
        format!("{} {}", self.target, self.unit)
    }
}

impl Document for Objective {
    const COLLECTION: &'static str = "objectifs";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assign_partner(&mut self, partner_id: &str) {
        self.partner_id = partner_id.to_string();
    }

    fn partner_id(&self) -> Option<&str> {
        Some(self.partner_id.as_str()).filter(|id| !id.is_empty())
    }
}

// Derived views. Never persisted.

/// Twelve calendar slots, January first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthlySeries {
    pub totals: [u64; 12],
}

impl MonthlySeries {
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        crate::dates::MONTH_LABELS
            .iter()
            .copied()
            .zip(self.totals.iter().copied())
    }

    pub fn sum(&self) -> u64 {
        self.totals.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub alerts: u64,
    pub alarms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantCount {
    pub invariant_id: String,
    pub title: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverPoints {
    pub driver_id: String,
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartnerSummary {
    pub total: usize,
    pub active: usize,
}

/// Infraction with its driver resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentInfraction {
    pub infraction: Infraction,
    pub driver_name: String,
    pub date: Option<NaiveDate>,
}

/// Report joined with its objective label and saved analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedReport {
    pub report: Report,
    pub objective: String,
    pub analysis: Option<WorkTimeAnalysis>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAnalysis {
    pub week: WeekRange,
    pub label: String,
    pub reports: Vec<EnrichedReport>,
    pub subtotal_seconds: f64,
}

impl WeeklyAnalysis {
    pub fn subtotal(&self) -> String {
        duration::format_duration(self.subtotal_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infraction_reads_dashboard_field_names() {
        let json = r#"{
            "id": "inf-1",
            "date": "05/03/2024",
            "partenaire_id": "p1",
            "conducteur_id": "d1",
            "invariant_id": "inv-1",
            "type_infraction": "Alerte"
        }"#;
        let infraction: Infraction = serde_json::from_str(json).unwrap();
        assert_eq!(infraction.kind, ALERT);
        assert_eq!(infraction.driver(), Some("d1"));
        assert_eq!(infraction.count, 1.0);
        assert!(!infraction.followed_up);
    }

    #[test]
    fn blank_foreign_keys_count_as_missing() {
        let json = r#"{"date": "2024-01-01", "conducteur_id": "", "type_infraction": "Alarme"}"#;
        let infraction: Infraction = serde_json::from_str(json).unwrap();
        assert_eq!(infraction.driver(), None);
        assert_eq!(infraction.invariant(), None);
    }

    #[test]
    fn driver_validation_requires_license_fields() {
        let mut driver = Driver {
            first_name: "Awa".to_string(),
            last_name: "Diallo".to_string(),
            license_number: "B-1234".to_string(),
            license_category: "C".to_string(),
            obc_key: "OBC-9".to_string(),
            workplace: "Dakar".to_string(),
            ..Driver::default()
        };
        assert!(driver.validate().is_ok());
        assert_eq!(driver.full_name(), "Awa Diallo");

        driver.license_number = "  ".to_string();
        assert_eq!(
            driver.validate(),
            Err("Le numéro de permis est requis.".to_string())
        );
    }

    #[test]
    fn sanction_rule_rejects_negative_points() {
        let rule = SanctionRule {
            invariant_id: "inv-1".to_string(),
            sanction: "Avertissement".to_string(),
            kind: ALERT.to_string(),
            value: -1.0,
            ..SanctionRule::default()
        };
        assert!(rule.validate().is_err());
        assert!(SanctionRule { value: 0.0, ..rule }.validate().is_ok());
    }

    #[test]
    fn sanction_rule_accepts_fractional_points() {
        let json = r#"{
            "partenaire_id": "p1",
            "invariants_id": "inv-1",
            "sanction": "Avertissement",
            "type": "Alerte",
            "value": 2.0
        }"#;
        let rule: SanctionRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.value, 2.0);

        let half: SanctionRule =
            serde_json::from_str(&json.replace("2.0", "1.5")).unwrap();
        assert_eq!(half.value, 1.5);
        assert!(half.validate().is_ok());

        let whole: SanctionRule = serde_json::from_str(&json.replace("2.0", "3")).unwrap();
        assert_eq!(whole.value, 3.0);
    }

    #[test]
    fn infraction_count_may_be_zero_but_not_negative() {
        let mut infraction = Infraction {
            date: "2024-01-01".to_string(),
            kind: ALERT.to_string(),
            count: 0.0,
            ..Infraction::default()
        };
        assert!(infraction.validate().is_ok());

        infraction.count = -1.0;
        assert_eq!(
            infraction.validate(),
            Err("Le nombre doit être positif.".to_string())
        );

        let json = r#"{"date": "2024-01-01", "type_infraction": "Alerte", "nombre": 2.0}"#;
        let parsed: Infraction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.count, 2.0);
    }

    #[test]
    fn objective_label_joins_target_and_unit() {
        let objective = Objective {
            target: 10.0,
            unit: "heures".to_string(),
            ..Objective::default()
        };
        assert_eq!(objective.label(), "10 heures");
        let fractional = Objective {
            target: 8.5,
            ..objective
        };
        assert_eq!(fractional.label(), "8.5 heures");
    }

    #[test]
    fn monthly_series_is_labeled_in_calendar_order() {
        let mut series = MonthlySeries::default();
        series.totals[0] = 2;
        series.totals[11] = 1;
        let labeled: Vec<_> = series.labeled().collect();
        assert_eq!(labeled.len(), 12);
        assert_eq!(labeled[0], ("Jan", 2));
        assert_eq!(labeled[11], ("Déc", 1));
        assert_eq!(series.sum(), 3);
    }
}
