//! Foreign-key resolution for display.
//!
//! Each lookup is built once per call as an id → label map, so enriching
//! `n` records against `m` lookup rows costs O(n + m). A missing match is
//! replaced by a fixed fallback label; records are never dropped.

use std::collections::HashMap;

use crate::models::{Driver, Equipment, Infraction, Invariant, Partner, Report, SanctionRule, Vehicle};

pub const UNKNOWN_INVARIANT: &str = "Invariant inconnu";
pub const UNASSIGNED: &str = "Non assigné";
pub const NOT_AVAILABLE: &str = "N/A";

/// A record paired with the label resolved from one of its references.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T, L = String> {
    pub record: T,
    pub label: L,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleLabel {
    pub name: String,
    pub registration: String,
}

pub trait DriverRef {
    fn driver_ref(&self) -> Option<&str>;
}

pub trait InvariantRef {
    fn invariant_ref(&self) -> Option<&str>;
}

pub trait VehicleRef {
    fn vehicle_ref(&self) -> Option<&str>;
}

pub trait PartnerRef {
    fn partner_ref(&self) -> Option<&str>;
}

impl DriverRef for Infraction {
    fn driver_ref(&self) -> Option<&str> {
        self.driver()
    }
}

impl DriverRef for Report {
    fn driver_ref(&self) -> Option<&str> {
        self.driver_id.as_deref().filter(|id| !id.is_empty())
    }
}

impl InvariantRef for Infraction {
    fn invariant_ref(&self) -> Option<&str> {
        self.invariant()
    }
}

impl InvariantRef for SanctionRule {
    fn invariant_ref(&self) -> Option<&str> {
        Some(self.invariant_id.as_str()).filter(|id| !id.is_empty())
    }
}

impl VehicleRef for Equipment {
    fn vehicle_ref(&self) -> Option<&str> {
        Some(self.vehicle_id.as_str()).filter(|id| !id.is_empty())
    }
}

impl PartnerRef for Driver {
    fn partner_ref(&self) -> Option<&str> {
        self.partner_id.as_deref().filter(|id| !id.is_empty())
    }
}

pub fn driver_names(drivers: &[Driver]) -> HashMap<&str, String> {
    drivers
        .iter()
        .map(|driver| (driver.id.as_str(), driver.full_name()))
        .collect()
}

pub fn invariant_titles(invariants: &[Invariant]) -> HashMap<&str, &str> {
    invariants
        .iter()
        .map(|invariant| (invariant.id.as_str(), invariant.title.as_str()))
        .collect()
}

fn resolve(map: &HashMap<&str, String>, key: Option<&str>, fallback: &str) -> String {
    key.and_then(|key| map.get(key))
        .filter(|label| !label.is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

pub fn enrich_with_driver_name<T: DriverRef + Clone>(
    records: &[T],
    drivers: &[Driver],
) -> Vec<Enriched<T>> {
    let names = driver_names(drivers);
    records
        .iter()
        .map(|record| Enriched {
            label: resolve(&names, record.driver_ref(), NOT_AVAILABLE),
            record: record.clone(),
        })
        .collect()
}

pub fn enrich_with_invariant_title<T: InvariantRef + Clone>(
    records: &[T],
    invariants: &[Invariant],
) -> Vec<Enriched<T>> {
    let titles: HashMap<&str, String> = invariant_titles(invariants)
        .into_iter()
        .map(|(id, title)| (id, title.to_string()))
        .collect();
    records
        .iter()
        .map(|record| Enriched {
            label: resolve(&titles, record.invariant_ref(), UNKNOWN_INVARIANT),
            record: record.clone(),
        })
        .collect()
}

pub fn enrich_with_vehicle_label<T: VehicleRef + Clone>(
    records: &[T],
    vehicles: &[Vehicle],
) -> Vec<Enriched<T, VehicleLabel>> {
    let by_id: HashMap<&str, &Vehicle> = vehicles
        .iter()
        .map(|vehicle| (vehicle.id.as_str(), vehicle))
        .collect();

    records
        .iter()
        .map(|record| {
            let vehicle = record.vehicle_ref().and_then(|id| by_id.get(id));
            let field = |value: Option<&String>| {
                value
                    .filter(|value| !value.is_empty())
                    .cloned()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            };
            Enriched {
                label: VehicleLabel {
                    name: field(vehicle.map(|v| &v.name)),
                    registration: field(vehicle.map(|v| &v.registration)),
                },
                record: record.clone(),
            }
        })
        .collect()
}

pub fn enrich_with_partner_name<T: PartnerRef + Clone>(
    records: &[T],
    partners: &[Partner],
) -> Vec<Enriched<T>> {
    let names: HashMap<&str, String> = partners
        .iter()
        .map(|partner| (partner.id.as_str(), partner.name.clone()))
        .collect();
    records
        .iter()
        .map(|record| Enriched {
            label: resolve(&names, record.partner_ref(), UNASSIGNED),
            record: record.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id: &str, first: &str, last: &str) -> Driver {
        Driver {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Driver::default()
        }
    }

    fn infraction(driver: Option<&str>, invariant: Option<&str>) -> Infraction {
        Infraction {
            id: "inf".to_string(),
            date: "2024-01-10".to_string(),
            driver_id: driver.map(str::to_string),
            invariant_id: invariant.map(str::to_string),
            kind: "Alerte".to_string(),
            count: 1.0,
            ..Infraction::default()
        }
    }

    #[test]
    fn resolves_driver_names_with_fallback() {
        let drivers = vec![driver("d1", "Awa", "Diallo")];
        let records = vec![
            infraction(Some("d1"), None),
            infraction(Some("ghost"), None),
            infraction(None, None),
        ];

        let enriched = enrich_with_driver_name(&records, &drivers);
        let labels: Vec<&str> = enriched.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Awa Diallo", NOT_AVAILABLE, NOT_AVAILABLE]);
    }

    #[test]
    fn unknown_invariants_keep_their_record() {
        let invariants = vec![Invariant {
            id: "inv-1".to_string(),
            title: "Vitesse".to_string(),
        }];
        let records = vec![
            infraction(None, Some("inv-1")),
            infraction(None, Some("inv-2")),
        ];

        let enriched = enrich_with_invariant_title(&records, &invariants);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].label, "Vitesse");
        assert_eq!(enriched[1].label, UNKNOWN_INVARIANT);
        assert_eq!(enriched[1].record.invariant_id.as_deref(), Some("inv-2"));
    }

    #[test]
    fn vehicle_fields_fall_back_independently() {
        let vehicles = vec![Vehicle {
            id: "v1".to_string(),
            name: "Tracteur 12".to_string(),
            registration: String::new(),
        }];
        let equipment = vec![
            Equipment {
                vehicle_id: "v1".to_string(),
                ..Equipment::default()
            },
            Equipment {
                vehicle_id: "v9".to_string(),
                ..Equipment::default()
            },
        ];

        let enriched = enrich_with_vehicle_label(&equipment, &vehicles);
        assert_eq!(enriched[0].label.name, "Tracteur 12");
        assert_eq!(enriched[0].label.registration, NOT_AVAILABLE);
        assert_eq!(enriched[1].label.name, NOT_AVAILABLE);
    }

    #[test]
    fn drivers_without_partner_are_unassigned() {
        let partners = vec![Partner {
            id: "p1".to_string(),
            name: "Transports Sahel".to_string(),
            active: true,
        }];
        let mut assigned = driver("d1", "Awa", "Diallo");
        assigned.partner_id = Some("p1".to_string());
        let unassigned = driver("d2", "Moussa", "Ba");

        let enriched = enrich_with_partner_name(&[assigned, unassigned], &partners);
        assert_eq!(enriched[0].label, "Transports Sahel");
        assert_eq!(enriched[1].label, UNASSIGNED);
    }
}
