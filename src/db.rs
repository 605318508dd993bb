use std::path::Path;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Document, Driver, Equipment, Infraction, Invariant, Objective, Partner, Report, SanctionRule,
    Vehicle, WorkTimeAnalysis, ALARM, ALERT, DAILY_FREQUENCY, DAILY_WORK_TIME_INVARIANT,
};
use crate::snapshot::Snapshot;

pub struct DocumentStore {
    pool: PgPool,
}

/// Decode one stored body. The error names the offending document.
fn decode_document<T: Document>(id: String, body: serde_json::Value) -> StoreResult<T> {
    let mut doc: T = serde_json::from_value(body).map_err(|source| StoreError::Decode {
        collection: T::COLLECTION,
        id: id.clone(),
        source,
    })?;
    doc.set_id(id);
    Ok(doc)
}

fn decode_row<T: Document>(row: &PgRow) -> StoreResult<T> {
    let Json(body): Json<serde_json::Value> = row.try_get("body")?;
    decode_document(row.try_get("id")?, body)
}

fn validated<T: Document>(doc: &T) -> StoreResult<()> {
    doc.validate().map_err(|message| StoreError::Validation {
        collection: T::COLLECTION,
        message,
    })
}

impl DocumentStore {
    pub async fn connect(settings: &Settings, database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_rows<T: Document>(
        &self,
        partner_id: Option<&str>,
    ) -> StoreResult<Vec<T>> {
        let mut query = String::from(
            "SELECT id, body FROM fleet_compliance.documents WHERE collection = $1",
        );
        if partner_id.is_some() {
            query.push_str(" AND partner_id = $2");
        }
        query.push_str(" ORDER BY created_at, id");

        let mut rows = sqlx::query(&query).bind(T::COLLECTION);
        if let Some(partner_id) = partner_id {
            rows = rows.bind(partner_id);
        }

        let documents = rows
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(decode_row::<T>)
            .collect::<StoreResult<Vec<T>>>()?;

        debug!(
            collection = T::COLLECTION,
            partner = partner_id.unwrap_or("*"),
            count = documents.len(),
            "fetched collection"
        );
        Ok(documents)
    }

    pub async fn fetch_all<T: Document>(&self) -> StoreResult<Vec<T>> {
        self.fetch_rows(None).await
    }

    pub async fn fetch_for_partner<T: Document>(&self, partner_id: &str) -> StoreResult<Vec<T>> {
        self.fetch_rows(Some(partner_id)).await
    }

    pub async fn get<T: Document>(&self, id: &str) -> StoreResult<T> {
        let row = sqlx::query(
            "SELECT id, body FROM fleet_compliance.documents WHERE collection = $1 AND id = $2",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })?;

        decode_row(&row)
    }

    /// Create a document, assigning a fresh id when it has none.
    pub async fn insert<T: Document>(&self, doc: &mut T) -> StoreResult<String> {
        validated(doc)?;
        if doc.id().is_empty() {
            doc.set_id(Uuid::new_v4().to_string());
        }

        sqlx::query(
            r#"
            INSERT INTO fleet_compliance.documents (collection, id, partner_id, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.partner_id())
        .bind(Json(&*doc))
        .execute(&self.pool)
        .await?;

        info!(collection = T::COLLECTION, id = doc.id(), "document created");
        Ok(doc.id().to_string())
    }

    pub async fn update<T: Document>(&self, doc: &T) -> StoreResult<()> {
        validated(doc)?;
        let result = sqlx::query(
            r#"
            UPDATE fleet_compliance.documents
            SET partner_id = $3, body = $4, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.partner_id())
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: T::COLLECTION,
                id: doc.id().to_string(),
            });
        }
        info!(collection = T::COLLECTION, id = doc.id(), "document updated");
        Ok(())
    }

    async fn upsert<T: Document>(&self, doc: &T) -> StoreResult<()> {
        validated(doc)?;
        sqlx::query(
            r#"
            INSERT INTO fleet_compliance.documents (collection, id, partner_id, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, id) DO UPDATE
            SET partner_id = EXCLUDED.partner_id, body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(doc.partner_id())
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, collection: &'static str, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM fleet_compliance.documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        info!(collection, id, "document deleted");
        Ok(())
    }

    pub async fn active_partner(&self) -> StoreResult<Partner> {
        let partners: Vec<Partner> = self.fetch_all().await?;
        crate::metrics::active_partner(&partners)
            .cloned()
            .ok_or(StoreError::NoActivePartner)
    }

    /// Make `partner_id` the only active partner.
    pub async fn activate_partner(&self, partner_id: &str) -> StoreResult<Partner> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query(
            "SELECT 1 FROM fleet_compliance.documents WHERE collection = $1 AND id = $2",
        )
        .bind(Partner::COLLECTION)
        .bind(partner_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound {
                collection: Partner::COLLECTION,
                id: partner_id.to_string(),
            });
        }

        sqlx::query(
            r#"
            UPDATE fleet_compliance.documents
            SET body = jsonb_set(body, '{actif}', to_jsonb(id = $2)), updated_at = now()
            WHERE collection = $1
            "#,
        )
        .bind(Partner::COLLECTION)
        .bind(partner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(partner = partner_id, "partner activated");
        self.get(partner_id).await
    }

    /// Save the cause analysis for a report, replacing any earlier one.
    pub async fn save_analysis(&self, analysis: &mut WorkTimeAnalysis) -> StoreResult<String> {
        validated(analysis)?;
        let existing = sqlx::query(
            r#"
            SELECT id FROM fleet_compliance.documents
            WHERE collection = $1 AND body->>'rapports_id' = $2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(WorkTimeAnalysis::COLLECTION)
        .bind(&analysis.report_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => {
                analysis.set_id(row.try_get("id")?);
                self.update(&*analysis).await?;
                Ok(analysis.id.clone())
            }
            None => self.insert(analysis).await,
        }
    }

    /// Read every collection the partner's views need.
    pub async fn load_snapshot(&self, partner: Partner) -> StoreResult<Snapshot> {
        let partner_id = partner.id.clone();
        Ok(Snapshot {
            partners: self.fetch_all().await?,
            drivers: self.fetch_all().await?,
            vehicles: self.fetch_all().await?,
            invariants: self.fetch_all().await?,
            infractions: self.fetch_for_partner(&partner_id).await?,
            sanction_rules: self.fetch_for_partner(&partner_id).await?,
            reports: self.fetch_for_partner(&partner_id).await?,
            analyses: self.fetch_for_partner(&partner_id).await?,
            objectives: self.fetch_for_partner(&partner_id).await?,
            equipment: self.fetch_for_partner(&partner_id).await?,
            partner,
        })
    }

    /// Import documents from a CSV file whose headers are the document's
    /// field names. Each row is stamped with `partner_id`.
    pub async fn import_csv<T: Document>(
        &self,
        csv_path: &Path,
        partner_id: &str,
    ) -> StoreResult<usize> {
        let mut reader = csv::Reader::from_path(csv_path)?;
        let mut inserted = 0usize;

        for result in reader.deserialize::<T>() {
            let mut doc = result?;
            doc.assign_partner(partner_id);
            if doc.id().is_empty() {
                self.insert(&mut doc).await?;
            } else {
                self.upsert(&doc).await?;
            }
            inserted += 1;
        }

        info!(
            collection = T::COLLECTION,
            inserted,
            path = %csv_path.display(),
            "csv import finished"
        );
        Ok(inserted)
    }

    pub async fn seed(&self) -> StoreResult<()> {
        for doc in &seed_partners() {
            self.upsert(doc).await?;
        }
        let partner_id = SEED_ACTIVE_PARTNER;
        self.activate_partner(partner_id).await?;

        let drivers = vec![
            driver("seed-driver-awa", "Awa", "Diallo", "B-20931", "C", "OBC-101", "Dakar"),
            driver("seed-driver-moussa", "Moussa", "Ndiaye", "B-88213", "CE", "OBC-102", "Thiès"),
            driver("seed-driver-fatou", "Fatou", "Sarr", "B-44120", "C", "OBC-103", "Kaolack"),
        ];
        for mut doc in drivers {
            doc.assign_partner(partner_id);
            self.upsert(&doc).await?;
        }

        let vehicles = vec![
            Vehicle {
                id: "seed-vehicle-1".to_string(),
                name: "Renault T 480".to_string(),
                registration: "DK-4821-A".to_string(),
            },
            Vehicle {
                id: "seed-vehicle-2".to_string(),
                name: "Volvo FH 500".to_string(),
                registration: "TH-1187-B".to_string(),
            },
        ];
        for doc in &vehicles {
            self.upsert(doc).await?;
        }

        let invariants = vec![
            invariant("seed-inv-work", DAILY_WORK_TIME_INVARIANT),
            invariant("seed-inv-speed", "Excès de vitesse"),
            invariant("seed-inv-driving", "Temps de conduite continue"),
        ];
        for doc in &invariants {
            self.upsert(doc).await?;
        }

        let rules = vec![
            rule("seed-scp-1", "seed-inv-speed", "Avertissement écrit", ALERT, 1.0),
            rule("seed-scp-2", "seed-inv-speed", "Mise à pied", ALARM, 3.0),
            rule("seed-scp-3", "seed-inv-driving", "Rappel à l'ordre", ALERT, 1.0),
            rule("seed-scp-4", "seed-inv-driving", "Formation obligatoire", ALARM, 2.0),
        ];
        for mut doc in rules {
            doc.assign_partner(partner_id);
            self.upsert(&doc).await?;
        }

        let infractions = vec![
            infraction("seed-inf-1", "2026-02-03", "seed-driver-awa", "seed-inv-speed", ALERT),
            infraction("seed-inf-2", "12/02/2026", "seed-driver-awa", "seed-inv-speed", ALARM),
            infraction("seed-inf-3", "2026-03-09", "seed-driver-moussa", "seed-inv-driving", ALARM),
            infraction("seed-inf-4", "2026-04-21", "seed-driver-fatou", "seed-inv-speed", ALERT),
            infraction("seed-inf-5", "2026-04-22", "seed-driver-moussa", "seed-inv-driving", ALERT),
        ];
        for mut doc in infractions {
            doc.assign_partner(partner_id);
            self.upsert(&doc).await?;
        }

        let reports = vec![
            report("seed-rap-1", "2026-03-02", "lundi", "seed-driver-awa", ("06:00", "15:30"), "09:30:00", "07:10:00"),
            report("seed-rap-2", "2026-03-03", "mardi", "seed-driver-awa", ("05:45", "17:00"), "11:15:00", "08:40:00"),
            report("seed-rap-3", "2026-03-10", "mardi", "seed-driver-awa", ("07:00", "16:00"), "09:00:00", "06:55:00"),
            report("seed-rap-4", "2026-03-10", "mardi", "seed-driver-moussa", ("06:30", "18:10"), "11:40:00", "09:05:00"),
        ];
        for mut doc in reports {
            doc.assign_partner(partner_id);
            self.upsert(&doc).await?;
        }

        let mut objective = Objective {
            id: "seed-obj-work".to_string(),
            invariant_id: "seed-inv-work".to_string(),
            target: 10.0,
            unit: "heures".to_string(),
            chapter: "Temps de travail".to_string(),
            frequency: DAILY_FREQUENCY.to_string(),
            ..Objective::default()
        };
        objective.assign_partner(partner_id);
        self.upsert(&objective).await?;

        let mut analysis = WorkTimeAnalysis {
            id: "seed-tt-1".to_string(),
            report_id: "seed-rap-2".to_string(),
            cause: "Trafic dense".to_string(),
            action: "Optimisation du planning".to_string(),
            follow_up: "Amélioration constatée".to_string(),
            ..WorkTimeAnalysis::default()
        };
        analysis.assign_partner(partner_id);
        self.upsert(&analysis).await?;

        let mut equipment = Equipment {
            id: "seed-eq-1".to_string(),
            date: "2026-01-15".to_string(),
            vehicle_id: "seed-vehicle-1".to_string(),
            beacon: true,
            camera: true,
            fatigue_detector: false,
            ..Equipment::default()
        };
        equipment.assign_partner(partner_id);
        self.upsert(&equipment).await?;

        info!("seed data written");
        Ok(())
    }
}

const SEED_ACTIVE_PARTNER: &str = "seed-partner-sahel";

/// Seed partners are written inactive; `seed` then activates one through
/// `activate_partner` so any previously active partner is switched off.
fn seed_partners() -> Vec<Partner> {
    vec![
        partner(SEED_ACTIVE_PARTNER, "Transports Sahel"),
        partner("seed-partner-atlas", "Atlas Logistique"),
    ]
}

fn partner(id: &str, name: &str) -> Partner {
    Partner {
        id: id.to_string(),
        name: name.to_string(),
        active: false,
    }
}

fn driver(
    id: &str,
    first_name: &str,
    last_name: &str,
    license_number: &str,
    license_category: &str,
    obc_key: &str,
    workplace: &str,
) -> Driver {
    Driver {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        license_number: license_number.to_string(),
        license_category: license_category.to_string(),
        obc_key: obc_key.to_string(),
        workplace: workplace.to_string(),
        partner_id: None,
    }
}

fn invariant(id: &str, title: &str) -> Invariant {
    Invariant {
        id: id.to_string(),
        title: title.to_string(),
    }
}

fn rule(id: &str, invariant_id: &str, sanction: &str, kind: &str, value: f64) -> SanctionRule {
    SanctionRule {
        id: id.to_string(),
        invariant_id: invariant_id.to_string(),
        sanction: sanction.to_string(),
        kind: kind.to_string(),
        value,
        ..SanctionRule::default()
    }
}

fn infraction(id: &str, date: &str, driver_id: &str, invariant_id: &str, kind: &str) -> Infraction {
    Infraction {
        id: id.to_string(),
        date: date.to_string(),
        driver_id: Some(driver_id.to_string()),
        invariant_id: Some(invariant_id.to_string()),
        kind: kind.to_string(),
        count: 1.0,
        ..Infraction::default()
    }
}

fn report(
    id: &str,
    date: &str,
    weekday: &str,
    driver_id: &str,
    trip: (&str, &str),
    duration: &str,
    driving_time: &str,
) -> Report {
    Report {
        id: id.to_string(),
        date: date.to_string(),
        weekday: weekday.to_string(),
        driver_id: Some(driver_id.to_string()),
        trip_start: trip.0.to_string(),
        trip_end: trip.1.to_string(),
        duration: duration.to_string(),
        driving_time: driving_time.to_string(),
        ..Report::default()
    }
}
