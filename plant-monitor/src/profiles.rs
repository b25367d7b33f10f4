//! PostgreSQL persistence for plant profiles.
//!
//! Only profiles are persisted; readings and alerts stay in memory.

use anyhow::{Context, Result};
use plant_core::{OptimalRanges, PlantProfile, Range};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }

    /// Create the `plant_profile` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS plant_profile (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                species           TEXT NOT NULL,
                location          TEXT NOT NULL,
                planted_date      TIMESTAMPTZ NOT NULL,
                last_watered      TIMESTAMPTZ,
                soil_moisture_min DOUBLE PRECISION NOT NULL,
                soil_moisture_max DOUBLE PRECISION NOT NULL,
                temperature_min   DOUBLE PRECISION NOT NULL,
                temperature_max   DOUBLE PRECISION NOT NULL,
                light_level_min   DOUBLE PRECISION NOT NULL,
                light_level_max   DOUBLE PRECISION NOT NULL,
                ph_min            DOUBLE PRECISION NOT NULL,
                ph_max            DOUBLE PRECISION NOT NULL,
                created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create plant_profile table")?;
        Ok(())
    }

    /// Every stored profile, oldest registration first.
    pub async fn load_all(&self) -> Result<Vec<PlantProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, species, location, planted_date, last_watered,
                   soil_moisture_min, soil_moisture_max,
                   temperature_min, temperature_max,
                   light_level_min, light_level_max,
                   ph_min, ph_max
            FROM plant_profile
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("SELECT plant_profile failed")?;

        rows.iter()
            .map(|row| profile_from_row(row).context("Malformed plant_profile row"))
            .collect()
    }

    pub async fn upsert(&self, p: &PlantProfile) -> Result<()> {
        let r = &p.optimal_ranges;
        sqlx::query(
            r#"
            INSERT INTO plant_profile (
                id, name, species, location, planted_date, last_watered,
                soil_moisture_min, soil_moisture_max,
                temperature_min, temperature_max,
                light_level_min, light_level_max,
                ph_min, ph_max
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                species = EXCLUDED.species,
                location = EXCLUDED.location,
                planted_date = EXCLUDED.planted_date,
                last_watered = EXCLUDED.last_watered,
                soil_moisture_min = EXCLUDED.soil_moisture_min,
                soil_moisture_max = EXCLUDED.soil_moisture_max,
                temperature_min = EXCLUDED.temperature_min,
                temperature_max = EXCLUDED.temperature_max,
                light_level_min = EXCLUDED.light_level_min,
                light_level_max = EXCLUDED.light_level_max,
                ph_min = EXCLUDED.ph_min,
                ph_max = EXCLUDED.ph_max,
                updated_at = NOW()
            "#,
        )
        .bind(&p.id)
        .bind(&p.name)
        .bind(&p.species)
        .bind(&p.location)
        .bind(p.planted_date)
        .bind(p.last_watered)
        .bind(r.soil_moisture.min)
        .bind(r.soil_moisture.max)
        .bind(r.temperature.min)
        .bind(r.temperature.max)
        .bind(r.light_level.min)
        .bind(r.light_level.max)
        .bind(r.ph.min)
        .bind(r.ph.max)
        .execute(&self.pool)
        .await
        .with_context(|| format!("UPSERT plant_profile {} failed", p.id))?;
        Ok(())
    }
}

fn range(row: &PgRow, min: &str, max: &str) -> Result<Range, sqlx::Error> {
    Ok(Range::new(row.try_get(min)?, row.try_get(max)?))
}

fn profile_from_row(row: &PgRow) -> Result<PlantProfile, sqlx::Error> {
    Ok(PlantProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        species: row.try_get("species")?,
        location: row.try_get("location")?,
        planted_date: row.try_get("planted_date")?,
        last_watered: row.try_get("last_watered")?,
        optimal_ranges: OptimalRanges {
            soil_moisture: range(row, "soil_moisture_min", "soil_moisture_max")?,
            temperature: range(row, "temperature_min", "temperature_max")?,
            light_level: range(row, "light_level_min", "light_level_max")?,
            ph: range(row, "ph_min", "ph_max")?,
        },
    })
}
