use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::propertymodel::PropertyCategory;

const COUNTRY: (&str, &str, &str, &str) = ("Cameroon", "CMR", "+237", "XAF");

const REGIONS: [(&str, &str); 4] = [
    ("centre", "Centre"),
    ("littoral", "Littoral"),
    ("northwest", "Northwest"),
    ("southwest", "Southwest"),
];

// (name, region code, latitude, longitude)
const CITIES: [(&str, &str, f64, f64); 5] = [
    ("Douala", "littoral", 4.0511, 9.7679),
    ("Yaoundé", "centre", 3.8480, 11.5021),
    ("Bamenda", "northwest", 5.9631, 10.1591),
    ("Limbe", "southwest", 4.0186, 9.2006),
    ("Buea", "southwest", 4.1544, 9.2349),
];

// (name, city, commercial)
const AREAS: &[(&str, &str, bool)] = &[
    ("Akwa", "Douala", true),
    ("Bonabéri", "Douala", false),
    ("Bonanjo", "Douala", true),
    ("Bassa", "Douala", false),
    ("Deido", "Douala", false),
    ("New Bell", "Douala", false),
    ("Logpom", "Douala", false),
    ("Makepe", "Douala", false),
    ("Bonapriso", "Douala", true),
    ("Kotto", "Douala", false),
    ("PK8", "Douala", false),
    ("PK12", "Douala", false),
    ("PK14", "Douala", false),
    ("PK17", "Douala", false),
    ("Ndogpassi", "Douala", false),
    ("Bépanda", "Douala", false),
    ("Cité SIC", "Douala", false),
    ("Kassalafam", "Douala", false),
    ("Yassa", "Douala", false),
    ("Japoma", "Douala", false),
    ("Ngangue", "Douala", false),
    ("Village", "Douala", false),
    ("Cite des Palmiers", "Douala", false),
    ("Bonamoussadi", "Douala", false),
    ("Centre Ville", "Yaoundé", true),
    ("Bastos", "Yaoundé", false),
    ("Melen", "Yaoundé", false),
    ("Kondengui", "Yaoundé", false),
    ("Emana", "Yaoundé", false),
    ("Obobogo", "Yaoundé", false),
    ("Nkol-Eton", "Yaoundé", false),
    ("Olézoa", "Yaoundé", false),
    ("Mimboman", "Yaoundé", false),
    ("Carrière", "Yaoundé", false),
    ("Mokolo", "Yaoundé", false),
    ("Mvog-Ada", "Yaoundé", false),
    ("Essos", "Yaoundé", false),
    ("Nsam", "Yaoundé", false),
    ("Mvog-Mbi", "Yaoundé", false),
    ("Ekounou", "Yaoundé", false),
    ("Etoug-Ebe", "Yaoundé", false),
    ("Biyem-Assi", "Yaoundé", false),
    ("Djoungolo", "Yaoundé", false),
    ("Nkomo", "Yaoundé", false),
    ("Simbock", "Yaoundé", false),
    ("Nkolbisson", "Yaoundé", false),
    ("Commercial Avenue", "Bamenda", true),
    ("Up Station", "Bamenda", false),
    ("Mile 4", "Bamenda", false),
    ("Ntarikon", "Bamenda", false),
    ("Mulang", "Bamenda", false),
    ("Nkwen", "Bamenda", false),
    ("Mankon", "Bamenda", false),
    ("Cow Street", "Bamenda", false),
    ("Foncha Street", "Bamenda", false),
    ("Food Market", "Bamenda", false),
    ("Old Town", "Bamenda", false),
    ("Down Beach", "Limbe", false),
    ("Church Street", "Limbe", false),
    ("New Town", "Limbe", false),
    ("Mile 2", "Limbe", false),
    ("Mile 1", "Limbe", false),
    ("Batoke", "Limbe", false),
    ("Half Mile", "Limbe", false),
    ("Gardens", "Limbe", false),
    ("Checket", "Limbe", false),
    ("Motowo", "Limbe", false),
    ("Molyko", "Buea", false),
    ("Great Soppo", "Buea", false),
    ("Government Station", "Buea", false),
    ("Bonduma", "Buea", false),
    ("Mile 16", "Buea", false),
    ("Mile 15", "Buea", false),
    ("Mile 14", "Buea", false),
    ("Sandpit", "Buea", false),
    ("Bokwongo", "Buea", false),
    ("Lower Farms", "Buea", false),
    ("Upper Farms", "Buea", false),
    ("Clerks Quarters", "Buea", false),
];

const PROPERTY_TYPES: [(&str, PropertyCategory); 11] = [
    ("Chambre Modern", PropertyCategory::ChambreModern),
    ("Studio", PropertyCategory::Studio),
    ("Apartment", PropertyCategory::Apartment),
    ("Bungalow", PropertyCategory::Bungalow),
    ("Villa", PropertyCategory::VillaDuplex),
    ("Duplex", PropertyCategory::VillaDuplex),
    ("Commercial Office", PropertyCategory::Commercial),
    ("Shop", PropertyCategory::Commercial),
    ("Warehouse", PropertyCategory::Warehouse),
    ("Guest House", PropertyCategory::GuestHouse),
    ("Land", PropertyCategory::Land),
];

const PROPERTY_STATUSES: [&str; 6] = [
    "available",
    "pending",
    "sold",
    "rented",
    "withdrawn",
    "under_offer",
];

#[derive(Debug, Default, PartialEq)]
pub struct SeedReport {
    pub regions: usize,
    pub cities: usize,
    pub areas_created: u64,
    pub property_types_created: u64,
    pub statuses_created: u64,
}

/// Populates reference data. Safe to run repeatedly: existing rows are kept.
pub async fn seed_reference_data(pool: &PgPool) -> Result<SeedReport, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    let (name, code, phone_code, currency) = COUNTRY;
    let country_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO countries (name, code, phone_code, currency)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(phone_code)
    .bind(currency)
    .fetch_one(&mut *tx)
    .await?;

    let mut region_ids = HashMap::new();
    for (code, name) in REGIONS {
        let id = upsert_region(&mut tx, country_id, code, name).await?;
        region_ids.insert(code, id);
        report.regions += 1;
    }

    let mut city_ids = HashMap::new();
    for (name, region_code, lat, lng) in CITIES {
        let Some(region_id) = region_ids.get(region_code) else {
            continue;
        };
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO cities (name, region_id, is_major_city, latitude, longitude)
            VALUES ($1, $2, TRUE, $3::numeric, $4::numeric)
            ON CONFLICT (name, region_id) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(*region_id)
        .bind(lat)
        .bind(lng)
        .fetch_one(&mut *tx)
        .await?;
        city_ids.insert(name, id);
        report.cities += 1;
    }

    for (name, city, commercial) in AREAS {
        let Some(city_id) = city_ids.get(city) else {
            continue;
        };
        let result = sqlx::query(
            r#"
            INSERT INTO areas (name, city_id, is_residential, is_commercial, has_tarred_roads, has_electricity, has_water_supply)
            VALUES ($1, $2, TRUE, $3, $3, TRUE, TRUE)
            ON CONFLICT (name, city_id) DO NOTHING
            "#,
        )
        .bind(*name)
        .bind(*city_id)
        .bind(*commercial)
        .execute(&mut *tx)
        .await?;
        report.areas_created += result.rows_affected();
    }

    for (name, category) in PROPERTY_TYPES {
        let result = sqlx::query(
            "INSERT INTO property_types (name, category) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(category)
        .execute(&mut *tx)
        .await?;
        report.property_types_created += result.rows_affected();
    }

    for name in PROPERTY_STATUSES {
        let result = sqlx::query(
            "INSERT INTO property_statuses (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;
        report.statuses_created += result.rows_affected();
    }

    tx.commit().await?;

    tracing::info!(
        "Seeded {} regions, {} cities, {} new areas, {} new property types, {} new statuses",
        report.regions,
        report.cities,
        report.areas_created,
        report.property_types_created,
        report.statuses_created
    );

    Ok(report)
}

async fn upsert_region(
    tx: &mut Transaction<'_, Postgres>,
    country_id: Uuid,
    code: &str,
    name: &str,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO regions (name, code, country_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (name, country_id) DO UPDATE SET code = EXCLUDED.code
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(country_id)
    .fetch_one(&mut **tx)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_city_belongs_to_a_seeded_region() {
        let codes: HashSet<&str> = REGIONS.iter().map(|(code, _)| *code).collect();
        assert!(CITIES.iter().all(|(_, region, _, _)| codes.contains(region)));
    }

    #[test]
    fn area_names_are_unique_within_their_city() {
        let cities: HashSet<&str> = CITIES.iter().map(|(name, ..)| *name).collect();
        let mut seen = HashSet::new();
        for (name, city, _) in AREAS {
            assert!(cities.contains(city), "{} has no seeded city", city);
            assert!(seen.insert((*name, *city)), "{} repeated in {}", name, city);
        }
    }

    #[test]
    fn property_type_names_are_unique() {
        let names: HashSet<&str> = PROPERTY_TYPES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), PROPERTY_TYPES.len());
    }
}
