use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::locationmodel::{AreaLocation, City, Country, Region};

#[derive(Debug, Deserialize, Default)]
pub struct RegionQueryDto {
    pub country: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CityQueryDto {
    pub region: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AreaQueryDto {
    pub city: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AreaDto {
    #[serde(flatten)]
    pub area: AreaLocation,
    pub full_location: String,
}

impl AreaDto {
    pub fn from_area(area: AreaLocation) -> Self {
        let full_location = area.full_location();
        AreaDto { area, full_location }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AreaNode {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CityNode {
    pub id: Uuid,
    pub name: String,
    pub is_major_city: bool,
    pub areas: Vec<AreaNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RegionNode {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub cities: Vec<CityNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CountryNode {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub regions: Vec<RegionNode>,
}

/// Nests flat location lists. Input order is kept at every level and
/// children whose parent is missing are dropped.
pub fn build_location_tree(
    countries: Vec<Country>,
    regions: Vec<Region>,
    cities: Vec<City>,
    areas: Vec<AreaLocation>,
) -> Vec<CountryNode> {
    let mut areas_by_city: HashMap<Uuid, Vec<AreaNode>> = HashMap::new();
    for a in areas {
        areas_by_city.entry(a.area.city_id).or_default().push(AreaNode {
            id: a.area.id,
            name: a.area.name,
        });
    }

    let mut cities_by_region: HashMap<Uuid, Vec<CityNode>> = HashMap::new();
    for c in cities {
        cities_by_region.entry(c.region_id).or_default().push(CityNode {
            id: c.id,
            areas: areas_by_city.remove(&c.id).unwrap_or_default(),
            name: c.name,
            is_major_city: c.is_major_city,
        });
    }

    let mut regions_by_country: HashMap<Uuid, Vec<RegionNode>> = HashMap::new();
    for r in regions {
        regions_by_country.entry(r.country_id).or_default().push(RegionNode {
            id: r.id,
            cities: cities_by_region.remove(&r.id).unwrap_or_default(),
            name: r.name,
            code: r.code,
        });
    }

    countries
        .into_iter()
        .map(|c| CountryNode {
            regions: regions_by_country.remove(&c.id).unwrap_or_default(),
            id: c.id,
            name: c.name,
            code: c.code,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::locationmodel::Area;
    use chrono::Utc;

    fn area(city_id: Uuid, name: &str) -> AreaLocation {
        AreaLocation {
            area: Area {
                id: Uuid::new_v4(),
                name: name.to_string(),
                city_id,
                local_name: None,
                description: None,
                is_residential: true,
                is_commercial: false,
                is_industrial: false,
                has_tarred_roads: false,
                has_electricity: true,
                has_water_supply: true,
                postal_code: None,
                latitude: None,
                longitude: None,
                is_active: true,
                created_at: Utc::now(),
            },
            city_name: "Douala".to_string(),
            region_name: "Littoral".to_string(),
            country_name: "Cameroon".to_string(),
        }
    }

    #[test]
    fn full_location_names_area_city_and_region() {
        let dto = AreaDto::from_area(area(Uuid::new_v4(), "Akwa"));
        assert_eq!(dto.full_location, "Akwa, Douala, Littoral");
    }

    #[test]
    fn tree_nests_each_level_under_its_parent() {
        let now = Utc::now();
        let country = Country {
            id: Uuid::new_v4(),
            name: "Cameroon".to_string(),
            code: "CMR".to_string(),
            phone_code: "+237".to_string(),
            currency: "XAF".to_string(),
            is_active: true,
            created_at: now,
        };
        let region = Region {
            id: Uuid::new_v4(),
            name: "Littoral".to_string(),
            code: "littoral".to_string(),
            country_id: country.id,
            is_active: true,
            created_at: now,
        };
        let douala = City {
            id: Uuid::new_v4(),
            name: "Douala".to_string(),
            region_id: region.id,
            is_major_city: true,
            latitude: None,
            longitude: None,
            is_active: true,
            created_at: now,
        };
        let orphan_area = area(Uuid::new_v4(), "Nowhere");

        let tree = build_location_tree(
            vec![country],
            vec![region],
            vec![douala.clone()],
            vec![area(douala.id, "Akwa"), area(douala.id, "Bonanjo"), orphan_area],
        );

        assert_eq!(tree.len(), 1);
        let cities = &tree[0].regions[0].cities;
        assert_eq!(cities[0].name, "Douala");
        let names: Vec<&str> = cities[0].areas.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Akwa", "Bonanjo"]);
    }
}
