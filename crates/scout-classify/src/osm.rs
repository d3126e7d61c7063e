//! OSM business import via Overpass.
//!
//! Areas and category filters live in operator-maintained JSON config
//! files. Each import builds an Overpass QL query per filter chunk,
//! inserts unseen elements as businesses (the `(source, source_id)`
//! unique constraint makes re-imports no-ops), and records their
//! phone/email tags as contacts.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use scout_clients::overpass::{OsmElement, OverpassClient};
use scout_clients::Config;
use scout_store::contacts::NewBusinessContact;
use scout_store::{businesses, cities, contacts, jobs};

use crate::error::ClassifyError;
use crate::osm_contacts::extract_osm_contacts;

pub const JOB_NAME: &str = "import_osm";

/// One searchable area: either OSM area tags or a bounding box.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaConfig {
    #[serde(skip)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub area_tags: HashMap<String, String>,
    #[serde(default)]
    pub bbox: Option<Bbox>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Bbox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// One tag filter mapping matched elements to a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryFilter {
    pub category: String,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub filters: Vec<CategoryFilter>,
}

/// Load the areas config file (`{key: {name, country, area_tags, …}}`).
pub fn load_areas(path: &Path) -> Result<HashMap<String, AreaConfig>, ClassifyError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ClassifyError::Config(format!("cannot read {}: {e}", path.display())))?;
    let mut areas: HashMap<String, AreaConfig> = serde_json::from_str(&raw)
        .map_err(|e| ClassifyError::Config(format!("invalid areas file: {e}")))?;
    for (key, area) in areas.iter_mut() {
        area.key = key.clone();
    }
    Ok(areas)
}

/// Load the categories config file.
pub fn load_categories(path: &Path) -> Result<HashMap<String, CategoryConfig>, ClassifyError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ClassifyError::Config(format!("cannot read {}: {e}", path.display())))?;
    let mut categories: HashMap<String, CategoryConfig> = serde_json::from_str(&raw)
        .map_err(|e| ClassifyError::Config(format!("invalid categories file: {e}")))?;
    for (key, category) in categories.iter_mut() {
        category.key = key.clone();
        if category.label.is_empty() {
            category.label = key.clone();
        }
    }
    Ok(categories)
}

fn tag_clause(tags: &HashMap<String, String>) -> String {
    let mut parts: Vec<String> = tags
        .iter()
        .map(|(key, value)| {
            if value == "*" {
                format!("[\"{key}\"]")
            } else {
                format!("[\"{key}\"=\"{value}\"]")
            }
        })
        .collect();
    parts.sort();
    parts.join("")
}

/// Build one Overpass QL query for an area and a chunk of filters.
/// Elements must carry a `name` to be importable.
pub fn build_query(area: &AreaConfig, filters: &[CategoryFilter], timeout_secs: u64) -> String {
    let mut lines = vec![format!("[out:json][timeout:{timeout_secs}];")];

    let search_area = if let Some(bbox) = &area.bbox {
        format!(
            "({},{},{},{})",
            bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
        )
    } else {
        lines.push(format!("area{}->.searchArea;", tag_clause(&area.area_tags)));
        "(area.searchArea)".to_string()
    };

    lines.push("(".to_string());
    for filter in filters {
        lines.push(format!(
            "  nwr[\"name\"]{}{search_area};",
            tag_clause(&filter.tags)
        ));
    }
    lines.push(");".to_string());
    lines.push("out center tags;".to_string());
    lines.join("\n")
}

/// Assemble an address from `addr:*` tags.
pub fn extract_address(element: &OsmElement) -> Option<String> {
    if let Some(full) = element.tag("addr:full") {
        return Some(full.to_string());
    }
    let parts: Vec<&str> = [
        "addr:housenumber",
        "addr:street",
        "addr:city",
        "addr:postcode",
        "addr:country",
    ]
    .iter()
    .filter_map(|key| element.tag(key))
    .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The website tag, if any.
pub fn extract_website(element: &OsmElement) -> Option<String> {
    for key in ["website", "contact:website", "url"] {
        if let Some(value) = element.tag(key) {
            return Some(value.to_string());
        }
    }
    None
}

/// Which configured category an element falls under, or a derived
/// fallback from its primary tags.
pub fn classify_element(filters: &[CategoryFilter], element: &OsmElement) -> String {
    for filter in filters {
        let matched = filter.tags.iter().all(|(key, value)| {
            if value == "*" {
                element.tags.contains_key(key)
            } else {
                element.tag(key) == Some(value.as_str())
            }
        });
        if matched && !filter.category.starts_with("any_") {
            return filter.category.clone();
        }
    }
    fallback_category(element)
}

fn fallback_category(element: &OsmElement) -> String {
    if element.tags.contains_key("craft") {
        return "trades".to_string();
    }
    if element.tag("office") == Some("construction_company") {
        return "contractors".to_string();
    }
    match element.tag("amenity") {
        Some("restaurant" | "cafe" | "fast_food" | "food_court" | "bar" | "pub") => {
            return "food".to_string()
        }
        Some("clinic" | "hospital" | "doctors" | "dentist" | "pharmacy") => {
            return "health".to_string()
        }
        Some("school" | "college" | "university" | "kindergarten") => {
            return "education".to_string()
        }
        Some("bank" | "bureau_de_change" | "atm") => return "finance".to_string(),
        Some("fuel" | "car_wash" | "car_rental" | "car_repair") => return "auto".to_string(),
        _ => {}
    }
    if element.tags.contains_key("healthcare") {
        return "health".to_string();
    }
    if element.tags.contains_key("shop") {
        return "retail".to_string();
    }
    if element.tags.contains_key("tourism") {
        return "hospitality".to_string();
    }
    if element.tags.contains_key("office") {
        return "professional_services".to_string();
    }
    "other".to_string()
}

/// Import businesses for one area and a set of categories. Returns the
/// number of newly inserted businesses.
pub async fn import_area(
    pool: &PgPool,
    config: &'static Config,
    area: &AreaConfig,
    categories: &[CategoryConfig],
) -> Result<u64, ClassifyError> {
    let client = OverpassClient::new(&config.overpass_endpoint, config.overpass_timeout_secs)?;

    let filters: Vec<CategoryFilter> = categories
        .iter()
        .flat_map(|c| c.filters.iter().cloned())
        .collect();

    let run_id = jobs::start(pool, JOB_NAME, Some(&area.key), None).await?;
    let mut inserted: u64 = 0;

    let result = async {
        for chunk in filters.chunks(3) {
            let query = build_query(area, chunk, config.overpass_timeout_secs);
            let elements = client.run(&query).await?;
            if elements.is_empty() {
                continue;
            }

            let mut tx = pool.begin().await?;
            let city_id = cities::get_or_create(
                &mut tx,
                &area.name,
                area.country.as_deref(),
                area.region.as_deref(),
            )
            .await?;

            for element in &elements {
                let Some(name) = element.tag("name") else { continue };
                let (lat, lon) = element.location();
                let category = classify_element(&filters, element);
                let raw = json!(element.tags);

                let business_id = businesses::insert_imported(
                    &mut tx,
                    "osm",
                    &element.source_id(),
                    Some(name),
                    Some(&category),
                    extract_website(element).as_deref(),
                    extract_address(element).as_deref(),
                    lat,
                    lon,
                    Some(&raw),
                    Some(city_id),
                )
                .await?;

                let Some(business_id) = business_id else { continue };
                inserted += 1;

                let new_contacts: Vec<NewBusinessContact> = extract_osm_contacts(&element.tags)
                    .into_iter()
                    .map(|(contact_type, value)| NewBusinessContact {
                        business_id,
                        contact_type,
                        value,
                        source: Some("osm".to_string()),
                    })
                    .collect();
                contacts::insert_many(&mut tx, &new_contacts).await?;
            }
            tx.commit().await?;
        }
        Ok::<u64, ClassifyError>(inserted)
    }
    .await;

    match result {
        Ok(count) => {
            jobs::complete(pool, run_id, count as i64, None).await?;
            Ok(count)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tags: &[(&str, &str)]) -> OsmElement {
        serde_json::from_value(json!({
            "type": "node",
            "id": 1,
            "lat": 43.6,
            "lon": -79.4,
            "tags": tags.iter().cloned().collect::<HashMap<_, _>>(),
        }))
        .unwrap()
    }

    #[test]
    fn query_uses_bbox_when_present() {
        let area = AreaConfig {
            key: "toronto".into(),
            name: "Toronto".into(),
            country: Some("CA".into()),
            region: None,
            area_tags: HashMap::new(),
            bbox: Some(Bbox {
                min_lat: 43.5,
                min_lon: -79.6,
                max_lat: 43.9,
                max_lon: -79.1,
            }),
        };
        let filters = vec![CategoryFilter {
            category: "food".into(),
            tags: [("amenity".to_string(), "restaurant".to_string())].into(),
        }];
        let query = build_query(&area, &filters, 180);
        assert!(query.contains("[out:json][timeout:180];"));
        assert!(query.contains("nwr[\"name\"][\"amenity\"=\"restaurant\"](43.5,-79.6,43.9,-79.1);"));
        assert!(query.contains("out center tags;"));
        assert!(!query.contains("searchArea"));
    }

    #[test]
    fn query_uses_area_tags_without_bbox() {
        let area = AreaConfig {
            key: "dubai".into(),
            name: "Dubai".into(),
            country: Some("AE".into()),
            region: None,
            area_tags: [("name:en".to_string(), "Dubai".to_string())].into(),
            bbox: None,
        };
        let query = build_query(&area, &[], 60);
        assert!(query.contains("area[\"name:en\"=\"Dubai\"]->.searchArea;"));
    }

    #[test]
    fn wildcard_filter_emits_bare_key() {
        let filters = vec![CategoryFilter {
            category: "trades".into(),
            tags: [("craft".to_string(), "*".to_string())].into(),
        }];
        let area = AreaConfig {
            key: "x".into(),
            name: "X".into(),
            country: None,
            region: None,
            area_tags: [("name".to_string(), "X".to_string())].into(),
            bbox: None,
        };
        let query = build_query(&area, &filters, 60);
        assert!(query.contains("nwr[\"name\"][\"craft\"](area.searchArea);"));
    }

    #[test]
    fn address_prefers_addr_full() {
        let el = element(&[("addr:full", "1 Main St, Toronto")]);
        assert_eq!(extract_address(&el).as_deref(), Some("1 Main St, Toronto"));

        let el = element(&[
            ("addr:housenumber", "1"),
            ("addr:street", "Main St"),
            ("addr:city", "Toronto"),
        ]);
        assert_eq!(extract_address(&el).as_deref(), Some("1, Main St, Toronto"));
        assert_eq!(extract_address(&element(&[])), None);
    }

    #[test]
    fn website_tag_priority() {
        let el = element(&[("contact:website", "https://b.ca"), ("website", "https://a.ca")]);
        assert_eq!(extract_website(&el).as_deref(), Some("https://a.ca"));
    }

    #[test]
    fn fallback_categories_from_primary_tags() {
        assert_eq!(fallback_category(&element(&[("craft", "plumber")])), "trades");
        assert_eq!(
            fallback_category(&element(&[("amenity", "restaurant")])),
            "food"
        );
        assert_eq!(fallback_category(&element(&[("shop", "bakery")])), "retail");
        assert_eq!(
            fallback_category(&element(&[("office", "lawyer")])),
            "professional_services"
        );
        assert_eq!(fallback_category(&element(&[("name", "X")])), "other");
    }

    #[test]
    fn configured_filter_wins_over_fallback() {
        let filters = vec![CategoryFilter {
            category: "health".into(),
            tags: [("amenity".to_string(), "pharmacy".to_string())].into(),
        }];
        let el = element(&[("amenity", "pharmacy"), ("shop", "chemist")]);
        assert_eq!(classify_element(&filters, &el), "health");
    }
}
