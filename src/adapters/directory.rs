use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::models::StationMetadata;

pub const DEFAULT_BASE_URL: &str = "https://services.drova.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const FREE_TRIAL_GROUP: &str = "free trial volunteers";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ServerInfoPayload {
    uuid: Option<String>,
    name: Option<String>,
    city_name: Option<String>,
    product_list: Option<Vec<serde_json::Value>>,
    groups_list: Option<Vec<String>>,
    longitude: Option<f64>,
    latitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProcessorPayload {
    manufacturer: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GraphicCardPayload {
    name: Option<String>,
    ram_bytes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct HardwarePayload {
    processor: Option<ProcessorPayload>,
    ram_bytes: Option<i64>,
    graphic: Option<Vec<GraphicCardPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductPayload {
    #[serde(rename = "productId")]
    product_id: Option<i64>,
    title: Option<String>,
}

/// Blocking client for the public station/product directory endpoints.
/// Results are meant to be persisted into the sqlite directory cache by the
/// sync job; the pipeline itself never talks to the network.
pub struct DirectoryClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DirectoryError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Product id to title dictionary from the product manager.
    pub fn fetch_product_titles(&self) -> Result<BTreeMap<i64, String>, DirectoryError> {
        let url = format!("{}/product-manager/product/listfull2", self.base_url);
        let payload: Vec<ProductPayload> = self.get_json(&url)?;

        let mut titles = BTreeMap::new();
        for product in payload {
            if let (Some(product_id), Some(title)) = (product.product_id, product.title) {
                titles.insert(product_id, title);
            }
        }

        Ok(titles)
    }

    /// Server info and hardware detail for one station, merged into a
    /// metadata record. Returns `None` when the server endpoint has no
    /// payload for the id (station unknown to the directory).
    pub fn fetch_station_metadata(
        &self,
        station_id: &str,
    ) -> Result<Option<StationMetadata>, DirectoryError> {
        let server_url = format!(
            "{}/server-manager/servers/public/{station_id}",
            self.base_url
        );
        let Some(server) = self.try_get_json::<ServerInfoPayload>(&server_url)? else {
            return Ok(None);
        };
        if server.uuid.as_deref().is_none_or(str::is_empty) {
            return Ok(None);
        }

        let hardware_url = format!(
            "{}/server-manager/hardware/list/{station_id}",
            self.base_url
        );
        let hardware = self
            .try_get_json::<HardwarePayload>(&hardware_url)?
            .unwrap_or_default();

        Ok(Some(merge_payloads(station_id, server, hardware)))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, DirectoryError> {
        let response = self
            .http
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|source| DirectoryError::Request {
                url: url.to_string(),
                source,
            })?;

        response.json().map_err(|source| DirectoryError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Like `get_json` but maps an HTTP error status to `None`: a missing
    /// station must not abort a whole sync run.
    fn try_get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, DirectoryError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|source| DirectoryError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Ok(None);
        }

        match response.json() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Ok(None),
        }
    }
}

fn merge_payloads(
    station_id: &str,
    server: ServerInfoPayload,
    hardware: HardwarePayload,
) -> StationMetadata {
    let free_trial = server.groups_list.as_ref().map(|groups| {
        groups
            .iter()
            .any(|group| group.trim().eq_ignore_ascii_case(FREE_TRIAL_GROUP))
    });

    let processor = hardware.processor.and_then(|processor| {
        let manufacturer = processor.manufacturer.unwrap_or_default();
        let version = processor.version.unwrap_or_default();
        let combined = [manufacturer.trim(), version.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if combined.is_empty() { None } else { Some(combined) }
    });

    let mut graphic_names = Vec::new();
    let mut graphic_ram_bytes = 0_i64;
    for card in hardware.graphic.unwrap_or_default() {
        if let Some(name) = card.name
            && !name.trim().is_empty()
        {
            graphic_names.push(name);
        }
        graphic_ram_bytes += card.ram_bytes.unwrap_or(0);
    }

    StationMetadata {
        station_id: station_id.to_string(),
        name: server.name,
        city: server.city_name,
        processor,
        graphic_names: if graphic_names.is_empty() {
            None
        } else {
            Some(graphic_names.join(", "))
        },
        free_trial,
        product_count: server
            .product_list
            .map(|products| products.len() as i64),
        ram_bytes: hardware.ram_bytes,
        graphic_ram_bytes: if graphic_ram_bytes > 0 {
            Some(graphic_ram_bytes)
        } else {
            None
        },
        longitude: server.longitude,
        latitude: server.latitude,
    }
}

#[cfg(test)]
mod tests {
    use super::{HardwarePayload, ServerInfoPayload, merge_payloads};

    fn server_payload(json: &str) -> ServerInfoPayload {
        serde_json::from_str(json).expect("server payload should parse")
    }

    fn hardware_payload(json: &str) -> HardwarePayload {
        serde_json::from_str(json).expect("hardware payload should parse")
    }

    #[test]
    fn merges_server_and_hardware_payloads() {
        let server = server_payload(
            r#"{
                "uuid": "st-a",
                "name": "Aurora-01",
                "city_name": "Kazan",
                "product_list": [{}, {}, {}],
                "groups_list": ["Free Trial Volunteers"],
                "longitude": 49.1,
                "latitude": 55.8
            }"#,
        );
        let hardware = hardware_payload(
            r#"{
                "processor": {"manufacturer": "AMD", "version": "Ryzen 7 5800X"},
                "ram_bytes": 34359738368,
                "graphic": [
                    {"name": "RTX 3080", "ram_bytes": 10737418240},
                    {"name": "RTX 3060", "ram_bytes": 12884901888}
                ]
            }"#,
        );

        let metadata = merge_payloads("st-a", server, hardware);

        assert_eq!(metadata.name.as_deref(), Some("Aurora-01"));
        assert_eq!(metadata.city.as_deref(), Some("Kazan"));
        assert_eq!(metadata.processor.as_deref(), Some("AMD Ryzen 7 5800X"));
        assert_eq!(metadata.graphic_names.as_deref(), Some("RTX 3080, RTX 3060"));
        assert_eq!(metadata.graphic_ram_bytes, Some(23_622_320_128));
        assert_eq!(metadata.free_trial, Some(true));
        assert_eq!(metadata.product_count, Some(3));
        assert_eq!(metadata.ram_bytes, Some(34_359_738_368));
    }

    #[test]
    fn missing_hardware_fields_stay_null() {
        let server = server_payload(r#"{"uuid": "st-a", "name": "Aurora-01"}"#);
        let hardware = hardware_payload("{}");

        let metadata = merge_payloads("st-a", server, hardware);

        assert_eq!(metadata.processor, None);
        assert_eq!(metadata.graphic_names, None);
        assert_eq!(metadata.graphic_ram_bytes, None);
        assert_eq!(metadata.ram_bytes, None);
        assert_eq!(metadata.product_count, None);
        assert_eq!(metadata.free_trial, None);
    }

    #[test]
    fn free_trial_requires_the_exact_group() {
        let server = server_payload(
            r#"{"uuid": "st-a", "groups_list": ["Enthusiasts", "Beta Testers"]}"#,
        );

        let metadata = merge_payloads("st-a", server, hardware_payload("{}"));

        assert_eq!(metadata.free_trial, Some(false));
    }

    #[test]
    fn processor_name_drops_blank_components() {
        let hardware = hardware_payload(
            r#"{"processor": {"manufacturer": "  ", "version": "Core i5-12400F"}}"#,
        );

        let metadata = merge_payloads("st-a", server_payload(r#"{"uuid": "st-a"}"#), hardware);

        assert_eq!(metadata.processor.as_deref(), Some("Core i5-12400F"));
    }
}
