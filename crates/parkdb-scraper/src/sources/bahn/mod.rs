//! Deutsche Bahn parking facilities (DB Bahnpark API).
//!
//! Static data comes from one listing request; live occupancy needs one
//! prognosis request per facility, so only facilities with a prognosis in
//! the configured postal-code area are polled.

mod parse;
mod response;

use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use parkdb_core::{
    AppConfig, BahnCredentials, ImportSourceResult, LotData, LotInfo, LotType, PoolInfo,
    SourceConfig,
};

use super::{SourceAdapter, SourceFuture};
use crate::batch::{aggregate, aggregate_unique};
use crate::client::{join_url, HttpClient};
use crate::error::ScraperError;
use crate::normalize::HoursRule;
use crate::validate::GeoBounds;

pub use parse::facility_id;

pub const SOURCE_ID: &str = "bahn";
pub const DEFAULT_BASE_URL: &str = "https://apis.deutschebahn.com/db-api-marketplace/apis/parking-information/db-bahnpark/v2/parking-facilities";
pub const DEFAULT_POSTAL_CODE_PREFIX: &str = "7";
const LOT_ID_PREFIX: &str = "db";
const LISTING_TIMEOUT_SECS: u64 = 60;

/// Coarse vacancy buckets. The API publishes ranges, not counts; each bucket
/// maps to the smallest count it covers.
pub(crate) const VACANCY_BUCKETS: &[(&str, u32)] =
    &[("bis 10", 5), (">10", 11), (">30", 31), (">50", 51)];

pub(crate) const FEE_DURATIONS: &[(&str, &str)] = &[
    ("20min", "20 Minuten"),
    ("30min", "30 Minuten"),
    ("1hour", "1 Stunde"),
    ("1day", "1 Tag"),
    ("1dayDiscount", "1 Tag rabattiert"),
    ("1week", "1 Woche"),
    ("1weekDiscount", "1 Woche rabattiert"),
    ("1monthVendingMachine", "1 Monat (am Automaten)"),
    ("1monthLongTerm", "1 Monat Dauerparken (mind. 3 Monate)"),
    ("1monthReservation", "1 Monat Dauerparken (fester Stellplatz)"),
];

pub(crate) const LOT_TYPES: &[(&str, LotType)] = &[
    ("Parkhaus", LotType::CarPark),
    ("PH", LotType::CarPark),
    ("Parkplatz", LotType::OffStreetParkingGround),
    ("PP", LotType::OffStreetParkingGround),
    ("Tiefgarage", LotType::Underground),
    ("TG", LotType::Underground),
    ("P+R", LotType::ParkAndRide),
];

/// Turns e.g. `"Mo-Fr: 06:00 - 22:00 Uhr, So+F geschlossen."` into
/// `"Mo-Fr 06:00-22:00"`.
pub(crate) const OPENING_HOURS_RULES: &[HoursRule] = &[
    HoursRule::TruncateAt("."),
    HoursRule::TruncateAt(", Ausfahrt"),
    HoursRule::Replace(": ", " "),
    HoursRule::Replace(" Uhr", ""),
    HoursRule::Replace(", Sa,So+F geschlossen", ""),
    HoursRule::Replace(", So+F geschlossen", ""),
    HoursRule::Replace(" - ", "-"),
];

/// Germany, generously.
pub(crate) const BOUNDS: GeoBounds = GeoBounds {
    min_latitude: 47,
    max_latitude: 56,
    min_longitude: 5,
    max_longitude: 16,
};

/// Per-source settings for [`BahnSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BahnOptions {
    pub base_url: String,
    pub postal_code_prefix: String,
    pub listing_timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl Default for BahnOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            postal_code_prefix: DEFAULT_POSTAL_CODE_PREFIX.to_string(),
            listing_timeout: Duration::from_secs(LISTING_TIMEOUT_SECS),
            max_concurrent_requests: 4,
        }
    }
}

impl BahnOptions {
    /// `location` overrides the API base URL; `timeout_secs` the listing timeout.
    #[must_use]
    pub fn from_source_config(source: &SourceConfig, config: &AppConfig) -> Self {
        let defaults = Self::default();
        Self {
            base_url: source.location.clone().unwrap_or(defaults.base_url),
            postal_code_prefix: source
                .postal_code_prefix
                .clone()
                .unwrap_or(defaults.postal_code_prefix),
            listing_timeout: source
                .timeout_secs
                .map_or(defaults.listing_timeout, Duration::from_secs),
            max_concurrent_requests: config.scraper_max_concurrent_requests.max(1),
        }
    }
}

pub struct BahnSource {
    pool: PoolInfo,
    client: HttpClient,
    credentials: BahnCredentials,
    options: BahnOptions,
}

impl BahnSource {
    #[must_use]
    pub fn new(client: HttpClient, credentials: BahnCredentials, options: BahnOptions) -> Self {
        let pool = PoolInfo {
            id: SOURCE_ID.to_string(),
            name: "DB Bahnpark".to_string(),
            public_url: "https://data.deutschebahn.com/dataset/api-parkplatz.html".to_string(),
            source_url: Some(options.base_url.clone()),
            timezone: "Europe/Berlin".to_string(),
            attribution_license: Some("Proprietary Licence DB Bahnpark GmbH".to_string()),
            attribution_contributor: Some("DB Bahnpark GmbH".to_string()),
        };
        Self {
            pool,
            client,
            credentials,
            options,
        }
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("DB-Client-Id", self.credentials.client_id.as_str()),
            ("DB-Api-Key", self.credentials.api_key.as_str()),
        ]
    }

    async fn lot_infos(&self) -> Result<ImportSourceResult<LotInfo>, ScraperError> {
        let url = &self.options.base_url;
        let body = self
            .client
            .get_json(url, &self.headers(), Some(self.options.listing_timeout))
            .await?;
        let facilities = parse::embedded_facilities(body, url)?;
        tracing::debug!(source = SOURCE_ID, count = facilities.len(), "fetched facility listing");

        aggregate_unique(
            facilities,
            facility_id,
            |facility| parse::lot_info_from_facility(facility, url),
            |lot: &LotInfo| lot.id.as_str(),
        )
    }

    async fn lot_data(&self) -> Result<ImportSourceResult<LotData>, ScraperError> {
        let lots = self.lot_infos().await?.items;
        let area = format!(", {}", self.options.postal_code_prefix);

        let selected: Vec<(String, String)> = lots
            .into_iter()
            .filter_map(|lot| {
                if !lot.has_live_capacity {
                    tracing::debug!(source = SOURCE_ID, uid = %lot.id, "no realtime data, skipping");
                    return None;
                }
                if !lot.address.as_deref().is_some_and(|a| a.contains(&area)) {
                    tracing::debug!(source = SOURCE_ID, uid = %lot.id, %area, "outside postal code area, skipping");
                    return None;
                }
                lot.source_url.map(|url| (lot.id, url))
            })
            .collect();

        let headers = self.headers();
        let prognoses: Vec<(String, serde_json::Value)> = stream::iter(selected)
            .map(|(id, url)| {
                let headers = &headers;
                async move {
                    let body = self.client.get_json(&url, headers, None).await?;
                    Ok::<_, ScraperError>((id, body))
                }
            })
            .buffered(self.options.max_concurrent_requests)
            .try_collect()
            .await?;
        tracing::debug!(source = SOURCE_ID, count = prognoses.len(), "fetched prognoses");

        let now = Utc::now();
        aggregate(
            prognoses,
            |(id, _): &(String, serde_json::Value)| Some(id.clone()),
            |(id, body)| parse::lot_data_from_prognosis(id, body, now),
        )
    }
}

/// Per-facility prognosis endpoint.
pub(crate) fn prognosis_url(base_url: &str, raw_id: &str) -> String {
    join_url(base_url, &format!("{raw_id}/prognoses"))
}

impl SourceAdapter for BahnSource {
    fn pool(&self) -> &PoolInfo {
        &self.pool
    }

    fn fetch_lot_infos(&self) -> SourceFuture<'_, ImportSourceResult<LotInfo>> {
        Box::pin(self.lot_infos())
    }

    fn fetch_lot_data(&self) -> SourceFuture<'_, ImportSourceResult<LotData>> {
        Box::pin(self.lot_data())
    }
}
