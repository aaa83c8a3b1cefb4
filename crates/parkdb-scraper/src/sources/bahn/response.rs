//! Typed shapes of the DB Bahnpark API.
//!
//! Only fields the adapter reads are modelled. Nearly everything is
//! optional: the API omits blocks for facilities that lack them, and a
//! missing block must reject a single facility, never the listing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::normalize::normalize_decimal_comma;

/// A JSON value the API sends either as a number or as a string
/// (capacity totals, prices, coordinates).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(super) enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Non-negative integer value, if there is one.
    pub(super) fn as_count(&self) -> Option<u32> {
        match self {
            Scalar::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Scalar::Text(s) => {
                let s = s.trim();
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                s.parse().ok()
            }
        }
    }

    pub(super) fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            Scalar::Text(s) => Decimal::from_str(normalize_decimal_comma(s.trim()).as_ref()).ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PrognosisResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: Vec<PrognosisEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PrognosisEntry {
    pub occupancy: Option<Occupancy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Occupancy {
    #[serde(default)]
    pub valid_data: bool,
    pub time_segment: Option<String>,
    pub capacity: Option<Scalar>,
    pub vacancy_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Facility {
    pub id: Scalar,
    #[serde(default)]
    pub name: Vec<FacilityName>,
    #[serde(rename = "type")]
    pub facility_type: Option<FacilityType>,
    pub url: Option<String>,
    pub address: Option<Address>,
    /// Absent for facilities the operator publishes without capacity.
    pub capacity: Option<Vec<CapacityEntry>>,
    pub equipment: Option<Equipment>,
    #[serde(default)]
    pub has_prognosis: bool,
    pub access: Option<Access>,
    pub operator: Option<Operator>,
    pub tariff: Option<Tariff>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FacilityName {
    pub context: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct FacilityType {
    pub abbreviation: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Address {
    pub street_and_number: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Location {
    pub latitude: Option<Scalar>,
    pub longitude: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CapacityEntry {
    #[serde(rename = "type")]
    pub capacity_type: String,
    pub total: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Equipment {
    pub charging: Option<Charging>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Charging {
    #[serde(default)]
    pub has_charging_station: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Access {
    pub opening_hours: Option<OpeningHours>,
    pub out_of_service: Option<OutOfService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OpeningHours {
    #[serde(default)]
    pub is24h: bool,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OutOfService {
    #[serde(default)]
    pub is_out_of_service: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct Operator {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Tariff {
    #[serde(default)]
    pub prices: Vec<TariffPrice>,
    pub information: Option<TariffInformation>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TariffPrice {
    pub duration: String,
    pub price: Option<Scalar>,
    pub group: Option<TariffGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TariffGroup {
    pub group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TariffInformation {
    pub dynamic: Option<TariffDynamic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TariffDynamic {
    pub tariff_max_parking_time: Option<String>,
    pub tariff_notes: Option<String>,
}
