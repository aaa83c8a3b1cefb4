//! Conversion of Bahnpark facilities and prognoses into canonical records.

use chrono::{DateTime, Utc};
use parkdb_core::{lot_id, LotData, LotInfo, LotStatus, OPEN_24_7};
use serde_json::Value;

use super::response::{Facility, PrognosisResponse, Scalar};
use super::{
    prognosis_url, BOUNDS, FEE_DURATIONS, LOT_ID_PREFIX, LOT_TYPES, OPENING_HOURS_RULES,
    VACANCY_BUCKETS,
};
use crate::batch::RecordError;
use crate::error::ScraperError;
use crate::normalize::{
    clean_opening_hours, map_lot_type, parse_utc_timestamp, render_fee_description, FeePrice,
};
use crate::status::derive_occupancy;
use crate::validate::{check_lot_data, check_lot_info, RecordValidationError};

const NAME_CONTEXT_DISPLAY: &str = "DISPLAY";
const CAPACITY_PARKING: &str = "PARKING";
const CAPACITY_HANDICAPPED: &str = "HANDICAPPED_PARKING";

/// Splits the listing into raw facility nodes.
///
/// # Errors
///
/// Returns [`ScraperError::MissingContainer`] when `_embedded` is absent or
/// not an array.
pub(super) fn embedded_facilities(body: Value, url: &str) -> Result<Vec<Value>, ScraperError> {
    match body {
        Value::Object(mut map) => match map.remove("_embedded") {
            Some(Value::Array(facilities)) => Ok(facilities),
            _ => Err(missing_embedded(url)),
        },
        _ => Err(missing_embedded(url)),
    }
}

fn missing_embedded(url: &str) -> ScraperError {
    ScraperError::MissingContainer {
        url: url.to_string(),
        container: "_embedded".to_string(),
    }
}

/// The provider's own id of a raw facility node, for error reporting.
#[must_use]
pub fn facility_id(facility: &Value) -> Option<String> {
    match facility.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_text(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Number(n) => n.to_string(),
        Scalar::Text(s) => s.trim().to_string(),
    }
}

/// Converts one facility node into a [`LotInfo`].
///
/// Facilities that are out of service or publish no capacity are
/// [`RecordError::Ignored`].
pub(super) fn lot_info_from_facility(node: Value, base_url: &str) -> Result<LotInfo, RecordError> {
    let facility: Facility = serde_json::from_value(node).map_err(|e| {
        RecordValidationError::single("facility", format!("unexpected shape: {e}"))
    })?;
    let raw_id = scalar_text(&facility.id);

    let out_of_service = facility
        .access
        .as_ref()
        .and_then(|a| a.out_of_service.as_ref())
        .is_some_and(|o| o.is_out_of_service);
    if out_of_service {
        tracing::warn!(uid = %raw_id, "facility is out of service, skipping");
        return Err(RecordError::Ignored("facility is out of service".to_string()));
    }
    let Some(capacities) = facility.capacity.as_deref() else {
        tracing::warn!(uid = %raw_id, "facility has no capacity, skipping");
        return Err(RecordError::Ignored("facility has no capacity".to_string()));
    };

    let name = facility
        .name
        .iter()
        .find(|n| n.context.as_deref() == Some(NAME_CONTEXT_DISPLAY))
        .or_else(|| facility.name.first())
        .map(|n| n.name.trim().to_string())
        .unwrap_or_default();

    let capacity_of = |kind: &str| {
        capacities
            .iter()
            .filter(|c| c.capacity_type == kind)
            .find_map(|c| c.total.as_ref().and_then(Scalar::as_count))
    };

    let prices: Vec<FeePrice> = facility
        .tariff
        .as_ref()
        .map(|t| {
            t.prices
                .iter()
                .map(|p| FeePrice {
                    duration: p.duration.clone(),
                    price: p.price.as_ref().and_then(Scalar::as_decimal),
                    group: p
                        .group
                        .as_ref()
                        .and_then(|g| g.group_name.clone())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();
    let fee_description = render_fee_description(&prices, FEE_DURATIONS)?;
    let dynamic = facility
        .tariff
        .as_ref()
        .and_then(|t| t.information.as_ref())
        .and_then(|i| i.dynamic.as_ref());

    let opening_hours = facility
        .access
        .as_ref()
        .and_then(|a| a.opening_hours.as_ref())
        .map(|hours| {
            if hours.is24h {
                OPEN_24_7.to_string()
            } else {
                clean_opening_hours(hours.text.as_deref().unwrap_or_default(), OPENING_HOURS_RULES)
            }
        })
        .filter(|h| !h.is_empty());

    let location = facility.address.as_ref().and_then(|a| a.location.as_ref());

    let mut lot = LotInfo::new(lot_id(LOT_ID_PREFIX, &raw_id), name);
    lot.lot_type = facility.facility_type.as_ref().and_then(|t| {
        t.abbreviation
            .as_deref()
            .and_then(|code| map_lot_type(code, LOT_TYPES))
            .or_else(|| t.name.as_deref().and_then(|name| map_lot_type(name, LOT_TYPES)))
    });
    lot.public_url = facility.url.clone().filter(|u| !u.is_empty());
    lot.source_url = Some(prognosis_url(base_url, &raw_id));
    lot.address = facility.address.as_ref().map(|a| {
        format!(
            "{}, {} {}",
            a.street_and_number.as_deref().unwrap_or_default(),
            a.zip.as_deref().unwrap_or_default(),
            a.city.as_deref().unwrap_or_default()
        )
    });
    lot.capacity = capacity_of(CAPACITY_PARKING);
    lot.capacity_disabled = capacity_of(CAPACITY_HANDICAPPED);
    lot.capacity_charging = facility
        .equipment
        .as_ref()
        .and_then(|e| e.charging.as_ref())
        .map(|c| u32::from(c.has_charging_station));
    lot.has_live_capacity = facility.has_prognosis;
    lot.latitude = location
        .and_then(|l| l.latitude.as_ref())
        .and_then(Scalar::as_decimal);
    lot.longitude = location
        .and_then(|l| l.longitude.as_ref())
        .and_then(Scalar::as_decimal);
    lot.opening_hours = opening_hours;
    lot.operator = facility.operator.as_ref().and_then(|o| o.name.clone());
    lot.has_fee = Some(!fee_description.is_empty());
    lot.fee_description = Some(fee_description).filter(|f| !f.is_empty());
    lot.max_stay = dynamic.and_then(|d| d.tariff_max_parking_time.clone());
    lot.park_ride = Some(true);
    lot.description = dynamic.and_then(|d| d.tariff_notes.clone());

    check_lot_info(&lot, Some(BOUNDS))?;
    Ok(lot)
}

/// Converts a facility's prognosis response into a [`LotData`] observation.
///
/// A response without `_embedded[0].occupancy` rejects only this lot.
pub(super) fn lot_data_from_prognosis(
    id: String,
    body: Value,
    now: DateTime<Utc>,
) -> Result<LotData, RecordError> {
    let response: PrognosisResponse = serde_json::from_value(body).map_err(|e| {
        RecordValidationError::single("prognosis", format!("unexpected shape: {e}"))
    })?;
    let occupancy = response
        .embedded
        .into_iter()
        .next()
        .and_then(|entry| entry.occupancy)
        .ok_or_else(|| RecordValidationError::single("_embedded[0].occupancy", "missing"))?;

    let derived = derive_occupancy(
        occupancy.valid_data,
        occupancy.vacancy_text.as_deref(),
        VACANCY_BUCKETS,
    );
    if occupancy.valid_data && occupancy.vacancy_text.is_none() {
        tracing::warn!(uid = %id, "valid prognosis without vacancy text");
    }
    // `error` status already marks the record; `nodata` would hide the text.
    if let Some(err) = derived
        .unrecognized
        .filter(|_| derived.status == LotStatus::Nodata)
    {
        return Err(err.into());
    }

    let data = LotData {
        id,
        timestamp: now,
        lot_timestamp: occupancy.time_segment.as_deref().and_then(parse_utc_timestamp),
        status: derived.status,
        num_free: derived.num_free,
        capacity: occupancy.capacity.as_ref().and_then(Scalar::as_count),
    };
    check_lot_data(&data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use parkdb_core::{LotStatus, LotType};
    use serde_json::json;

    use super::*;

    const BASE: &str = "https://api.example.com/parking-facilities";

    fn facility() -> Value {
        json!({
            "id": 4711,
            "name": [
                {"context": "NAME", "name": "P+R Hauptbahnhof Süd"},
                {"context": "DISPLAY", "name": "Hauptbahnhof Süd"}
            ],
            "type": {"abbreviation": "PH", "name": "Parkhaus"},
            "url": "https://www.dbbahnpark.de/4711",
            "address": {
                "streetAndNumber": "Arnulf-Klett-Platz 2",
                "zip": "70173",
                "city": "Stuttgart",
                "location": {"latitude": 48.7838, "longitude": 9.1815}
            },
            "capacity": [
                {"type": "PARKING", "total": "250"},
                {"type": "HANDICAPPED_PARKING", "total": "6"},
                {"type": "BIKE_PARKING", "total": "k.A."}
            ],
            "equipment": {"charging": {"hasChargingStation": true}},
            "hasPrognosis": true,
            "access": {
                "openingHours": {"is24h": false, "text": "Mo-Fr: 06:00 - 22:00 Uhr, So+F geschlossen. Ausfahrt jederzeit"},
                "outOfService": {"isOutOfService": false}
            },
            "operator": {"name": "DB BahnPark GmbH"},
            "tariff": {
                "prices": [
                    {"duration": "1hour", "price": 2, "group": {"groupName": "standard"}},
                    {"duration": "1day", "price": 15.5, "group": {"groupName": "standard"}},
                    {"duration": "1week", "price": null, "group": {"groupName": "standard"}},
                    {"duration": "1day", "price": 9, "group": {"groupName": "bahncard"}}
                ],
                "information": {"dynamic": {"tariffMaxParkingTime": "7 Tage", "tariffNotes": "Nur mit Parkschein"}}
            }
        })
    }

    #[test]
    fn facility_maps_to_lot_info() {
        let lot = lot_info_from_facility(facility(), BASE).unwrap();
        assert_eq!(lot.id, "db-4711");
        assert_eq!(lot.name, "Hauptbahnhof Süd");
        assert_eq!(lot.lot_type, Some(LotType::CarPark));
        assert_eq!(
            lot.source_url.as_deref(),
            Some("https://api.example.com/parking-facilities/4711/prognoses")
        );
        assert_eq!(lot.address.as_deref(), Some("Arnulf-Klett-Platz 2, 70173 Stuttgart"));
        assert_eq!(lot.capacity, Some(250));
        assert_eq!(lot.capacity_disabled, Some(6));
        assert_eq!(lot.capacity_charging, Some(1));
        assert!(lot.has_live_capacity);
        assert_eq!(lot.latitude, Some("48.7838".parse().unwrap()));
        assert_eq!(lot.opening_hours.as_deref(), Some("Mo-Fr 06:00-22:00"));
        assert_eq!(
            lot.fee_description.as_deref(),
            Some("1 Stunde: 2.00€, 1 Tag: 15.50€")
        );
        assert_eq!(lot.has_fee, Some(true));
        assert_eq!(lot.max_stay.as_deref(), Some("7 Tage"));
        assert_eq!(lot.description.as_deref(), Some("Nur mit Parkschein"));
        assert_eq!(lot.park_ride, Some(true));
    }

    #[test]
    fn always_open_facility_uses_sentinel() {
        let mut node = facility();
        node["access"]["openingHours"] = json!({"is24h": true});
        let lot = lot_info_from_facility(node, BASE).unwrap();
        assert_eq!(lot.opening_hours.as_deref(), Some(OPEN_24_7));
    }

    #[test]
    fn name_falls_back_to_first_entry() {
        let mut node = facility();
        node["name"] = json!([{"context": "NAME", "name": "Parkhaus Nord"}]);
        let lot = lot_info_from_facility(node, BASE).unwrap();
        assert_eq!(lot.name, "Parkhaus Nord");
    }

    #[test]
    fn unknown_type_code_maps_to_none() {
        let mut node = facility();
        node["type"] = json!({"abbreviation": "XYZ", "name": "Sonstiges"});
        let lot = lot_info_from_facility(node, BASE).unwrap();
        assert_eq!(lot.lot_type, None);
    }

    #[test]
    fn out_of_service_facility_is_ignored() {
        let mut node = facility();
        node["access"]["outOfService"]["isOutOfService"] = json!(true);
        let err = lot_info_from_facility(node, BASE).unwrap_err();
        assert!(matches!(err, RecordError::Ignored(_)), "got: {err:?}");
    }

    #[test]
    fn facility_without_capacity_is_ignored() {
        let mut node = facility();
        node.as_object_mut().unwrap().remove("capacity");
        let err = lot_info_from_facility(node, BASE).unwrap_err();
        assert!(matches!(err, RecordError::Ignored(_)), "got: {err:?}");
    }

    #[test]
    fn unknown_fee_duration_is_a_configuration_error() {
        let mut node = facility();
        node["tariff"]["prices"] =
            json!([{"duration": "1fortnight", "price": 30, "group": {"groupName": "standard"}}]);
        let err = lot_info_from_facility(node, BASE).unwrap_err();
        assert!(matches!(err, RecordError::Configuration(_)), "got: {err:?}");
    }

    #[test]
    fn coordinates_outside_germany_are_rejected() {
        let mut node = facility();
        node["address"]["location"] = json!({"latitude": 40.4168, "longitude": -3.7038});
        let err = lot_info_from_facility(node, BASE).unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)), "got: {err:?}");
    }

    #[test]
    fn missing_embedded_is_structural() {
        let err = embedded_facilities(json!({"count": 0}), BASE).unwrap_err();
        assert!(matches!(err, ScraperError::MissingContainer { .. }), "got: {err:?}");
        assert_eq!(embedded_facilities(json!({"_embedded": []}), BASE).unwrap().len(), 0);
    }

    #[test]
    fn facility_id_accepts_numbers_and_strings() {
        assert_eq!(facility_id(&json!({"id": 12})), Some("12".to_string()));
        assert_eq!(facility_id(&json!({"id": "A7"})), Some("A7".to_string()));
        assert_eq!(facility_id(&json!({})), None);
    }

    #[test]
    fn prognosis_with_bucket_is_open() {
        let body = json!({"_embedded": [{"occupancy": {
            "validData": true,
            "timeSegment": "2024-03-12T10:15:00Z",
            "capacity": 250,
            "vacancyText": ">50"
        }}]});
        let data = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap();
        assert_eq!(data.status, LotStatus::Open);
        assert_eq!(data.num_free, Some(51));
        assert_eq!(data.capacity, Some(250));
        assert!(data.lot_timestamp.is_some());
    }

    #[test]
    fn prognosis_without_vacancy_is_error_status() {
        let body = json!({"_embedded": [{"occupancy": {"validData": true, "capacity": 250}}]});
        let data = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap();
        assert_eq!(data.status, LotStatus::Error);
        assert_eq!(data.num_free, None);
    }

    #[test]
    fn prognosis_without_valid_data_is_nodata() {
        let body = json!({"_embedded": [{"occupancy": {"validData": false}}]});
        let data = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap();
        assert_eq!(data.status, LotStatus::Nodata);
    }

    #[test]
    fn unknown_vacancy_without_valid_data_is_a_normalization_error() {
        let body = json!({"_embedded": [{"occupancy": {
            "validData": false, "vacancyText": "ca. 40"
        }}]});
        let err = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap_err();
        assert!(matches!(err, RecordError::UnknownBucket(_)), "got: {err:?}");
    }

    #[test]
    fn unknown_vacancy_with_valid_data_is_error_status() {
        let body = json!({"_embedded": [{"occupancy": {
            "validData": true, "vacancyText": "ca. 40"
        }}]});
        let data = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap();
        assert_eq!(data.status, LotStatus::Error);
        assert_eq!(data.num_free, None);
    }

    #[test]
    fn prognosis_without_occupancy_is_a_validation_error() {
        let err = lot_data_from_prognosis("db-4711".to_string(), json!({"_embedded": []}), Utc::now())
            .unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)), "got: {err:?}");
    }

    #[test]
    fn bucket_above_capacity_is_rejected() {
        let body = json!({"_embedded": [{"occupancy": {
            "validData": true, "capacity": 20, "vacancyText": ">30"
        }}]});
        let err = lot_data_from_prognosis("db-4711".to_string(), body, Utc::now()).unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)), "got: {err:?}");
    }
}
