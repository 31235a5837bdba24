//! Observation records: one flat row per access point per capture cycle.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::normalize::{self, Fingerprinter};
use crate::parser::AccessPointGroup;

/// Column order of the tabular log. Matches the field order of
/// [`ObservationRecord`].
pub const COLUMNS: [&str; 13] = [
    "ts_utc",
    "ssid",
    "bssid_hash",
    "auth",
    "encryption",
    "signal_percent",
    "rssi_dbm_est",
    "radio_type",
    "band",
    "channel",
    "connected_stations",
    "channel_utilization_pct",
    "medium_available_capacity",
];

/// The persisted unit. `None` means the value was not present in the
/// report; it is never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(with = "rfc3339_micros")]
    pub ts_utc: DateTime<Utc>,
    pub ssid: String,
    pub bssid_hash: String,
    pub auth: Option<String>,
    pub encryption: Option<String>,
    pub signal_percent: Option<u8>,
    /// Estimated power in dBm, present exactly when `signal_percent` is.
    pub rssi_dbm_est: Option<f64>,
    pub radio_type: Option<String>,
    pub band: Option<String>,
    pub channel: Option<u16>,
    pub connected_stations: Option<u32>,
    pub channel_utilization_pct: Option<u8>,
    pub medium_available_capacity: Option<u32>,
}

impl ObservationRecord {
    pub fn from_group(
        group: &AccessPointGroup<'_>,
        fingerprinter: &Fingerprinter,
        ts_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            ts_utc,
            ssid: group.ssid.to_owned(),
            bssid_hash: fingerprinter.fingerprint(group.bssid),
            auth: group.auth.map(str::to_owned),
            encryption: group.encryption.map(str::to_owned),
            signal_percent: group.signal_percent,
            rssi_dbm_est: group.signal_percent.map(normalize::estimated_power),
            radio_type: group.radio_type.map(str::to_owned),
            band: group.band.map(str::to_owned),
            channel: group.channel,
            connected_stations: group.connected_stations,
            channel_utilization_pct: group.channel_utilization_pct,
            medium_available_capacity: group.medium_available_capacity,
        }
    }
}

/// Current UTC time at the precision the log stores (microseconds).
pub fn capture_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Turn parsed groups into records, in order, stamping each one with
/// `clock()` at the moment it is assembled.
///
/// No filtering or deduplication happens here. The first parse fault
/// aborts the batch.
pub fn assemble<'a, I, C>(
    groups: I,
    fingerprinter: &Fingerprinter,
    mut clock: C,
) -> Result<Vec<ObservationRecord>, IngestError>
where
    I: IntoIterator<Item = Result<AccessPointGroup<'a>, IngestError>>,
    C: FnMut() -> DateTime<Utc>,
{
    groups
        .into_iter()
        .map(|group| group.map(|g| ObservationRecord::from_group(&g, fingerprinter, clock())))
        .collect()
}

mod rfc3339_micros {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_report;
    use chrono::TimeZone;

    fn fixed_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 8, 30, 0).unwrap()
    }

    fn group(signal: Option<u8>) -> AccessPointGroup<'static> {
        AccessPointGroup {
            ssid: "CoffeeHouse",
            auth: Some("WPA2-Personal"),
            bssid: "10:7c:61:df:7a:d2",
            signal_percent: signal,
            ..Default::default()
        }
    }

    #[test]
    fn test_columns_match_field_order() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let fp = Fingerprinter::new("salt");
        wtr.serialize(ObservationRecord::from_group(&group(Some(50)), &fp, fixed_ts()))
            .unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let header = data.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(","));
    }

    #[test]
    fn test_power_present_iff_signal_present() {
        let fp = Fingerprinter::new("salt");
        let with = ObservationRecord::from_group(&group(Some(60)), &fp, fixed_ts());
        assert_eq!(with.rssi_dbm_est, Some(-70.0));
        let without = ObservationRecord::from_group(&group(None), &fp, fixed_ts());
        assert_eq!(without.signal_percent, None);
        assert_eq!(without.rssi_dbm_est, None);
    }

    #[test]
    fn test_bssid_is_fingerprinted() {
        let fp = Fingerprinter::new("salt");
        let rec = ObservationRecord::from_group(&group(None), &fp, fixed_ts());
        assert_eq!(rec.bssid_hash, fp.fingerprint("10:7c:61:df:7a:d2"));
        assert!(!rec.bssid_hash.contains(':'));
    }

    #[test]
    fn test_assemble_stamps_each_record() {
        let text = "
SSID 1 : Net
    BSSID 1 : aa:bb:cc:dd:ee:01
    BSSID 2 : aa:bb:cc:dd:ee:02
";
        let mut ticks = 0;
        let records = assemble(parse_report(text), &Fingerprinter::new("s"), || {
            ticks += 1;
            fixed_ts() + chrono::Duration::seconds(ticks)
        })
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ts_utc, fixed_ts() + chrono::Duration::seconds(1));
        assert_eq!(records[1].ts_utc, fixed_ts() + chrono::Duration::seconds(2));
        assert_ne!(records[0].bssid_hash, records[1].bssid_hash);
    }

    #[test]
    fn test_assemble_full_report() {
        let text = "
SSID 1 : CoffeeHouse
    Authentication          : WPA2-Personal
    Encryption              : CCMP
    BSSID 1                 : 10:7c:61:df:7a:d2
         Signal             : 81%
         Radio type         : 802.11ax
         Band               : 5 GHz
         Channel            : 36
         Bss Load:
             Connected Stations:        5
             Channel Utilization:       12 (4 %)
             Medium Available Capacity: 31250
";
        let fp = Fingerprinter::new("s");
        let records = assemble(parse_report(text), &fp, fixed_ts).unwrap();
        assert_eq!(
            records,
            vec![ObservationRecord {
                ts_utc: fixed_ts(),
                ssid: "CoffeeHouse".into(),
                bssid_hash: fp.fingerprint("10:7c:61:df:7a:d2"),
                auth: Some("WPA2-Personal".into()),
                encryption: Some("CCMP".into()),
                signal_percent: Some(81),
                rssi_dbm_est: Some(-59.5),
                radio_type: Some("802.11ax".into()),
                band: Some("5 GHz".into()),
                channel: Some(36),
                connected_stations: Some(5),
                channel_utilization_pct: Some(4),
                medium_available_capacity: Some(31250),
            }]
        );
    }

    #[test]
    fn test_assemble_propagates_parse_fault() {
        let text = "
SSID 1 : Net
    BSSID 1 : aa:bb:cc:dd:ee:01
         Channel : 700000
";
        let err = assemble(parse_report(text), &Fingerprinter::new("s"), fixed_ts).unwrap_err();
        assert!(matches!(err, IngestError::Parse { field: "channel", .. }));
    }

    #[test]
    fn test_capture_time_has_microsecond_precision() {
        assert_eq!(capture_time().timestamp_subsec_nanos() % 1_000, 0);
    }
}
