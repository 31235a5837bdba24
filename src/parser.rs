//! `netsh wlan show networks mode=bssid` report parsing.
//!
//! The report is loosely hierarchical:
//!
//! ```text
//! SSID 1 : CoffeeHouse                      <- network marker
//!     Authentication          : WPA2-Personal
//!     Encryption              : CCMP
//!     BSSID 1                 : 10:7c:61:df:7a:d2   <- access-point marker
//!          Signal             : 81%
//!          Channel            : 36
//!          Bss Load:                        <- load marker
//!              Connected Stations:        5
//!              Channel Utilization:       12 (4 %)
//!              Medium Available Capacity: 31250
//! ```
//!
//! Parsing yields one [`AccessPointGroup`] per access-point block, carrying
//! the attributes shared by its enclosing network.

use std::collections::VecDeque;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IngestError, ParseStage};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("pattern is a valid regex"));
    };
}

pattern!(NETWORK_MARKER, r"^\s*SSID\s+\d+\s*:(.*)$");
pattern!(AP_MARKER, r"^\s*BSSID\s+\d+\s*:(.*)$");
pattern!(AUTHENTICATION, r"^\s*Authentication\s*:\s*(.+)");
pattern!(ENCRYPTION, r"^\s*Encryption\s*:\s*(.+)");
pattern!(SIGNAL, r"^\s*Signal\s*:\s*(\d+)%");
pattern!(CHANNEL, r"^\s*Channel\s*:\s*(\d+)");
pattern!(RADIO_TYPE, r"^\s*Radio\s+type\s*:\s*(.+)");
pattern!(BAND, r"^\s*Band\s*:\s*(.+)");
pattern!(LOAD_MARKER, r"^\s*Bss\s+Load\s*:");
pattern!(STATIONS, r"^\s*Connected\s+Stations\s*:\s*(\d+)");
pattern!(UTILIZATION, r"^\s*Channel\s+Utilization\s*:\s*\d+\s*\((\d+)\s*%\)");
pattern!(CAPACITY, r"^\s*Medium\s+Available\s+Capacity\s*:\s*(\d+)");

/// Attributes of one access point, tagged with its network's attributes.
///
/// Every field not found in the block is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPointGroup<'a> {
    pub ssid: &'a str,
    pub auth: Option<&'a str>,
    pub encryption: Option<&'a str>,
    /// Raw access-point identifier (BSSID). Never persisted as-is.
    pub bssid: &'a str,
    pub signal_percent: Option<u8>,
    pub radio_type: Option<&'a str>,
    pub band: Option<&'a str>,
    pub channel: Option<u16>,
    pub connected_stations: Option<u32>,
    pub channel_utilization_pct: Option<u8>,
    pub medium_available_capacity: Option<u32>,
}

/// Whether the scan of an access-point block has passed the load marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Outside,
    Inside,
}

impl LoadState {
    fn stage(self) -> ParseStage {
        match self {
            LoadState::Outside => ParseStage::AccessPoint,
            LoadState::Inside => ParseStage::LoadSection,
        }
    }
}

/// One network block: the name following its marker and its body lines.
struct NetworkSegment<'a> {
    ssid: &'a str,
    lines: Vec<&'a str>,
}

/// Lazy sequence of access-point groups over a whole report.
///
/// Networks are scanned one at a time as the iterator is drained. After a
/// parse fault the iterator yields that fault once and then ends.
pub struct AccessPoints<'a> {
    networks: std::vec::IntoIter<NetworkSegment<'a>>,
    pending: VecDeque<AccessPointGroup<'a>>,
    faulted: bool,
}

impl<'a> Iterator for AccessPoints<'a> {
    type Item = Result<AccessPointGroup<'a>, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(group) = self.pending.pop_front() {
                return Some(Ok(group));
            }
            if self.faulted {
                return None;
            }
            let segment = self.networks.next()?;
            match scan_network(&segment) {
                Ok(groups) => self.pending.extend(groups),
                Err(e) => {
                    self.faulted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Parse a full report. Text before the first network marker is noise and
/// is dropped; a report without any marker yields nothing.
pub fn parse_report(text: &str) -> AccessPoints<'_> {
    AccessPoints {
        networks: split_networks(text).into_iter(),
        pending: VecDeque::new(),
        faulted: false,
    }
}

fn split_networks(text: &str) -> Vec<NetworkSegment<'_>> {
    let mut segments: Vec<NetworkSegment<'_>> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if let Some(name) = capture(&NETWORK_MARKER, line) {
            segments.push(NetworkSegment {
                ssid: name,
                lines: Vec::new(),
            });
        } else if let Some(current) = segments.last_mut() {
            current.lines.push(line);
        }
    }
    segments
}

fn scan_network<'a>(
    segment: &NetworkSegment<'a>,
) -> Result<Vec<AccessPointGroup<'a>>, IngestError> {
    // Shared attributes are resolved over the whole segment first, so their
    // position relative to the access-point markers does not matter.
    let mut auth = None;
    let mut encryption = None;
    for &line in &segment.lines {
        if let Some(v) = capture(&AUTHENTICATION, line) {
            auth = non_empty(v);
        }
        if let Some(v) = capture(&ENCRYPTION, line) {
            encryption = non_empty(v);
        }
    }

    let mut groups = Vec::new();
    let mut block: Option<(&'a str, Vec<&'a str>)> = None;
    for &line in &segment.lines {
        if let Some(id) = capture(&AP_MARKER, line) {
            if let Some((bssid, body)) = block.replace((id, Vec::new())) {
                groups.push(scan_access_point(segment.ssid, auth, encryption, bssid, &body)?);
            }
        } else if let Some((_, body)) = block.as_mut() {
            body.push(line);
        }
    }
    if let Some((bssid, body)) = block {
        groups.push(scan_access_point(segment.ssid, auth, encryption, bssid, &body)?);
    }
    Ok(groups)
}

fn scan_access_point<'a>(
    ssid: &'a str,
    auth: Option<&'a str>,
    encryption: Option<&'a str>,
    bssid: &'a str,
    body: &[&'a str],
) -> Result<AccessPointGroup<'a>, IngestError> {
    let mut group = AccessPointGroup {
        ssid,
        auth,
        encryption,
        bssid,
        ..Default::default()
    };
    let mut state = LoadState::Outside;
    for &line in body {
        state = scan_line(state, line, &mut group)?;
    }
    Ok(group)
}

/// Apply one attribute line to `group` and return the state for the next
/// line. The load marker itself carries no data.
fn scan_line<'a>(
    state: LoadState,
    line: &'a str,
    group: &mut AccessPointGroup<'a>,
) -> Result<LoadState, IngestError> {
    let stage = state.stage();

    if let Some(digits) = capture(&SIGNAL, line) {
        let quality: u32 = number(digits, stage, "signal_percent")?;
        match u8::try_from(quality) {
            Ok(q) if q <= 100 => group.signal_percent = Some(q),
            _ => log::debug!("Ignoring out-of-range signal quality {quality}%"),
        }
    }
    if let Some(digits) = capture(&CHANNEL, line) {
        group.channel = Some(number(digits, stage, "channel")?);
    }
    if let Some(v) = capture(&RADIO_TYPE, line) {
        group.radio_type = non_empty(v);
    }
    if let Some(v) = capture(&BAND, line) {
        group.band = non_empty(v);
    }

    if LOAD_MARKER.is_match(line) {
        return Ok(LoadState::Inside);
    }

    if state == LoadState::Inside {
        if let Some(digits) = capture(&STATIONS, line) {
            group.connected_stations = Some(number(digits, stage, "connected_stations")?);
        }
        if let Some(digits) = capture(&UTILIZATION, line) {
            let pct: u32 = number(digits, stage, "channel_utilization_pct")?;
            match u8::try_from(pct) {
                Ok(p) if p <= 100 => group.channel_utilization_pct = Some(p),
                _ => log::debug!("Ignoring out-of-range channel utilization {pct}%"),
            }
        }
        if let Some(digits) = capture(&CAPACITY, line) {
            group.medium_available_capacity =
                Some(number(digits, stage, "medium_available_capacity")?);
        }
    }

    Ok(state)
}

/// First capture group of `re` in `line`, trimmed.
fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn number<T>(digits: &str, stage: ParseStage, field: &'static str) -> Result<T, IngestError>
where
    T: FromStr<Err = ParseIntError>,
{
    digits
        .parse()
        .map_err(|source| IngestError::Parse { stage, field, source })
}
