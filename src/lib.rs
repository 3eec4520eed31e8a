use chrono::prelude::*;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
pub mod chart;
pub mod layout;
pub mod plot;
pub mod stats;
pub mod traffic;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const COL_IP: &str = "IP地址";
pub const COL_ONLINE: &str = "上线时间";
pub const COL_OFFLINE: &str = "下线时间";
pub const COL_TRAFFIC: &str = "总流量";
/// name given to the second "总流量" column when the export deduplicates headers
pub const COL_TRAFFIC_DEDUP: &str = "总流量.1";

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column {0}")]
    MissingColumn(String),
    #[error("line {line}: could not parse {column} '{value}'")]
    Timestamp {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("no session with positive traffic")]
    EmptyDataset,
}

/// One network connection interval of a device
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub ip: String,
    pub online: NaiveDateTime,
    pub offline: NaiveDateTime,
    pub traffic_raw: String,
    pub traffic_gb: f64,
}

impl Session {
    pub fn new(
        ip: &str,
        online: NaiveDateTime,
        offline: NaiveDateTime,
        traffic_raw: &str,
    ) -> Session {
        Session {
            ip: ip.to_string(),
            online,
            offline,
            traffic_raw: traffic_raw.to_string(),
            traffic_gb: traffic::parse_traffic_gb(traffic_raw),
        }
    }

    /// session length in (fractional) days, negative if offline precedes online
    pub fn duration_days(&self) -> f64 {
        (self.offline - self.online).num_milliseconds() as f64 / 86_400_000.
    }
}

/// The main struct for the session records
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub sessions: Vec<Session>,
}

/// positions of the used fields within a csv row
#[derive(Debug, Clone, Copy)]
struct Columns {
    ip: usize,
    online: usize,
    offline: usize,
    traffic: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Columns, TrafficError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|&h| h == name)
                .ok_or_else(|| TrafficError::MissingColumn(name.to_string()))
        };
        let traffic = match names.iter().position(|&h| h == COL_TRAFFIC_DEDUP) {
            Some(i) => i,
            None => {
                let same: Vec<usize> = names
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| **h == COL_TRAFFIC)
                    .map(|(i, _)| i)
                    .collect();
                // the second column is the unit-suffixed cumulative traffic
                match same.get(1).or_else(|| same.first()) {
                    Some(&i) => i,
                    None => return Err(TrafficError::MissingColumn(COL_TRAFFIC.to_string())),
                }
            }
        };
        Ok(Columns {
            ip: find(COL_IP)?,
            online: find(COL_ONLINE)?,
            offline: find(COL_OFFLINE)?,
            traffic,
        })
    }
}

impl SessionLog {
    pub fn new(capacity: usize) -> SessionLog {
        SessionLog {
            sessions: Vec::with_capacity(capacity),
        }
    }

    /// Init a SessionLog from csv, see `from_reader`
    pub fn from_csv<P: AsRef<Path>>(fin: P) -> Result<SessionLog, TrafficError> {
        let file = std::fs::File::open(fin.as_ref()).map_err(csv::Error::from)?;
        SessionLog::from_reader(file)
    }

    /// Reads the session records, dropping the trailing aggregate row.
    /// Traffic parsing never fails (malformed values become zero),
    /// timestamp parsing errors are returned with the offending line.
    /// Rows are kept in file order and are not filtered here.
    pub fn from_reader<R: Read>(rdr: R) -> Result<SessionLog, TrafficError> {
        let mut csv_rdr = ReaderBuilder::new().flexible(true).from_reader(rdr);
        let columns = Columns::from_headers(csv_rdr.headers()?)?;
        let mut rows = csv_rdr
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()?;
        if let Some(aggregate) = rows.pop() {
            debug!("dropped aggregate row {:?}", aggregate);
        }
        let mut log = SessionLog::new(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // header is line 1
            let line = i + 2;
            let field = |c: usize| row.get(c).unwrap_or_default().trim();
            let online = parse_datetime(field(columns.online)).ok_or_else(|| {
                TrafficError::Timestamp {
                    line,
                    column: COL_ONLINE,
                    value: field(columns.online).to_string(),
                }
            })?;
            let offline = parse_datetime(field(columns.offline)).ok_or_else(|| {
                TrafficError::Timestamp {
                    line,
                    column: COL_OFFLINE,
                    value: field(columns.offline).to_string(),
                }
            })?;
            log.sessions.push(Session::new(
                field(columns.ip),
                online,
                offline,
                field(columns.traffic),
            ));
        }
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// drops all the sessions without positive traffic (NAN included)
    /// takes a reference and returns a new SessionLog
    pub fn remove_empty_traffic(&self) -> SessionLog {
        let mut log = SessionLog::new(self.len());
        for s in self.sessions.iter() {
            if s.traffic_gb > 0. {
                log.sessions.push(s.clone());
            }
        }
        let dropped = self.len() - log.len();
        if dropped > 0 {
            warn!("dropped {} sessions without traffic", dropped);
        }
        log
    }

    /// stable sort by online datetime, in-place
    pub fn sort_by_online(&mut self) {
        self.sessions.sort_by_key(|s| s.online);
    }

    /// distinct ip addresses in order of first appearance
    pub fn unique_ips(&self) -> Vec<&str> {
        let indices = self.ip_indices();
        let mut ips: Vec<&str> = vec![""; indices.len()];
        for (ip, idx) in indices {
            ips[idx] = ip;
        }
        ips
    }

    /// ip address -> position in `unique_ips`
    pub fn ip_indices(&self) -> HashMap<&str, usize> {
        let mut indices: HashMap<&str, usize> = HashMap::new();
        for s in self.sessions.iter() {
            let next = indices.len();
            indices.entry(s.ip.as_str()).or_insert(next);
        }
        indices
    }

    pub fn total_traffic(&self) -> f64 {
        self.sessions.iter().map(|s| s.traffic_gb).sum()
    }

    /// earliest online and latest offline datetime
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let online: Vec<NaiveDateTime> = self.sessions.iter().map(|s| s.online).collect();
        let offline: Vec<NaiveDateTime> = self.sessions.iter().map(|s| s.offline).collect();
        let (first, _) = min_and_max(&online[..])?;
        let (_, last) = min_and_max(&offline[..])?;
        Some((first, last))
    }
}

impl std::fmt::Display for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ip,online,offline,traffic [GB]")?;
        for s in self.sessions.iter() {
            writeln!(
                f,
                "{},{},{},{}",
                s.ip,
                s.online.format(DT_FORMAT),
                s.offline.format(DT_FORMAT),
                s.traffic_gb
            )?
        }
        Ok(())
    }
}

/// Parses the datetime formats found in the session exports,
/// bare dates are taken at midnight
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut s_iter = s.iter();
    let (mut min, mut max) = match s_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in s_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}
