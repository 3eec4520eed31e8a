use super::layout::Layout;
use super::{SessionLog, TrafficError};

/// legend entries shown by default
pub const TOP_IPS: usize = 10;

/// Summary statistics of a cleaned session log
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_gb: f64,
    pub days: i64,
    pub avg_daily_gb: f64,
    pub max_single_gb: f64,
    pub max_daily_gb: f64,
    pub records: usize,
    pub ips: usize,
}

impl Summary {
    /// The span counts calendar days from the first online day
    /// to the last offline day, both included.
    pub fn compute(log: &SessionLog, layout: &Layout) -> Result<Summary, TrafficError> {
        let (first, last) = log.time_span().ok_or(TrafficError::EmptyDataset)?;
        let total_gb = log.total_traffic();
        let days = (last.date() - first.date()).num_days() + 1;
        let avg_daily_gb = if days > 0 { total_gb / days as f64 } else { 0. };
        let max_single_gb = log
            .sessions
            .iter()
            .map(|s| s.traffic_gb)
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(Summary {
            total_gb,
            days,
            avg_daily_gb,
            max_single_gb,
            max_daily_gb: layout.max_daily(),
            records: log.len(),
            ips: log.unique_ips().len(),
        })
    }

    /// lines of the statistics box drawn on the chart
    pub fn chart_lines(&self) -> Vec<String> {
        vec![
            format!("总流量: {:.2} GB", self.total_gb),
            format!("时间跨度: {} 天", self.days),
            format!("日均流量: {:.2} GB", self.avg_daily_gb),
            format!("最大单次: {:.2} GB", self.max_single_gb),
            format!("最高日累积: {:.2} GB", self.max_daily_gb),
            format!("IP地址数: {}", self.ips),
        ]
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "总流量: {:.2} GB", self.total_gb)?;
        writeln!(f, "时间跨度: {} 天", self.days)?;
        writeln!(f, "日均流量: {:.2} GB", self.avg_daily_gb)?;
        writeln!(f, "最大单次流量: {:.2} GB", self.max_single_gb)?;
        writeln!(f, "最高日累积: {:.2} GB", self.max_daily_gb)?;
        writeln!(f, "记录条数: {} 条", self.records)?;
        write!(f, "不同IP数: {}", self.ips)
    }
}

/// The n most frequent ips with their session count, by descending count.
/// Ties keep the order of first appearance.
pub fn ip_ranking(log: &SessionLog, n: usize) -> Vec<(String, usize)> {
    let indices = log.ip_indices();
    let mut counts: Vec<(String, usize)> = log
        .unique_ips()
        .into_iter()
        .map(|ip| (ip.to_string(), 0))
        .collect();
    for s in log.sessions.iter() {
        if let Some(&idx) = indices.get(s.ip.as_str()) {
            counts[idx].1 += 1;
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::MIN_WIDTH_DAYS;
    use crate::Session;
    use chrono::NaiveDateTime;

    fn session(ip: &str, on: &str, off: &str, traffic: &str) -> Session {
        let dt = |s: &str| NaiveDateTime::parse_from_str(s, crate::DT_FORMAT).unwrap();
        Session::new(ip, dt(on), dt(off), traffic)
    }

    fn sample() -> SessionLog {
        SessionLog {
            sessions: vec![
                session("a", "2024-03-01 08:00:00", "2024-03-01 09:00:00", "1G"),
                session("b", "2024-03-01 10:00:00", "2024-03-02 02:00:00", "2G"),
                session("c", "2024-03-03 10:00:00", "2024-03-03 11:00:00", "512M"),
                session("b", "2024-03-04 10:00:00", "2024-03-04 11:00:00", "512M"),
            ],
        }
    }

    #[test]
    fn summary_values() {
        let log = sample();
        let layout = Layout::stack(&log, MIN_WIDTH_DAYS);
        let summary = Summary::compute(&log, &layout).unwrap();
        assert_eq!(summary.total_gb, 4.);
        assert_eq!(summary.days, 4);
        assert_eq!(summary.avg_daily_gb, 1.);
        assert_eq!(summary.max_single_gb, 2.);
        assert_eq!(summary.max_daily_gb, 3.);
        assert_eq!(summary.records, 4);
        assert_eq!(summary.ips, 3);
        assert_eq!(summary.chart_lines()[0], "总流量: 4.00 GB");
        assert!(summary.to_string().contains("记录条数: 4 条"));
    }

    #[test]
    fn summary_is_deterministic() {
        let log = sample();
        let layout = Layout::stack(&log, MIN_WIDTH_DAYS);
        let first = Summary::compute(&log, &layout).unwrap();
        let again = Summary::compute(&log, &Layout::stack(&log, MIN_WIDTH_DAYS)).unwrap();
        assert_eq!(first, again);
        assert_eq!(ip_ranking(&log, TOP_IPS), ip_ranking(&log, TOP_IPS));
    }

    #[test]
    fn empty_summary_fails() {
        let log = SessionLog::default();
        let layout = Layout::stack(&log, MIN_WIDTH_DAYS);
        assert!(matches!(
            Summary::compute(&log, &layout),
            Err(TrafficError::EmptyDataset)
        ));
    }

    #[test]
    fn ranking_order_and_ties() {
        let ranking = ip_ranking(&sample(), TOP_IPS);
        assert_eq!(
            ranking,
            vec![
                ("b".to_string(), 2),
                ("a".to_string(), 1),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn ranking_is_capped() {
        let mut log = SessionLog::default();
        for i in 0..15 {
            for _ in 0..=i {
                log.sessions.push(session(
                    &format!("10.0.0.{}", i),
                    "2024-03-01 08:00:00",
                    "2024-03-01 09:00:00",
                    "1G",
                ));
            }
        }
        let ranking = ip_ranking(&log, TOP_IPS);
        assert_eq!(ranking.len(), 10);
        assert_eq!(ranking[0], ("10.0.0.14".to_string(), 15));
        assert!(ranking.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
