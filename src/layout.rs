use super::{Session, SessionLog};
use chrono::prelude::*;
use log::debug;
use std::collections::BTreeMap;

/// sessions shorter than this (in days, about 15 minutes) are widened to stay visible
pub const MIN_WIDTH_DAYS: f64 = 0.01;

/// days since 1970-01-01, fractional
pub fn days_since_epoch(dt: NaiveDateTime) -> f64 {
    dt.timestamp_millis() as f64 / 86_400_000.
}

/// One rectangle of the chart, stacked on the sessions of the same start day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionRect {
    pub x: f64,
    pub width: f64,
    pub bottom: f64,
    pub height: f64,
    /// index of the ip in `SessionLog::unique_ips`
    pub ip_index: usize,
}

impl SessionRect {
    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }
}

/// Rectangles and the per-calendar-day cumulative traffic
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub rects: Vec<SessionRect>,
    pub daily: BTreeMap<NaiveDate, f64>,
}

impl Layout {
    /// Stacks the sessions in their current order (expected sorted by online time).
    /// Each session starts at the cumulative height of its online day;
    /// its full traffic is then credited to every calendar day it overlaps,
    /// up to and including the offline day, without prorating.
    pub fn stack(log: &SessionLog, min_width: f64) -> Layout {
        let indices = log.ip_indices();
        let mut layout = Layout {
            rects: Vec::with_capacity(log.len()),
            daily: BTreeMap::new(),
        };
        for s in log.sessions.iter() {
            let ip_index = indices.get(s.ip.as_str()).copied().unwrap_or(0);
            let rect = layout.place(s, min_width, ip_index);
            layout.rects.push(rect);
        }
        debug!(
            "stacked {} rectangles over {} days",
            layout.rects.len(),
            layout.daily.len()
        );
        layout
    }

    fn place(&mut self, s: &Session, min_width: f64, ip_index: usize) -> SessionRect {
        let mut width = s.duration_days();
        if width < min_width {
            width = min_width;
        }
        let start_day = s.online.date();
        let cumulative = self.daily.entry(start_day).or_insert(0.);
        let bottom = *cumulative;
        *cumulative += s.traffic_gb;

        let end_day = s.offline.date();
        let mut day = start_day.succ_opt();
        while let Some(d) = day {
            if d > end_day {
                break;
            }
            *self.daily.entry(d).or_insert(0.) += s.traffic_gb;
            day = d.succ_opt();
        }
        SessionRect {
            x: days_since_epoch(s.online),
            width,
            bottom,
            height: s.traffic_gb,
            ip_index,
        }
    }

    /// (day, total) sorted by day
    pub fn daily_totals(&self) -> Vec<(NaiveDate, f64)> {
        self.daily.iter().map(|(&d, &t)| (d, t)).collect()
    }

    pub fn max_daily(&self) -> f64 {
        self.daily.values().cloned().fold(0., f64::max)
    }

    pub fn daily_sum(&self) -> f64 {
        self.daily.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, crate::DT_FORMAT).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn session(ip: &str, on: &str, off: &str, traffic: &str) -> Session {
        Session::new(ip, dt(on), dt(off), traffic)
    }

    fn log(sessions: Vec<Session>) -> SessionLog {
        SessionLog { sessions }
    }

    #[test]
    fn same_day_sessions_stack() {
        let l = log(vec![
            session("a", "2024-03-01 08:00:00", "2024-03-01 20:00:00", "1G"),
            session("b", "2024-03-01 09:00:00", "2024-03-01 10:00:00", "2G"),
            session("a", "2024-03-02 09:00:00", "2024-03-02 10:00:00", "512M"),
        ]);
        let layout = Layout::stack(&l, MIN_WIDTH_DAYS);
        assert_eq!(layout.rects[0].bottom, 0.);
        assert_eq!(layout.rects[1].bottom, 1.);
        assert_eq!(layout.rects[1].top(), 3.);
        assert_eq!(layout.rects[2].bottom, 0.);
        assert_eq!(layout.rects[0].ip_index, 0);
        assert_eq!(layout.rects[1].ip_index, 1);
        assert_eq!(layout.rects[2].ip_index, 0);
        assert!((layout.rects[0].width - 0.5).abs() < 1e-9);
        assert_eq!(
            layout.daily_totals(),
            vec![(day("2024-03-01"), 3.), (day("2024-03-02"), 0.5)]
        );
        // no multi-day session: daily sum equals total traffic
        assert_eq!(layout.daily_sum(), l.total_traffic());
        assert_eq!(layout.max_daily(), 3.);
    }

    #[test]
    fn multi_day_session_credits_every_day() {
        let l = log(vec![
            session("a", "2024-03-01 22:00:00", "2024-03-03 01:00:00", "2G"),
            session("b", "2024-03-02 09:00:00", "2024-03-02 10:00:00", "1G"),
        ]);
        let layout = Layout::stack(&l, MIN_WIDTH_DAYS);
        assert_eq!(
            layout.daily_totals(),
            vec![
                (day("2024-03-01"), 2.),
                (day("2024-03-02"), 3.),
                (day("2024-03-03"), 2.),
            ]
        );
        // the second session starts on top of the spanning one
        assert_eq!(layout.rects[1].bottom, 2.);
        assert_eq!(layout.daily_sum(), l.total_traffic() + 4.);
    }

    #[test]
    fn short_sessions_get_minimum_width() {
        let l = log(vec![
            session("a", "2024-03-01 08:00:00", "2024-03-01 08:00:00", "1G"),
            session("a", "2024-03-01 08:00:00", "2024-03-01 08:05:00", "1G"),
            session("a", "2024-03-01 08:00:00", "2024-03-01 07:00:00", "1G"),
        ]);
        let layout = Layout::stack(&l, MIN_WIDTH_DAYS);
        for r in layout.rects.iter() {
            assert_eq!(r.width, MIN_WIDTH_DAYS);
        }
    }

    #[test]
    fn empty_log() {
        let layout = Layout::stack(&SessionLog::default(), MIN_WIDTH_DAYS);
        assert!(layout.rects.is_empty());
        assert_eq!(layout.max_daily(), 0.);
    }

    #[test]
    fn epoch_days() {
        assert_eq!(days_since_epoch(dt("1970-01-02 12:00:00")), 1.5);
    }
}
