use traffic_cumplot::layout::{Layout, MIN_WIDTH_DAYS};
use traffic_cumplot::stats::{ip_ranking, Summary};
use traffic_cumplot::SessionLog;

const EXPORT: &str = "\
序号,IP地址,上线时间,下线时间,总流量,总流量
1,10.1.1.7,2024-04-03 09:00:00,2024-04-03 12:00:00,3221225472,3G
2,10.1.1.5,2024-04-01 08:00:00,2024-04-01 08:00:00,524288,512K
3,10.1.1.7,2024-04-01 20:00:00,2024-04-02 06:00:00,1073741824,1G
4,10.1.1.9,2024-04-02 10:00:00,2024-04-02 11:00:00,0,0byte
5,10.1.1.5,2024-04-02 12:00:00,2024-04-02 13:00:00,garbled,??
6,10.1.1.5,2024-04-02 14:00:00,2024-04-02 15:00:00,1073741824,1024M
,,,,5368709120,5.0005G
";

fn cleaned() -> SessionLog {
    let mut log = SessionLog::from_reader(EXPORT.as_bytes())
        .unwrap()
        .remove_empty_traffic();
    log.sort_by_online();
    log
}

#[test]
fn zero_traffic_rows_are_dropped() {
    let log = cleaned();
    assert_eq!(log.len(), 4);
    assert!(log.sessions.iter().all(|s| s.traffic_gb > 0.));
    assert!(log.sessions.iter().all(|s| s.ip != "10.1.1.9"));
}

#[test]
fn pipeline_statistics() {
    let log = cleaned();
    let layout = Layout::stack(&log, MIN_WIDTH_DAYS);
    let summary = Summary::compute(&log, &layout).unwrap();

    let k512_gb = 512. / (1024. * 1024.);
    assert!((summary.total_gb - (5. + k512_gb)).abs() < 1e-9);
    assert_eq!(summary.days, 3);
    assert_eq!(summary.max_single_gb, 3.);
    assert_eq!(summary.records, 4);
    assert_eq!(summary.ips, 2);
    // the overnight session credits 04-02 as well, but 04-03 holds the 3G one
    assert!((summary.max_daily_gb - 3.).abs() < 1e-9);
    assert!((layout.daily_sum() - (summary.total_gb + 1.)).abs() < 1e-9);

    // the instant session is still drawn with a visible width
    assert_eq!(layout.rects[0].width, MIN_WIDTH_DAYS);

    assert_eq!(
        ip_ranking(&log, 10),
        vec![("10.1.1.5".to_string(), 2), ("10.1.1.7".to_string(), 2)]
    );
}
