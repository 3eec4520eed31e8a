use log::{debug, info};
use std::error::Error;
use traffic_cumplot::chart::render;
use traffic_cumplot::layout::Layout;
use traffic_cumplot::plot::parse_cli;
use traffic_cumplot::stats::Summary;
use traffic_cumplot::{SessionLog, TrafficError};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cfg = parse_cli()?;
    info!(
        "read sessions from {} and plot to {}",
        cfg.csvin.display(),
        cfg.pngout.display()
    );
    let raw = SessionLog::from_csv(&cfg.csvin)?;
    info!("loaded {} sessions", raw.len());
    let mut log = raw.remove_empty_traffic();
    if log.is_empty() {
        return Err(TrafficError::EmptyDataset.into());
    }
    log.sort_by_online();
    debug!("cleaned sessions:\n{}", log);

    println!("📊 开始绘制 {} 条记录...", log.len());
    let layout = Layout::stack(&log, cfg.min_width);
    let summary = Summary::compute(&log, &layout)?;
    render(&log, &layout, &summary, &cfg.chart, &cfg.pngout)?;
    println!("✅ 流量累积图已生成：{}", cfg.pngout.display());

    println!("\n📊 统计摘要:");
    println!("{}", summary);
    Ok(())
}
