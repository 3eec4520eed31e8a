/// bytes in one unit step (K -> M -> G)
const STEP: f64 = 1024.;

/// Converts a traffic string such as "1.5G", "200M", "10K", "0byte"
/// or a bare byte count into gigabytes.
/// Never fails: missing or malformed values count as zero traffic.
pub fn parse_traffic_gb(traffic: &str) -> f64 {
    let t = traffic.trim();
    if t.is_empty() || t == "0byte" {
        return 0.;
    }
    let parsed = if t.contains('G') {
        t.replace('G', "").trim().parse::<f64>()
    } else if t.contains('M') {
        t.replace('M', "").trim().parse::<f64>().map(|v| v / STEP)
    } else if t.contains('K') {
        t.replace('K', "")
            .trim()
            .parse::<f64>()
            .map(|v| v / (STEP * STEP))
    } else if t.contains("byte") {
        return 0.;
    } else {
        t.parse::<f64>().map(|v| v / (STEP * STEP * STEP))
    };
    parsed.unwrap_or(0.)
}
