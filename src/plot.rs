use super::chart::{ChartConfig, DEFAULT_FONT};
use super::VERSION;
use clap::{App, Arg, ArgMatches};
use std::path::PathBuf;

/// Settings for one plotting run
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub csvin: PathBuf,
    pub pngout: PathBuf,
    pub min_width: f64,
    pub chart: ChartConfig,
}

fn parse_value<T: std::str::FromStr>(cli_args: &ArgMatches, name: &str) -> Result<T, String> {
    let raw = cli_args.value_of(name).unwrap_or_default();
    raw.parse::<T>()
        .map_err(|_| format!("invalid value '{}' for {}", raw, name))
}

fn build_app<'a, 'b>() -> App<'a, 'b> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("name of the csv file with the session records")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .default_value("output.csv");
    let arg_pngout = Arg::with_name("output_pngfile")
        .help("name of the output png file")
        .short("o")
        .long("pngfile")
        .takes_value(true)
        .default_value("流量累积图.png");
    let arg_dpi = Arg::with_name("dpi")
        .help("resolution of the png, in dots per inch")
        .long("dpi")
        .takes_value(true)
        .default_value("300");
    let arg_width = Arg::with_name("width")
        .help("figure width, in inches")
        .long("width")
        .takes_value(true)
        .default_value("20");
    let arg_height = Arg::with_name("height")
        .help("figure height, in inches")
        .long("height")
        .takes_value(true)
        .default_value("10");
    let arg_top = Arg::with_name("top")
        .help("number of most used ip addresses in the legend")
        .long("top")
        .takes_value(true)
        .default_value("10");
    let arg_min_width = Arg::with_name("min_width")
        .help("minimum width of a session rectangle, in days")
        .long("min-width")
        .takes_value(true)
        .default_value("0.01");
    let arg_font = Arg::with_name("font")
        .help("font family, it should cover CJK characters")
        .long("font")
        .takes_value(true)
        .default_value(DEFAULT_FONT);
    App::new("traffic_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the cumulative daily traffic of a session log")
        .arg(arg_csvin)
        .arg(arg_pngout)
        .arg(arg_dpi)
        .arg(arg_width)
        .arg(arg_height)
        .arg(arg_top)
        .arg(arg_min_width)
        .arg(arg_font)
}

/// Takes the CLI arguments that control the plotting of the session log.
pub fn parse_cli() -> Result<PlotConfig, String> {
    let cli_args = build_app().get_matches();
    config_from_matches(&cli_args)
}

fn config_from_matches(cli_args: &ArgMatches) -> Result<PlotConfig, String> {
    let csvin = PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or_default());
    let pngout = PathBuf::from(cli_args.value_of("output_pngfile").unwrap_or_default());
    let dpi: u32 = parse_value(cli_args, "dpi")?;
    let width_in: f64 = parse_value(cli_args, "width")?;
    let height_in: f64 = parse_value(cli_args, "height")?;
    if dpi == 0 || width_in <= 0. || height_in <= 0. {
        return Err(String::from("figure size and dpi must be positive"));
    }
    let top_ips: usize = parse_value(cli_args, "top")?;
    let min_width: f64 = parse_value(cli_args, "min_width")?;
    let font = String::from(cli_args.value_of("font").unwrap_or(DEFAULT_FONT));
    Ok(PlotConfig {
        csvin,
        pngout,
        min_width,
        chart: ChartConfig {
            width_in,
            height_in,
            dpi,
            font,
            top_ips,
        },
    })
}
