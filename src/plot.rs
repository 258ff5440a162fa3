use super::{min_and_max, suitable_xfmt, HJD_OFFSET, VERSION};
use crate::error::{Error, Result};
use crate::lightcurve::{jd_to_datetime, Lightcurve, Observation};
use clap::{App, Arg};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// How observation times are labelled on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAxis {
    /// HJD minus the reference offset, in days
    Offset,
    /// calendar date of each tick
    Calendar,
}

/// Everything that controls how a light curve chart looks and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// `.svg` selects the SVG backend, anything else is rendered as a bitmap
    pub output: PathBuf,
    pub size: (u32, u32),
    /// base font size in pixels, the title is drawn larger
    pub font_size: u32,
    pub hjd_offset: f64,
    /// defaults to the light curve file name
    pub title: Option<String>,
    pub time_axis: TimeAxis,
    /// open the saved chart in the system viewer
    pub show: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            output: PathBuf::from("test.png"),
            size: (1800, 1000),
            font_size: 20,
            hjd_offset: HJD_OFFSET,
            title: None,
            time_axis: TimeAxis::Offset,
            show: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPoint {
    pub x: f64,
    pub y: f64,
    pub err: f64,
}

impl ErrorPoint {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.err.is_finite()
    }
}

/// Error bar points of one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<ErrorPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub y_desc: &'static str,
    /// smaller values drawn at the top
    pub inverted: bool,
    pub series: Vec<Series>,
}

impl Panel {
    fn new<F>(
        y_desc: &'static str,
        inverted: bool,
        groups: &[(&str, Vec<&Observation>)],
        x: f64,
        f: F,
    ) -> Panel
    where
        F: Fn(&Observation) -> (f64, f64),
    {
        let series = groups
            .iter()
            .map(|(camera, obs)| Series {
                label: camera.to_string(),
                points: obs
                    .iter()
                    .map(|o| {
                        let (y, err) = f(o);
                        ErrorPoint { x: o.hjd - x, y, err }
                    })
                    .collect(),
            })
            .collect();
        Panel {
            y_desc,
            inverted,
            series,
        }
    }

    fn sign(&self) -> f64 {
        if self.inverted {
            -1.
        } else {
            1.
        }
    }

    /// Drawing range including the error bars, in drawing coordinates
    /// (negated for inverted panels), with a 5% margin.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let sign = self.sign();
        let ends: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter())
            .filter(|p| p.is_finite())
            .flat_map(|p| vec![sign * (p.y - p.err), sign * (p.y + p.err)])
            .collect();
        let (ymin, ymax) = min_and_max(&ends)?;
        Some(with_margin(ymin, ymax, 20.))
    }
}

fn with_margin(min: f64, max: f64, parts: f64) -> (f64, f64) {
    let span = if max > min { max - min } else { 1. };
    (min - span / parts, max + span / parts)
}

/// The two-panel chart of a light curve: magnitude on top, flux below,
/// one series per camera in both.
#[derive(Debug, Clone, PartialEq)]
pub struct LightcurvePlot {
    pub title: String,
    pub x_desc: String,
    pub magnitude: Panel,
    pub flux: Panel,
}

impl LightcurvePlot {
    pub fn new(lc: &Lightcurve, config: &PlotConfig) -> LightcurvePlot {
        let groups = lc.by_camera();
        let x = config.hjd_offset;
        let title = config
            .title
            .clone()
            .unwrap_or_else(|| lc.source.display().to_string());
        let x_desc = match config.time_axis {
            TimeAxis::Offset => format!("Time (HJD-{})", x),
            TimeAxis::Calendar => "Date (HJD)".to_string(),
        };
        LightcurvePlot {
            title,
            x_desc,
            magnitude: Panel::new("Magnitude", true, &groups, x, |o| (o.mag, o.mag_err)),
            flux: Panel::new("Flux (mJy)", false, &groups, x, |o| (o.flux, o.flux_err)),
        }
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        let xs: Vec<f64> = self
            .magnitude
            .series
            .iter()
            .chain(self.flux.series.iter())
            .flat_map(|s| s.points.iter())
            .filter(|p| p.is_finite())
            .map(|p| p.x)
            .collect();
        let (xmin, xmax) = min_and_max(&xs)?;
        Some(with_margin(xmin, xmax, 20.))
    }
}

/// Tick label of a calendar time axis.
pub fn calendar_label(jd: f64, fmt: &str) -> String {
    match jd_to_datetime(jd) {
        Some(dt) => dt.format(fmt).to_string(),
        None => format!("{:.1}", jd),
    }
}

/// Plots the light curve to `config.output` and opens it if `config.show`.
pub fn plot_lightcurve(lc: &Lightcurve, config: &PlotConfig) -> Result<()> {
    if lc.is_empty() {
        return Err(Error::FileFormat(format!(
            "{} has no observations",
            lc.source.display()
        )));
    }
    let plot = LightcurvePlot::new(lc, config);
    for series in plot.magnitude.series.iter() {
        log::info!("camera {}: {} observations", series.label, series.points.len());
    }
    if let Some((first, last)) = lc.hjd_span() {
        log::info!(
            "observations from {} to {}",
            calendar_label(first, "%Y-%m-%d"),
            calendar_label(last, "%Y-%m-%d")
        );
    }
    render(&plot, config)?;
    log::info!("chart saved to {}", config.output.display());
    if config.show {
        if let Err(e) = show(&config.output) {
            log::warn!("could not open {}: {}", config.output.display(), e);
        }
    }
    Ok(())
}

/// Draws the chart with the backend matching the output extension.
pub fn render(plot: &LightcurvePlot, config: &PlotConfig) -> Result<()> {
    let svg = config
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("svg"));
    let drawn = if svg {
        draw(
            SVGBackend::new(&config.output, config.size).into_drawing_area(),
            plot,
            config,
        )
    } else {
        draw(
            BitMapBackend::new(&config.output, config.size).into_drawing_area(),
            plot,
            config,
        )
    };
    drawn.map_err(|e| Error::Plot(e.to_string()))
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    plot: &LightcurvePlot,
    config: &PlotConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let font = f64::from(config.font_size);
    let (xmin, xmax) = plot.x_range().ok_or("no valid observation to plot")?;
    let xfmt = suitable_xfmt(xmax - xmin);
    let offset = config.hjd_offset;
    let time_axis = config.time_axis;
    let x_formatter = |x: &f64| match time_axis {
        TimeAxis::Offset => format!("{}", (x * 100.).round() / 100.),
        TimeAxis::Calendar => calendar_label(x + offset, xfmt),
    };

    root.fill(&WHITE)?;
    let body = root.titled(&plot.title, ("sans-serif", font * 1.5))?;
    let areas = body.split_evenly((2, 1));

    let panels = [&plot.magnitude, &plot.flux];
    for (i, (area, panel)) in areas.iter().zip(panels.iter()).enumerate() {
        let (ymin, ymax) = panel.y_range().unwrap_or((0., 1.));
        let sign = panel.sign();
        let y_formatter = |y: &f64| format!("{:.2}", sign * y);

        let mut chart = ChartBuilder::on(area)
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(100)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)?;

        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(150, 150, 150).stroke_width(1))
            .set_all_tick_mark_size(2)
            .label_style(("sans-serif", font))
            .axis_desc_style(("sans-serif", font))
            .y_desc(panel.y_desc)
            .x_labels(12)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter);
        // the panels share the time axis, only the bottom one is described
        if i == 1 {
            mesh.x_desc(plot.x_desc.as_str());
        }
        mesh.draw()?;

        for (idx, series) in panel.series.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let points: Vec<&ErrorPoint> =
                series.points.iter().filter(|p| p.is_finite()).collect();
            chart.draw_series(points.iter().map(|p| {
                ErrorBar::new_vertical(
                    p.x,
                    sign * (p.y - p.err),
                    sign * p.y,
                    sign * (p.y + p.err),
                    color.stroke_width(1),
                    4,
                )
            }))?;
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|p| Circle::new((p.x, sign * p.y), 4, color.filled())),
                )?
                .label(series.label.as_str())
                .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", font))
            .draw()?;
    }
    root.present()?;
    Ok(())
}

/// Opens a file with the platform's default viewer, without waiting for it.
pub fn show(path: &Path) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(&["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path).spawn()?;
    Ok(())
}

/// Takes the CLI arguments that control the plotting of the light curve.
pub fn parse_cli() -> (PathBuf, PlotConfig) {
    parse_cli_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

/// Parses the plotter arguments; `args` starts with the program name.
pub fn parse_cli_from<I, T>(args: I) -> std::result::Result<(PathBuf, PlotConfig), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("light curve csv file downloaded from ASAS-SN")
        .required(true)
        .index(1);
    let arg_out = Arg::with_name("output_file")
        .help("name of the output chart, .svg for svg, otherwise png")
        .short("o")
        .long("output")
        .takes_value(true)
        .default_value("test.png");
    let arg_no_show = Arg::with_name("no_show")
        .help("do not open the chart after saving it")
        .long("no-show")
        .takes_value(false);
    let arg_calendar = Arg::with_name("calendar")
        .help("label the time axis with calendar dates")
        .long("calendar")
        .takes_value(false);
    let arg_font = Arg::with_name("font_size")
        .help("base font size in pixels")
        .long("font-size")
        .takes_value(true)
        .default_value("20");
    let cli_args = App::new("asassn_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot ASAS-SN light curves, magnitude and flux by camera")
        .arg(arg_csvin)
        .arg(arg_out)
        .arg(arg_no_show)
        .arg(arg_calendar)
        .arg(arg_font)
        .get_matches_from_safe(args)?;
    let csvin = PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or_default());
    let font_size = match cli_args.value_of("font_size").unwrap_or_default().parse::<u32>() {
        Ok(f) if f > 0 => f,
        _ => {
            return Err(clap::Error::with_description(
                "font-size must be a positive integer",
                clap::ErrorKind::InvalidValue,
            ))
        }
    };
    let config = PlotConfig {
        output: PathBuf::from(cli_args.value_of("output_file").unwrap_or("test.png")),
        font_size,
        time_axis: if cli_args.is_present("calendar") {
            TimeAxis::Calendar
        } else {
            TimeAxis::Offset
        },
        show: !cli_args.is_present("no_show"),
        ..PlotConfig::default()
    };
    Ok((csvin, config))
}
