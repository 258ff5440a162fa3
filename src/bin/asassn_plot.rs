use asassn_lc::lightcurve::Lightcurve;
use asassn_lc::plot::{parse_cli, plot_lightcurve};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (csvin, config) = parse_cli();
    log::info!(
        "read data from {} and plot to {}",
        csvin.display(),
        config.output.display()
    );
    let plotted = Lightcurve::from_csv(&csvin).and_then(|lc| plot_lightcurve(&lc, &config));
    if let Err(e) = plotted {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
