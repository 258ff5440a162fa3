use asassn_lc::lightcurve::Lightcurve;
use asassn_lc::plot::{plot_lightcurve, LightcurvePlot, PlotConfig};
use std::fs;
use std::path::Path;

fn write_two_camera_csv(path: &Path) {
    let mut csv = String::from("hjd,camera,filter,mag,mag_err,flux,flux_err\n");
    for i in 0..20 {
        let camera = if i % 2 == 0 { "bd" } else { "bh" };
        csv.push_str(&format!(
            "{},{},V,{},0.02,{},0.3\n",
            2458000. + i as f64,
            camera,
            12. + 0.01 * i as f64,
            50. - 0.1 * i as f64
        ));
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn two_cameras_give_two_series_per_panel() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("EDR3_12345.csv");
    write_two_camera_csv(&csv);

    let lc = Lightcurve::from_csv(&csv).unwrap();
    assert_eq!(lc.len(), 20);
    let plot = LightcurvePlot::new(&lc, &PlotConfig::default());

    for panel in [&plot.magnitude, &plot.flux].iter() {
        let labels: Vec<&str> = panel.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["bd", "bh"]);
        assert!(panel.series.iter().all(|s| s.points.len() == 10));
    }
    assert!(plot.magnitude.inverted);
    assert!(!plot.flux.inverted);
    assert_eq!(plot.magnitude.series[1].points[0].x, 1001.);
}

#[test]
fn missing_columns_fail_before_plotting() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("bad.csv");
    fs::write(&csv, "hjd,mag\n2458000.1,12.1\n").unwrap();
    let err = Lightcurve::from_csv(&csv).unwrap_err();
    assert!(matches!(err, asassn_lc::Error::FileFormat(_)));
}

// text rendering needs system fonts
#[test]
#[ignore]
fn renders_svg_chart() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("EDR3_12345.csv");
    write_two_camera_csv(&csv);
    let lc = Lightcurve::from_csv(&csv).unwrap();
    let out = dir.path().join("chart.svg");
    let config = PlotConfig {
        output: out.clone(),
        show: false,
        ..PlotConfig::default()
    };
    plot_lightcurve(&lc, &config).unwrap();
    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("bd"));
    assert!(svg.contains("bh"));
}
