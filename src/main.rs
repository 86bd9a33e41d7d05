use campus_locator::algorithms::multilateration::resolve;
use campus_locator::api::{BlockingLocatorApi, OutputFormat, PositionPresenter};
use campus_locator::core::{Measurement, PlanarPoint};
use campus_locator::services::{FixedGeometryEstimator, ScriptedDetector};
use campus_locator::session::ImageHandle;
use campus_locator::utils::{init_logging, ConfigurationManager};
use campus_locator::validation::DataValidator;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

const USAGE: &str = "Usage: campus-locator [--config FILE] [--format text|json|csv] READINGS.json\n   \
                     or: campus-locator [--config FILE] [--format text|json|csv] --demo";

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    format: Option<OutputFormat>,
    readings: Option<String>,
    demo: bool,
}

fn parse_args(args: &[String]) -> Result<Args, Box<dyn Error>> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file path")?;
                parsed.config = Some(path.clone());
            }
            "--format" => {
                let format = iter.next().ok_or("--format needs a value")?;
                parsed.format = Some(format.parse::<OutputFormat>()?);
            }
            "--demo" => parsed.demo = true,
            "-h" | "--help" => return Err(USAGE.into()),
            other if other.starts_with("--") => return Err(format!("unknown option {}\n{}", other, USAGE).into()),
            path => {
                if parsed.readings.replace(path.to_string()).is_some() {
                    return Err(format!("only one readings file may be given\n{}", USAGE).into());
                }
            }
        }
    }

    if !parsed.demo && parsed.readings.is_none() {
        return Err(USAGE.into());
    }
    Ok(parsed)
}

/// Solve a readings file against the configured landmark table
fn solve_readings(config: &ConfigurationManager, path: &str, format: OutputFormat) -> Result<String, Box<dyn Error>> {
    let registry = config.build_registry()?;
    let json = std::fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {}", path, e))?;
    let measurements: Vec<Measurement> = serde_json::from_str(&json)?;

    let report = DataValidator::new().check(&measurements, &registry);
    for issue in &report.issues {
        warn!(%issue, "reading check");
    }

    let estimate = config.engine().solve(&measurements, &registry)?;
    let landmarks: Vec<PlanarPoint> = resolve(&measurements, &registry).iter().map(|r| r.position).collect();

    let presenter = PositionPresenter::new(*registry.reference()).with_precision(config.config().output.precision);
    let located = presenter.present(&estimate, &landmarks);
    Ok(presenter.render(&located, format))
}

/// Simulated walk: one run per landmark, ranged exactly from a known position
fn demo(config: &ConfigurationManager, format: OutputFormat) -> Result<String, Box<dyn Error>> {
    let registry = Arc::new(config.build_registry()?);
    let truth = PlanarPoint::new(-20.0, -60.0);

    let api = BlockingLocatorApi::from_config(
        ScriptedDetector::new(),
        FixedGeometryEstimator::new(registry.clone(), truth),
        config,
    )?;

    let landmarks: Vec<String> = registry.ids().take(config.session_config().capacity).map(str::to_string).collect();
    for (n, landmark) in landmarks.iter().enumerate() {
        api.detector().push_detection(landmark, 0.9);
        api.perform_run(vec![
            ImageHandle::new(format!("demo-{}-left", n), vec![0u8; 16]),
            ImageHandle::new(format!("demo-{}-right", n), vec![0u8; 16]),
        ])?;
    }

    let located = api.locate()?;
    Ok(format!(
        "{}\n(simulated truth x={:.2} m, y={:.2} m)",
        api.presenter().render(&located, format),
        truth.x,
        truth.y
    ))
}

fn run() -> Result<(), Box<dyn Error>> {
    let raw: Vec<String> = std::env::args().collect();
    let args = parse_args(&raw)?;

    let config = match &args.config {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new(),
    };
    init_logging(&config.config().logging);

    let format = args.format.unwrap_or(config.config().output.format);
    let output = match &args.readings {
        Some(path) if !args.demo => solve_readings(&config, path, format)?,
        _ => demo(&config, format)?,
    };
    println!("{}", output);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
