use anyhow::Result;
use rune_config::{RuneConfig, TraceFormat};

mod scenario;
use scenario::{BUILTIN, Scenario, ScenarioRunner};

fn main() -> Result<()> {
    let config = RuneConfig::load();
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.filter.as_str()),
    )
    .try_init();

    let scenario = match &config.demo.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::parse(BUILTIN)?,
    };

    let mut runner = ScenarioRunner::new();
    let traces = runner.run(&scenario)?;

    for (index, trace) in traces.iter().enumerate() {
        match config.trace.format {
            TraceFormat::Text => {
                println!("[{}] {}", index + 1, trace.step);
                for event in &trace.events {
                    println!("    {event}");
                }
            }
            TraceFormat::Json => {
                for event in &trace.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            }
        }
    }

    log::info!(
        "scenario {:?} finished with {} element(s) still mounted",
        scenario.name,
        runner.tree().len()
    );
    Ok(())
}
