//! risk-runner: headless runner for the food import risk engine.
//!
//! Usage:
//!   risk-runner top --n 20 --shock 0.35 [--commodity Wheat] [--region EU] [--cached]
//!   risk-runner country Malta
//!   risk-runner simulate Malta --shock 0.35
//!   risk-runner compare --shock-a 0.2 --shock-b 0.5 [--n 20]
//!   risk-runner materialize --shock 0.35
//!   risk-runner commodities | countries [--q ma] | shocks | info
//!   risk-runner --ipc-mode          (one JSON query per stdin line)
//!
//! Global flags: --config <file.json>, --data-dir <dir> (default ./data)

use anyhow::{bail, Result};
use foodrisk_core::{
    config::EngineConfig,
    engine::RiskEngine,
    query::{EngineQuery, DEFAULT_SHOCK_PCT, DEFAULT_TOP_N},
};
use std::env;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::with_data_dir(flag_value(&args, "--data-dir").unwrap_or("./data")),
    };
    log::info!("Processed data directory: {}", config.processed_dir.display());

    let engine = RiskEngine::open(config);

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    let Some(command) = positional(&args, 0) else {
        bail!("missing command; see the usage at the top of tools/src/main.rs");
    };
    let response = run_command(&engine, command, &args)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn run_command(engine: &RiskEngine, command: &str, args: &[String]) -> Result<serde_json::Value> {
    let shock = parse_arg(args, "--shock", DEFAULT_SHOCK_PCT)?;
    let query = match command {
        "top" => EngineQuery::TopRisk {
            n: parse_arg(args, "--n", DEFAULT_TOP_N)?,
            shock_pct: shock,
            commodity: flag_value(args, "--commodity").map(str::to_string),
            region: flag_value(args, "--region").map(str::to_string),
            cached: args.iter().any(|a| a == "--cached"),
        },
        "country" => EngineQuery::RiskByCountry { country: required_positional(args, 1)? },
        "simulate" => EngineQuery::SimulateRisk {
            country: required_positional(args, 1)?,
            shock_pct: shock,
        },
        "compare" => EngineQuery::CompareShocks {
            n: parse_arg(args, "--n", DEFAULT_TOP_N)?,
            shock_a: parse_arg(args, "--shock-a", DEFAULT_SHOCK_PCT)?,
            shock_b: parse_arg(args, "--shock-b", 0.5)?,
            commodity: flag_value(args, "--commodity").map(str::to_string),
            region: flag_value(args, "--region").map(str::to_string),
            cached: args.iter().any(|a| a == "--cached"),
        },
        "materialize" => EngineQuery::MaterializeSnapshot { shock_pct: shock },
        "commodities" => EngineQuery::ListCommodities,
        "countries" => EngineQuery::ListCountries { q: flag_value(args, "--q").map(str::to_string) },
        "shocks" => EngineQuery::ListCachedShocks,
        "info" => EngineQuery::ServiceInfo,
        other => bail!("unknown command '{other}'"),
    };
    Ok(engine.dispatch(query)?)
}

fn run_ipc_loop(engine: &RiskEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let query: EngineQuery = match serde_json::from_str(&buffer) {
            Ok(q) => q,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string(), "kind": "bad_request" });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match engine.dispatch(query) {
            Ok(response) => writeln!(stdout, "{}", serde_json::to_string(&response)?)?,
            Err(e) => {
                log::debug!("Query failed: {e}");
                let err_json = serde_json::json!({ "error": e.to_string(), "kind": e.kind() });
                writeln!(stdout, "{}", err_json)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Value following `flag`, if any.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Parsed value of `flag`, or `default` when the flag is absent.
/// A present but malformed value is an error.
fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> Result<T> {
    match flag_value(args, flag) {
        None => Ok(default),
        Some(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => bail!("invalid value '{raw}' for {flag}"),
        },
    }
}

/// The `index`-th argument that is neither a flag nor a flag's value.
fn positional(args: &[String], index: usize) -> Option<&str> {
    const SWITCHES: &[&str] = &["--cached", "--ipc-mode"];
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !SWITCHES.contains(&arg.as_str());
            continue;
        }
        out.push(arg.as_str());
    }
    out.get(index).copied()
}

fn required_positional(args: &[String], index: usize) -> Result<String> {
    match positional(args, index) {
        Some(v) => Ok(v.to_string()),
        None => bail!("missing country argument"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("risk-runner")
            .chain(line.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn absent_flags_take_defaults() {
        let a = args("top --cached");
        assert_eq!(parse_arg(&a, "--n", DEFAULT_TOP_N).unwrap(), DEFAULT_TOP_N);
        assert_eq!(parse_arg(&a, "--shock", DEFAULT_SHOCK_PCT).unwrap(), DEFAULT_SHOCK_PCT);
    }

    #[test]
    fn malformed_flag_values_are_rejected() {
        assert!(parse_arg(&args("top --shock abc"), "--shock", DEFAULT_SHOCK_PCT).is_err());
        assert!(parse_arg(&args("top --n -5"), "--n", DEFAULT_TOP_N).is_err());
        assert_eq!(parse_arg(&args("top --n 7"), "--n", DEFAULT_TOP_N).unwrap(), 7);
    }

    #[test]
    fn compare_goes_through_the_tagged_query() {
        let dir = std::env::temp_dir().join("risk-runner-compare-args");
        let engine = RiskEngine::open(EngineConfig::with_data_dir(&dir));
        // No tables on disk: the query reaches the engine and fails there.
        let err = run_command(&engine, "compare", &args("compare --shock-a 0.1 --shock-b 0.4"))
            .unwrap_err();
        assert!(err.to_string().contains("Backing tables unavailable"), "{err}");

        let err = run_command(&engine, "compare", &args("compare --shock-b x")).unwrap_err();
        assert!(err.to_string().contains("--shock-b"), "{err}");
    }

    #[test]
    fn positional_skips_flag_values() {
        let a = args("--data-dir ./data simulate Malta --shock 0.3 --cached");
        assert_eq!(positional(&a, 0), Some("simulate"));
        assert_eq!(positional(&a, 1), Some("Malta"));
        assert_eq!(positional(&a, 2), None);
    }
}
