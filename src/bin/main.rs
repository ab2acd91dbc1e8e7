use regatta::{cli, config, telemetry};

fn main() {
    let cli = cli::parse_from(std::env::args_os());

    // Set actor env var before anything else (unsafe in Rust 2024 due to data
    // races, but the CLI is single-threaded at this point)
    if let Some(actor) = &cli.actor {
        // SAFETY: CLI is single-threaded at this point, no concurrent env access
        unsafe { std::env::set_var("REGATTA_ACTOR", actor) };
    }

    let _telemetry_guard = init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {e}");
        if e.effect() != regatta::Effect::None {
            eprintln!("note: partial changes may exist (side effects: {})", e.effect().as_str());
        }
        if let Some(advice) = e.advice() {
            eprintln!("hint: {advice}");
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> telemetry::TelemetryGuard {
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("config load failed, using defaults: {err}");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    let telemetry_cfg = telemetry::TelemetryConfig::new(verbose, quiet, cfg.logging);
    telemetry::init(telemetry_cfg)
}
