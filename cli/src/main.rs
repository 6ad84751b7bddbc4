use maestro_cli::app;
use maestro_cli::commands::{cli, plan, pyproject, run};
use maestro_core::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("maestro: {e}");
            app::exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = app::parse_args(std::env::args_os())?;

    match args.command {
        cli::Commands::Pyproject(ref py_args) => {
            init_tracing(&maestro_core::config::LoggingConfig::default())
                .map_err(error::CliError::Command)?;
            pyproject::handle_pyproject(py_args.clone())
        }
        cli::Commands::Run(ref run_args) => {
            let cfg = app::load_config(&args.package, args.config.as_deref())?;
            init_tracing(&cfg.logging).map_err(error::CliError::Command)?;
            run::handle_run(&args, run_args.clone(), cfg).await
        }
        cli::Commands::Plan(ref select) => {
            let cfg = app::load_config(&args.package, args.config.as_deref())?;
            init_tracing(&cfg.logging).map_err(error::CliError::Command)?;
            plan::handle_plan(&args, select.clone(), cfg)
        }
    }
}

fn init_tracing(logging: &maestro_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(shellexpand::tilde(d).into_owned()),
            None => std::env::temp_dir().join("maestro"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("maestro.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
