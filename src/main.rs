use clap::Parser;
use log_preprocessor::config::{Command, LogFormat, ProcessArgs};
use log_preprocessor::utils::{logger, validation::Validate};
use log_preprocessor::{app, server, CliConfig, Settings};
use serde_json::json;
use tokio::net::TcpListener;

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日誌
    match settings.log_format {
        LogFormat::Text => logger::init_cli_logger(settings.verbose),
        LogFormat::Json => logger::init_json_logger(settings.verbose),
    }

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    tracing::debug!(
        "Settings: port={} threads={} timeout={:?} auth={:?}",
        settings.port,
        settings.worker_threads,
        settings.request_timeout,
        settings.auth_mode
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.worker_threads)
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => runtime.block_on(serve(&settings)),
        Command::Process(args) => {
            let code = runtime.block_on(process(&settings, &args));
            drop(runtime);
            std::process::exit(code);
        }
    }
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let state = match app::build_state(settings).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("❌ Failed to initialize service: {}", e);
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(settings.bind_address()).await?;
    tracing::info!(
        "🚀 Listening on {} with {} worker threads",
        listener.local_addr()?,
        settings.worker_threads
    );

    server::serve(listener, server::router(state, settings.request_timeout)).await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}

/// 回傳程序結束碼：0 成功、1 失敗、2 部分寫入
async fn process(settings: &Settings, args: &ProcessArgs) -> i32 {
    if let Err(e) = args.validate() {
        eprintln!("❌ {}", e);
        return 1;
    }

    match app::process_once(settings, args).await {
        Ok(summary) => {
            let mut output = json!({
                "bucket": args.bucket,
                "file": args.file,
            });
            if let (Some(map), Ok(serde_json::Value::Object(counts))) =
                (output.as_object_mut(), serde_json::to_value(&summary))
            {
                map.extend(counts);
            }
            println!("{}", output);

            if summary.is_partial() {
                tracing::warn!("⚠️ {} rows rejected by BigQuery", summary.insert_errors.len());
                2
            } else {
                tracing::info!("✅ ETL process completed successfully!");
                0
            }
        }
        Err(e) if e.is_config_error() => {
            tracing::error!("❌ Configuration error: {}", e);
            eprintln!("❌ {}", e);
            1
        }
        Err(e) => {
            tracing::error!("❌ ETL process failed: {} ({})", e, e.kind());
            eprintln!("❌ {}", e);
            1
        }
    }
}
