use anyhow::Context;
use clap::Parser;
use letter_merge::config::cli::{Cli, Command};
use letter_merge::utils::error::{ErrorSeverity, MergeError};
use letter_merge::utils::monitor::ResourceMonitor;
use letter_merge::utils::{logger, validation::Validate};
use letter_merge::{BatchReport, BatchState, LocalStorage, MergeConfig, MergeSession, ProgressEvent};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_json);

    tracing::info!("🚀 Starting letter-merge");

    // 載入 TOML 配置（可選）
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            MergeConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))?
        }
        None => MergeConfig::default(),
    };

    // 應用命令列覆蓋設定
    cli.apply_to(&mut config);
    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    let outcome = match run(&cli, config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ letter-merge failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 警告，但成功
                ErrorSeverity::Medium => 2,   // 輸入或配置錯誤
                ErrorSeverity::High => 1,     // 處理錯誤
                ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            None
        }
    };

    // 批次未全部完成（失敗或取消）視為處理錯誤
    if let Some(report) = outcome {
        if report.state != BatchState::Completed {
            tracing::error!(
                "❌ Batch ended as {:?} after {} documents",
                report.state,
                report.succeeded()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

/// 執行子命令；`generate` 回傳批次報告
async fn run(cli: &Cli, config: MergeConfig) -> Result<Option<BatchReport>, MergeError> {
    // 驗證配置
    config.validate()?;

    let mut settings = config.session_settings()?;
    if let Command::Generate { date, .. } = &cli.command {
        settings.date = *date;
    }

    let monitor = ResourceMonitor::new(config.monitoring_enabled());
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut session = MergeSession::new(settings);
    let placeholders = session.extract_placeholders()?.clone();
    monitor.log_phase("Scan");

    match &cli.command {
        Command::Scan { .. } => {
            println!("🔍 找到 {} 个变量:", placeholders.len());
            for name in &placeholders {
                println!("  {{{{{}}}}}", name);
            }
            if let Some(path) = session.worksheet_path() {
                println!("📝 数据模板已生成: {}", path.display());
            }
        }
        Command::Map { .. } => {
            let columns = session.load_data()?.columns.clone();
            println!("📊 数据列: {}", columns.join(", "));
            print_mapping(&session);
        }
        Command::Generate { report, .. } => {
            session.load_data()?;
            monitor.log_phase("Load");
            print_mapping(&session);

            let batch_report = generate(&session).await?;
            monitor.log_phase("Generate");
            monitor.log_summary(batch_report.succeeded());

            if let Some(path) = report {
                write_report(&batch_report, path)?;
            }
            return Ok(Some(batch_report));
        }
    }

    Ok(None)
}

fn print_mapping(session: &MergeSession) {
    if let Some(mapping) = session.mapping() {
        println!("🔗 变量映射:");
        for (placeholder, column) in mapping.iter() {
            match column {
                Some(column) => println!("  {{{{{}}}}} -> {}", placeholder, column),
                None => println!("  {{{{{}}}}} -> (未映射，将替换为空)", placeholder),
            }
        }
    }
}

/// 啟動背景批次並逐一處理進度事件；Ctrl-C 在兩份文件之間取消
async fn generate(session: &MergeSession) -> Result<BatchReport, MergeError> {
    let mut handle = session.start_batch(LocalStorage::default())?;

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⏹️ Cancellation requested");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        match &event {
            ProgressEvent::Progress {
                percent,
                message,
                output,
                ..
            } => {
                tracing::debug!("💾 {}", output.display());
                println!("[{:>5.1}%] {}", percent, message);
            }
            ProgressEvent::RecordFailed { message, .. } => eprintln!("⚠️ {}", message),
            ProgressEvent::Completed { message, .. } => println!("✅ {}", message),
            ProgressEvent::Failed { message, .. } => eprintln!("❌ {}", message),
            ProgressEvent::Cancelled { message, .. } => eprintln!("⏹️ {}", message),
        }
    }

    handle.wait().await
}

fn write_report(report: &BatchReport, path: &Path) -> Result<(), MergeError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("📄 Report written to {}", path.display());
    Ok(())
}
