//! SNAPFIELD 실행 파일.
//!
//! 설정 로드, 로깅 초기화, 어댑터 생성(DI)을 담당하고
//! `scan`/`serve` 명령을 실행한다.

mod cli;
mod scan;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use snapfield_core::config::AppConfig;
use snapfield_core::config_manager::ConfigManager;
use snapfield_core::ports::session_store::SessionStore;
use snapfield_session::MemorySessionStore;
use snapfield_vision::engine::tesseract_provider;
use snapfield_vision::orchestrator::RecognitionOrchestrator;
use snapfield_web::{AppState, WebServer};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command, ScanArgs};

/// 보정이 필요할 때의 종료 코드
const EXIT_NEEDS_REVIEW: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli::log_filter(&args.log_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config.as_deref())?;
    args.command.apply_overrides(&mut config);
    config.validate().context("설정 검증 실패")?;

    match args.command {
        Command::Scan(scan_args) => scan(scan_args, config).await,
        Command::Serve(_) => {
            serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 설정 로드
///
/// 경로를 지정하면 실패를 그대로 보고하고, 기본 경로 실패는 기본값으로 대체한다.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let manager = ConfigManager::with_path(path.to_path_buf())
                .with_context(|| format!("설정 로드 실패: {}", path.display()))?;
            Ok(manager.get())
        }
        None => match ConfigManager::new() {
            Ok(manager) => {
                info!("설정 파일: {}", manager.config_path().display());
                Ok(manager.get())
            }
            Err(e) => {
                warn!("설정 파일 사용 불가, 기본값 사용: {e}");
                Ok(AppConfig::default_config())
            }
        },
    }
}

async fn scan(args: ScanArgs, config: AppConfig) -> Result<ExitCode> {
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("이미지 읽기 실패: {}", args.image.display()))?;

    let provider = Arc::new(tesseract_provider(&config.ocr));
    let orchestrator = RecognitionOrchestrator::new(provider);

    let report = scan::run_scan(image, &args, &config, &orchestrator).await?;
    println!("{}", report.render());

    Ok(if report.is_captured() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NEEDS_REVIEW)
    })
}

async fn serve(config: AppConfig) -> Result<()> {
    let provider = Arc::new(tesseract_provider(&config.ocr));
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let state = AppState::new(&config, provider, store);
    let server = WebServer::new(state, config.web.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("종료 신호 수신 (Ctrl+C)");
            let _ = shutdown_tx.send(true);
        }
    });

    info!("SNAPFIELD 서버 준비: {}", server.url());
    server.run(shutdown_rx).await.context("서버 실행 실패")?;
    Ok(())
}
