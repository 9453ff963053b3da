//! 명령줄 인자.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snapfield_core::config::{AppConfig, RecognitionStrategy};
use snapfield_extract::ExtractMode;

/// SNAPFIELD: 사진에서 폼 필드 값을 읽어 온다
#[derive(Parser, Debug)]
#[command(name = "snapfield")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    pub log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// 하위 명령
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 사진 한 장에서 값 추출
    Scan(ScanArgs),
    /// HTTP 서버 실행
    Serve(ServeArgs),
}

/// `scan` 인자
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// 사진 파일
    pub image: PathBuf,

    /// 추출 정규식
    #[arg(long, short = 'p')]
    pub pattern: String,

    /// 정규식 플래그 (i, m, s)
    #[arg(long, default_value = "")]
    pub flags: String,

    /// 추출 방식 (first, best, groups)
    #[arg(long, short = 'm', default_value = "first")]
    pub mode: ExtractMode,

    /// 보정 URL에 쓸 파라미터 이름
    #[arg(long, default_value = "value")]
    pub param: String,

    /// 보정 후 돌아갈 URL
    #[arg(long, default_value = "/")]
    pub return_to: String,

    /// 인식 전략 (box-refine, adaptive)
    #[arg(long)]
    pub strategy: Option<RecognitionStrategy>,

    /// 전처리 최대 너비
    #[arg(long)]
    pub max_width: Option<u32>,
}

/// `serve` 인자
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// 서버 포트
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// 외부 접속 허용 (0.0.0.0 바인드)
    #[arg(long)]
    pub allow_external: bool,
}

impl Command {
    /// CLI 인자로 설정 덮어쓰기
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        match self {
            Command::Scan(scan) => {
                if let Some(strategy) = scan.strategy {
                    config.ocr.strategy = strategy;
                }
                if let Some(max_width) = scan.max_width {
                    config.ocr.max_width = max_width;
                }
            }
            Command::Serve(serve) => {
                if let Some(port) = serve.port {
                    config.web.port = port;
                }
                if serve.allow_external {
                    config.web.allow_external = true;
                }
            }
        }
    }
}

/// 크레이트별 로그 필터 문자열
pub fn log_filter(level: &str) -> String {
    [
        "snapfield",
        "snapfield_app",
        "snapfield_core",
        "snapfield_vision",
        "snapfield_extract",
        "snapfield_session",
        "snapfield_web",
        "tower_http",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",")
}
