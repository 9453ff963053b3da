//! 설정 파일 관리.
//!
//! `config.json` 하나에 `AppConfig`를 보관한다. 파일이 없으면 기본값으로 만들고,
//! 쓰기는 임시 파일에 쓴 뒤 rename 한다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 복제해도 같은 설정을 공유한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 `config.json` 사용
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정 경로의 설정 파일 사용 (없으면 기본값으로 생성)
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let config = match read_config(&path)? {
            Some(config) => config,
            None => {
                let config = AppConfig::default_config();
                write_config(&path, &config)?;
                info!("기본 설정 파일 생성: {}", path.display());
                config
            }
        };
        config.validate()?;

        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    /// 현재 설정 복제본
    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    /// 설정 교체
    ///
    /// 검증과 저장이 모두 성공해야 메모리 값이 바뀐다.
    pub fn update(&self, config: AppConfig) -> Result<(), CoreError> {
        config.validate()?;
        write_config(&self.path, &config)?;
        *self.current.write() = config;
        debug!("설정 갱신: {}", self.path.display());
        Ok(())
    }

    /// 현재 설정을 고쳐서 저장하고 결과를 반환
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut next = self.get();
        edit(&mut next);
        self.update(next.clone())?;
        Ok(next)
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 파일에서 다시 읽기 (파일이 사라졌으면 `Config` 에러)
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = read_config(&self.path)?.ok_or_else(|| {
            CoreError::Config(format!("설정 파일 없음: {}", self.path.display()))
        })?;
        config.validate()?;
        *self.current.write() = config;
        info!("설정 다시 로드: {}", self.path.display());
        Ok(())
    }

    /// 플랫폼별 설정 디렉토리
    ///
    /// Linux 기준 `~/.config/snapfield/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("com", "snapfield", "snapfield")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }
}

/// 설정 파일 읽기. 파일이 없으면 `None`.
fn read_config(path: &Path) -> Result<Option<AppConfig>, CoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CoreError::Config(format!(
                "설정 파일 읽기 실패: {}: {e}",
                path.display()
            )))
        }
    };

    let config = serde_json::from_str(&content)
        .map_err(|e| CoreError::Config(format!("설정 파일 파싱 실패: {}: {e}", path.display())))?;
    debug!("설정 파일 로드: {}", path.display());
    Ok(Some(config))
}

/// 설정 파일 쓰기 (상위 디렉토리 생성 포함)
fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            CoreError::Config(format!("설정 디렉토리 생성 실패: {}: {e}", dir.display()))
        })?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json)
        .and_then(|()| fs::rename(&staging, path))
        .map_err(|e| CoreError::Config(format!("설정 파일 저장 실패: {}: {e}", path.display())))
}
