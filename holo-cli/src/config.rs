//! # 配置模块
//!
//! 命令行宿主的配置，从 JSON 文件加载。
//!
//! ## 设计原则
//!
//! - 每个字段都有默认值，配置文件只需写出要覆盖的部分
//! - 文件缺失或解析失败时回退到默认配置并记录警告，不中断启动
//! - 校验与加载分离，由调用方决定校验失败的处理方式

use std::fs;
use std::path::{Path, PathBuf};

use holo_core::{DEFAULT_HISTORY_LIMIT, ExportFormat, STORAGE_KEY, StoreOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 撤销上限的允许范围
pub const HISTORY_LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=500;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 存储目录（文档文件所在目录）
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// 存储键（文件名不含扩展名）
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// 撤销上限
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// 日志级别（error / warn / info / debug / trace）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 导出配置
    #[serde(default)]
    pub export: ExportConfig,
}

/// 导出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// 未指定 `--format` 时使用的格式（json / ts / vue）
    #[serde(default = "default_export_format")]
    pub default_format: String,

    /// 未指定 `--output` 时写入的目录；为空则输出到标准输出
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_export_format() -> String {
    ExportFormat::Source.tag().to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
            history_limit: default_history_limit(),
            log_level: default_log_level(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: default_export_format(),
            output_dir: None,
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "storage_key 不能为空".to_string(),
            ));
        }

        if !HISTORY_LIMIT_RANGE.contains(&self.history_limit) {
            return Err(ConfigError::ValidationFailed(format!(
                "history_limit 必须在 {} - {} 之间，当前为 {}",
                HISTORY_LIMIT_RANGE.start(),
                HISTORY_LIMIT_RANGE.end(),
                self.history_limit
            )));
        }

        if ExportFormat::parse(&self.export.default_format).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的导出格式: {}（可选 json / ts / vue）",
                self.export.default_format
            )));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }

    /// 默认导出格式（未知值回退到 ts）
    pub fn default_export_format(&self) -> ExportFormat {
        ExportFormat::parse(&self.export.default_format).unwrap_or(ExportFormat::Source)
    }

    /// 转换为存储选项
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.storage_key.clone(),
            history_limit: self.history_limit,
        }
    }
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
