//! # Error 模块
//!
//! 定义 holo-core 中使用的错误类型。
//!
//! 校验修复与光效解析是全函数，不会返回错误；
//! 只有导入入口和存储后端会产生错误值。

use thiserror::Error;

/// 导入错误
///
/// 每个变体对应一个稳定的错误码（见 [`ImportError::code`]），
/// 由上层用于查找本地化文案。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    /// 文本不是合法 JSON
    #[error("导入失败：JSON 解析错误 - {0}")]
    InvalidJson(String),

    /// JSON 合法，但既不是完整方案也不是导出格式
    #[error("导入失败：无法识别的数据结构")]
    InvalidStructure,

    /// 符合完整方案的形状，但无法修复为可用方案
    #[error("导入失败：方案数据无效")]
    InvalidScheme,
}

impl ImportError {
    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InvalidJson(_) => "invalid_json",
            ImportError::InvalidStructure => "invalid_structure",
            ImportError::InvalidScheme => "invalid_scheme",
        }
    }
}

/// 存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// 文件操作失败
    #[error("存储 IO 错误: {0}")]
    Io(String),

    /// 序列化失败
    #[error("存储序列化失败: {0}")]
    Serialization(String),
}

/// holo-core 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HoloError {
    /// 导入错误
    #[error("{0}")]
    Import(#[from] ImportError),

    /// 存储错误
    #[error("{0}")]
    Storage(#[from] StorageError),
}

/// Result 类型别名
pub type HoloResult<T> = Result<T, HoloError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_codes() {
        assert_eq!(ImportError::InvalidJson("x".into()).code(), "invalid_json");
        assert_eq!(ImportError::InvalidStructure.code(), "invalid_structure");
        assert_eq!(ImportError::InvalidScheme.code(), "invalid_scheme");
    }

    #[test]
    fn test_holo_error_from() {
        let err: HoloError = StorageError::Io("disk".into()).into();
        assert!(matches!(err, HoloError::Storage(_)));
        assert!(err.to_string().contains("disk"));
    }
}
