//! SDK 错误类型定义
//!
//! 所有可失败操作统一返回 [`Result`]，错误通过 [`SdkError`] 表达。
//! 核心从不因远端/硬件错误中止进程，也不做任何隐式重试，
//! 重试策略完全由调用方决定。

use crate::types::motion::ControllerLevel;
use thiserror::Error;

/// SDK 统一 Result 别名
pub type Result<T> = std::result::Result<T, SdkError>;

/// 错误码枚举（与固件侧状态码对齐）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    Ok = 0,
    Timeout = 2,
    InternalError = 3,
    NotConnected = 10,
    WrongControlLevel = 11,
    InvalidArgument = 12,
    ChannelOpenFailed = 20,
    ChannelCloseFailed = 21,
    ChannelClosed = 22,
}

/// SDK 错误类型
///
/// 每个变体对应一个 [`ErrorCode`]，`Display` 输出即人类可读的错误消息。
#[derive(Error, Debug, Clone)]
pub enum SdkError {
    /// 操作超时（超时时间由 `set_timeout` 配置）
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// 内部错误（远端服务错误、传输层故障等）
    #[error("internal error: {0}")]
    Internal(String),

    /// 会话尚未连接
    #[error("not connected: call initialize() and connect() first")]
    NotConnected,

    /// 控制级别不匹配
    ///
    /// 非激活侧控制器的变更类操作在切回之前持续返回此错误。
    #[error("wrong control level: operation requires {required:?}, current is {current:?}")]
    WrongControlLevel {
        required: ControllerLevel,
        current: ControllerLevel,
    },

    /// 参数非法
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 传感器通道打开失败
    #[error("failed to open channel {channel}: {reason}")]
    ChannelOpenFailed { channel: String, reason: String },

    /// 传感器通道关闭失败
    #[error("failed to close channel {channel}: {reason}")]
    ChannelCloseFailed { channel: String, reason: String },

    /// 订阅投递通道已关闭（分发线程已退出）
    #[error("telemetry channel closed")]
    ChannelClosed,
}

impl SdkError {
    /// 返回本错误对应的错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            SdkError::Timeout(_) => ErrorCode::Timeout,
            SdkError::Internal(_) => ErrorCode::InternalError,
            SdkError::NotConnected => ErrorCode::NotConnected,
            SdkError::WrongControlLevel { .. } => ErrorCode::WrongControlLevel,
            SdkError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            SdkError::ChannelOpenFailed { .. } => ErrorCode::ChannelOpenFailed,
            SdkError::ChannelCloseFailed { .. } => ErrorCode::ChannelCloseFailed,
            SdkError::ChannelClosed => ErrorCode::ChannelClosed,
        }
    }
}

/// C ABI 风格的状态结构（code + message）
///
/// 供绑定层使用；Rust 侧 API 一律使用 [`Result`]。
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    pub code: ErrorCode,
    pub message: String,
}

impl Status {
    /// 成功状态
    pub fn ok() -> Self {
        Status {
            code: ErrorCode::Ok,
            message: String::new(),
        }
    }

    /// 从 Result 转换（Ok -> code OK，Err -> 对应错误码和消息）
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::ok(),
            Err(e) => Status {
                code: e.code(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::Ok
    }
}

impl From<&SdkError> for Status {
    fn from(e: &SdkError) -> Self {
        Status {
            code: e.code(),
            message: e.to_string(),
        }
    }
}
