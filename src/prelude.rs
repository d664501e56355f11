//! Prelude - 常用类型的便捷导入
//!
//! 大多数用户应该使用这个模块来导入常用类型：
//!
//! ```rust
//! use magicdog_sdk::prelude::*;
//! ```

// 会话入口
pub use crate::robot::{ConnectionState, MagicRobot};

// 控制器
pub use crate::high_level::HighLevelMotionController;
pub use crate::low_level::{ControlLoopConfig, LowLevelMotionController};
pub use crate::monitor::StateMonitor;
pub use crate::sensor::SensorController;

// 数据模型
pub use crate::types::*;

// 传输层（Trait + Mock 实现）
pub use crate::transport::mock::MockTransport;
pub use crate::transport::{TelemetryChannel, TelemetryFrame, Transport};

// 错误类型
pub use crate::error::{ErrorCode, Result, SdkError, Status};
