//! MagicDog SDK - 四足机器人运动控制与遥测核心
//!
//! 面向四足机器人的会话式控制 SDK，覆盖运动控制、传感器遥测与
//! 状态监控三条主线。
//!
//! # 架构设计
//!
//! - **会话层** ([`robot`]): 连接生命周期、控制级别仲裁、控制器分发
//! - **运动控制** ([`high_level`] / [`low_level`]): 语义动作（步态、
//!   特技、摇杆）与 12 关节实时力控回路，经控制级别互斥
//! - **遥测** ([`sensor`] / [`dispatch`]): 多通道订阅，每订阅独立的
//!   有界队列 + 分发线程，drop-oldest 背压
//! - **传输层** ([`transport`]): 通信通道抽象，内置进程内 Mock 实现
//!
//! # 快速开始
//!
//! ```no_run
//! use magicdog_sdk::prelude::*;
//!
//! let robot = MagicRobot::new(MockTransport::new());
//! robot.initialize("192.168.55.10");
//! robot.connect()?;
//!
//! let high = robot.high_level_motion_controller()?;
//! high.set_gait(GaitMode::Trot)?;
//! high.wait_for_gait(GaitMode::Trot, Some(std::time::Duration::from_secs(5)))?;
//! # Ok::<(), magicdog_sdk::SdkError>(())
//! ```
//!
//! 低层关节控制要求先切到低层级别并等待 `LowLevelSdk` 步态生效，
//! 见 [`LowLevelMotionController`]。

mod arbiter;
pub mod dispatch;
pub mod error;
pub mod high_level;
pub mod low_level;
pub mod monitor;
pub mod robot;
pub mod sensor;
pub mod transport;
pub mod types;

// Prelude 模块
pub mod prelude;

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

pub use error::{ErrorCode, Result, SdkError, Status};

pub use robot::{ConnectionState, MagicRobot};

pub use high_level::HighLevelMotionController;
pub use low_level::{ControlLoopConfig, LowLevelMotionController};
pub use monitor::StateMonitor;
pub use sensor::SensorController;

pub use transport::{TelemetryChannel, TelemetryFrame, Transport};

pub use types::{
    ControllerLevel, EulerAngles, GaitMode, JoystickCommand, LegJointCommand, LegState,
    RobotState, TrickAction,
};
