//! 核心数据模型
//!
//! 按域拆分：
//! - [`motion`]: 运动控制（控制级别、步态、摇杆、关节指令/状态）
//! - [`sensor`]: 传感器数据（IMU、激光雷达、图像等）
//! - [`state`]: 机器人聚合状态（BMS、故障列表）

pub mod motion;
pub mod sensor;
pub mod state;

pub use motion::*;
pub use sensor::*;
pub use state::*;
