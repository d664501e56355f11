//! 传输层抽象
//!
//! 会话到机器人服务的通信通道抽象为 [`Transport`] trait：
//! 可靠有序（单通道内）的双向连接，提供请求/响应与发布/订阅两类原语。
//! 具体的网络协议、重连语义由 Transport 实现负责，核心不感知。
//!
//! [`mock`] 模块提供进程内的确定性实现，用于测试与仿真。

pub mod mock;

use std::time::Duration;

use crate::dispatch::TelemetrySink;
use crate::error::Result;
use crate::types::*;

/// 订阅句柄 ID
pub type SubscriptionId = u64;

/// 传感器通道分组（粗粒度开关单位）
///
/// IMU、TOF、超声波、头部触摸没有独立分组，仅受总开关约束。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorGroup {
    Lidar,
    RgbdCamera,
    BinocularCamera,
}

/// 遥测通道
///
/// 每个通道有独立的订阅者集合与生命周期，彼此正交。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryChannel {
    /// 下肢关节状态（低层控制回路）
    LegState,
    Imu,
    Lidar,
    Ultra,
    Tof,
    HeadTouch,
    RgbdColorImage,
    RgbdDepthImage,
    RgbdColorCameraInfo,
    RgbdDepthCameraInfo,
    LeftBinocularHigh,
    LeftBinocularLow,
    RightBinocularLow,
    /// 双目立体匹配输出的深度图像
    DepthImage,
}

impl TelemetryChannel {
    /// 通道所属的传感器分组（无分组的通道仅受总开关约束）
    pub fn group(&self) -> Option<SensorGroup> {
        match self {
            TelemetryChannel::Lidar => Some(SensorGroup::Lidar),
            TelemetryChannel::RgbdColorImage
            | TelemetryChannel::RgbdDepthImage
            | TelemetryChannel::RgbdColorCameraInfo
            | TelemetryChannel::RgbdDepthCameraInfo => Some(SensorGroup::RgbdCamera),
            TelemetryChannel::LeftBinocularHigh
            | TelemetryChannel::LeftBinocularLow
            | TelemetryChannel::RightBinocularLow
            | TelemetryChannel::DepthImage => Some(SensorGroup::BinocularCamera),
            _ => None,
        }
    }
}

/// 遥测帧（按通道类型携带对应载荷）
#[derive(Debug, Clone)]
pub enum TelemetryFrame {
    LegState(LegState),
    Imu(Imu),
    LaserScan(LaserScan),
    /// TOF / 超声波
    MultiArray(Float32MultiArray),
    HeadTouch(HeadTouch),
    Image(Image),
    CameraInfo(CameraInfo),
    CompressedImage(CompressedImage),
}

/// 请求（请求/响应原语的命令集合）
#[derive(Debug, Clone)]
pub enum Request {
    SetControlLevel(ControllerLevel),
    SetGait(GaitMode),
    GetGait,
    ExecuteTrick(TrickAction),
    Joystick(JoystickCommand),
    GetHeadPosition,
    SetHeadPosition(EulerAngles),
    PublishLegCommand(LegJointCommand),
    SetPeriodMs(u64),
    OpenChannelSwitch,
    CloseChannelSwitch,
    OpenSensor(SensorGroup),
    CloseSensor(SensorGroup),
    GetRobotState,
}

/// 响应
#[derive(Debug, Clone)]
pub enum Response {
    Ack,
    Gait(GaitMode),
    HeadPosition(EulerAngles),
    RobotState(RobotState),
}

/// 机器人服务的传输通道
///
/// 实现方保证：单通道内投递保持发射顺序；`request` 在配置的超时内
/// 返回或报 `Timeout`；`disconnect` 后订阅注册保留，重连后恢复投递。
pub trait Transport: Send + Sync + 'static {
    /// 建立连接（可能阻塞至握手完成或超时）
    fn connect(&self, endpoint: &str, timeout: Duration) -> Result<()>;

    /// 断开连接
    fn disconnect(&self);

    /// 发起请求并等待响应
    fn request(&self, request: Request, timeout: Duration) -> Result<Response>;

    /// 注册通道订阅，收到的帧经 `sink` 投递
    fn subscribe(&self, channel: TelemetryChannel, sink: TelemetrySink) -> Result<SubscriptionId>;

    /// 注销订阅
    fn unsubscribe(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_groups() {
        assert_eq!(TelemetryChannel::Lidar.group(), Some(SensorGroup::Lidar));
        assert_eq!(
            TelemetryChannel::RgbdDepthImage.group(),
            Some(SensorGroup::RgbdCamera)
        );
        assert_eq!(
            TelemetryChannel::LeftBinocularHigh.group(),
            Some(SensorGroup::BinocularCamera)
        );
        assert_eq!(
            TelemetryChannel::DepthImage.group(),
            Some(SensorGroup::BinocularCamera)
        );
        assert_eq!(TelemetryChannel::Imu.group(), None);
        assert_eq!(TelemetryChannel::LegState.group(), None);
        assert_eq!(TelemetryChannel::Ultra.group(), None);
    }
}
