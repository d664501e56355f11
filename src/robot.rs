//! MagicRobot 会话
//!
//! 机器人系统的统一入口：管理连接生命周期、控制级别仲裁，并向外
//! 提供高层/低层控制器、传感器控制器与状态监控器。每个核心实例
//! 对应一个机器人端点，所有控制器由会话独占持有。

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::LevelArbiter;
use crate::dispatch::TelemetrySink;
use crate::error::{Result, SdkError};
use crate::high_level::HighLevelMotionController;
use crate::low_level::LowLevelMotionController;
use crate::monitor::StateMonitor;
use crate::sensor::SensorController;
use crate::transport::{Request, Response, SubscriptionId, TelemetryChannel, Transport};
use crate::types::ControllerLevel;

/// 默认接口调用超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// 会话连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initialized,
    Connected,
    Disconnected,
}

/// 会话内部共享上下文（控制器通过它访问传输层与仲裁器）
pub(crate) struct SessionCore {
    transport: Box<dyn Transport>,
    endpoint: RwLock<String>,
    timeout_ms: AtomicU64,
    state: RwLock<ConnectionState>,
    pub(crate) arbiter: LevelArbiter,
}

impl SessionCore {
    fn new(transport: Box<dyn Transport>) -> Self {
        SessionCore {
            transport,
            endpoint: RwLock::new(String::new()),
            timeout_ms: AtomicU64::new(DEFAULT_TIMEOUT_MS),
            state: RwLock::new(ConnectionState::Uninitialized),
            arbiter: LevelArbiter::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn ensure_connected(&self) -> Result<()> {
        match self.connection_state() {
            ConnectionState::Connected => Ok(()),
            _ => Err(SdkError::NotConnected),
        }
    }

    /// 发起请求（隐含连接状态检查）
    pub fn request(&self, request: Request) -> Result<Response> {
        self.ensure_connected()?;
        self.transport.request(request, self.timeout())
    }

    pub fn subscribe(
        &self,
        channel: TelemetryChannel,
        sink: TelemetrySink,
    ) -> Result<SubscriptionId> {
        self.transport.subscribe(channel, sink)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.transport.unsubscribe(id);
    }
}

/// 机器人会话入口
///
/// 生命周期：`new` → `initialize` → `connect` → … → `shutdown`。
/// `disconnect` 后可直接 `connect` 重连，无需重新 `initialize`；
/// `shutdown` 幂等，释放全部控制器与订阅。
pub struct MagicRobot {
    core: Arc<SessionCore>,
    high: HighLevelMotionController,
    low: LowLevelMotionController,
    sensor: SensorController,
    monitor: StateMonitor,
    is_shutdown: AtomicBool,
}

impl MagicRobot {
    /// 基于给定传输层创建会话实例
    pub fn new(transport: impl Transport) -> Self {
        let core = Arc::new(SessionCore::new(Box::new(transport)));
        MagicRobot {
            high: HighLevelMotionController::new(core.clone()),
            low: LowLevelMotionController::new(core.clone()),
            sensor: SensorController::new(core.clone()),
            monitor: StateMonitor::new(core.clone()),
            core,
            is_shutdown: AtomicBool::new(true),
        }
    }

    /// 初始化机器人系统
    ///
    /// 必须在 `connect` 之前恰好调用一次；重复调用返回 `false`。
    pub fn initialize(&self, local_ip: &str) -> bool {
        if local_ip.is_empty() {
            tracing::warn!("initialize called with empty endpoint");
            return false;
        }
        let mut state = self.core.state.write();
        if *state != ConnectionState::Uninitialized {
            tracing::warn!("initialize called more than once");
            return false;
        }
        *self.core.endpoint.write() = local_ip.to_string();
        *state = ConnectionState::Initialized;
        self.is_shutdown.store(false, Ordering::Release);
        tracing::debug!(endpoint = local_ip, "session initialized");
        true
    }

    /// 设置接口调用超时时间（毫秒），默认 5000
    pub fn set_timeout(&self, timeout_ms: u64) {
        self.core.timeout_ms.store(timeout_ms, Ordering::Relaxed);
    }

    /// 与机器人服务建立连接
    ///
    /// 可能阻塞至传输层握手完成或超时。
    pub fn connect(&self) -> Result<()> {
        let mut state = self.core.state.write();
        match *state {
            ConnectionState::Uninitialized => {
                return Err(SdkError::Internal(
                    "initialize() must be called before connect()".into(),
                ));
            }
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Initialized | ConnectionState::Disconnected => {}
        }
        let endpoint = self.core.endpoint.read().clone();
        self.core.transport.connect(&endpoint, self.core.timeout())?;
        *state = ConnectionState::Connected;
        tracing::debug!(endpoint = %endpoint, "session connected");
        Ok(())
    }

    /// 断开连接（可再次 `connect` 重连）
    pub fn disconnect(&self) {
        let mut state = self.core.state.write();
        if *state != ConnectionState::Connected {
            return;
        }
        self.core.transport.disconnect();
        *state = ConnectionState::Disconnected;
        tracing::debug!("session disconnected");
    }

    /// 关闭机器人系统，释放全部资源（幂等）
    ///
    /// 终止所有控制器的投递路径并注销订阅，可与在途发布/回调并发。
    pub fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.low.shutdown();
        self.sensor.shutdown();
        self.high.shutdown();
        self.disconnect();
        tracing::debug!("session shut down");
    }

    /// SDK 版本号
    pub fn sdk_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// 当前会话连接状态
    pub fn connection_state(&self) -> ConnectionState {
        self.core.connection_state()
    }

    /// 当前运动控制级别
    pub fn motion_control_level(&self) -> ControllerLevel {
        self.core.arbiter.current()
    }

    /// 设置运动控制级别（高层/低层）
    ///
    /// 切换失败时原级别保持不变；切换不会重置步态，由切换引发的
    /// 步态转换是异步的，经 `get_gait` 轮询观察。
    pub fn set_motion_control_level(&self, level: ControllerLevel) -> Result<()> {
        self.core.ensure_connected()?;
        self.core.arbiter.switch(level, || {
            self.core
                .transport
                .request(Request::SetControlLevel(level), self.core.timeout())
                .map(|_| ())
        })
    }

    /// 高层运动控制器
    pub fn high_level_motion_controller(&self) -> Result<&HighLevelMotionController> {
        self.core.ensure_connected()?;
        Ok(&self.high)
    }

    /// 低层运动控制器
    pub fn low_level_motion_controller(&self) -> Result<&LowLevelMotionController> {
        self.core.ensure_connected()?;
        Ok(&self.low)
    }

    /// 传感器控制器
    pub fn sensor_controller(&self) -> Result<&SensorController> {
        self.core.ensure_connected()?;
        Ok(&self.sensor)
    }

    /// 状态监控器
    pub fn state_monitor(&self) -> Result<&StateMonitor> {
        self.core.ensure_connected()?;
        Ok(&self.monitor)
    }
}

impl Drop for MagicRobot {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_initialize_exactly_once() {
        let robot = MagicRobot::new(MockTransport::new());
        assert!(robot.initialize("192.168.55.10"));
        assert!(!robot.initialize("192.168.55.10"));
        assert_eq!(robot.connection_state(), ConnectionState::Initialized);
    }

    #[test]
    fn test_initialize_rejects_empty_endpoint() {
        let robot = MagicRobot::new(MockTransport::new());
        assert!(!robot.initialize(""));
        assert_eq!(robot.connection_state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn test_connect_requires_initialize() {
        let robot = MagicRobot::new(MockTransport::new());
        assert!(robot.connect().is_err());
    }

    #[test]
    fn test_accessors_fail_before_connect() {
        let robot = MagicRobot::new(MockTransport::new());
        robot.initialize("192.168.55.10");
        let err = robot.high_level_motion_controller().unwrap_err();
        assert!(matches!(err, SdkError::NotConnected));
        assert!(robot.low_level_motion_controller().is_err());
        assert!(robot.sensor_controller().is_err());
        assert!(robot.state_monitor().is_err());
    }

    #[test]
    fn test_connect_disconnect_reconnect() {
        let robot = MagicRobot::new(MockTransport::new());
        robot.initialize("192.168.55.10");
        robot.connect().unwrap();
        assert_eq!(robot.connection_state(), ConnectionState::Connected);
        assert!(robot.high_level_motion_controller().is_ok());

        robot.disconnect();
        assert_eq!(robot.connection_state(), ConnectionState::Disconnected);
        assert!(robot.high_level_motion_controller().is_err());

        // 重连无需重新 initialize
        robot.connect().unwrap();
        assert_eq!(robot.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_shutdown_idempotent() {
        let robot = MagicRobot::new(MockTransport::new());
        robot.initialize("192.168.55.10");
        robot.connect().unwrap();
        robot.shutdown();
        robot.shutdown();
        assert_eq!(robot.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_failed_level_switch_keeps_previous_level() {
        let transport = MockTransport::new();
        let robot = MagicRobot::new(transport.clone());
        robot.initialize("192.168.55.10");
        robot.connect().unwrap();

        transport.fail_next_request(SdkError::Timeout(100));
        let result = robot.set_motion_control_level(ControllerLevel::LowLevel);
        assert!(result.is_err());
        assert_eq!(robot.motion_control_level(), ControllerLevel::HighLevel);

        robot.set_motion_control_level(ControllerLevel::LowLevel).unwrap();
        assert_eq!(robot.motion_control_level(), ControllerLevel::LowLevel);
    }

    #[test]
    fn test_sdk_version() {
        let robot = MagicRobot::new(MockTransport::new());
        assert!(!robot.sdk_version().is_empty());
    }
}
