//! 高层运动控制器
//!
//! 语义层面的动作控制：步态切换、特技、摇杆遥操、头部姿态。
//! 所有变更类操作要求当前控制级别为 `HighLevel`，否则返回
//! `WrongControlLevel`。
//!
//! # 步态切换的异步语义
//!
//! `set_gait` 在请求排入机器人侧队列时即返回 OK，此时切换尚未完成；
//! 实际步态要等底层控制器完成切换后才能从 `get_gait` 读到。需要
//! 同步语义的调用方使用 [`HighLevelMotionController::wait_for_gait`]，
//! 而不是手写 sleep 轮询。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SdkError};
use crate::robot::SessionCore;
use crate::transport::{Request, Response};
use crate::types::{ControllerLevel, EulerAngles, GaitMode, JoystickCommand, TrickAction};

/// 步态确认轮询间隔
const GAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct HighLevelMotionController {
    core: Arc<SessionCore>,
    is_shutdown: AtomicBool,
}

impl std::fmt::Debug for HighLevelMotionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighLevelMotionController")
            .field("is_shutdown", &self.is_shutdown)
            .finish_non_exhaustive()
    }
}

impl HighLevelMotionController {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        HighLevelMotionController {
            core,
            is_shutdown: AtomicBool::new(false),
        }
    }

    fn require_high_level(&self) -> Result<()> {
        self.core.ensure_connected()?;
        self.core.arbiter.require(ControllerLevel::HighLevel)
    }

    /// 请求切换步态模式
    ///
    /// 请求被受理（排队）即返回 OK，不等待切换完成；请求当前已
    /// 激活的步态是空操作。`LowLevelSdk` 是低层控制的专属步态，
    /// 允许在低层级别下请求，其余目标要求高层级别。
    pub fn set_gait(&self, gait_mode: GaitMode) -> Result<()> {
        self.core.ensure_connected()?;
        if gait_mode != GaitMode::LowLevelSdk {
            self.core.arbiter.require(ControllerLevel::HighLevel)?;
        }
        self.core.request(Request::SetGait(gait_mode)).map(|_| ())
    }

    /// 读取当前已生效的步态模式
    pub fn get_gait(&self) -> Result<GaitMode> {
        match self.core.request(Request::GetGait)? {
            Response::Gait(gait) => Ok(gait),
            other => Err(SdkError::Internal(format!(
                "unexpected response to GetGait: {other:?}"
            ))),
        }
    }

    /// 轮询等待步态切换生效
    ///
    /// 以 10ms 间隔轮询 `get_gait` 直至读到 `target`。
    /// `timeout` 为 `None` 时无限等待（核心自身不设超时）。
    pub fn wait_for_gait(&self, target: GaitMode, timeout: Option<Duration>) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.get_gait()? == target {
                return Ok(());
            }
            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    return Err(SdkError::Timeout(limit.as_millis() as u64));
                }
            }
            spin_sleep::sleep(GAIT_POLL_INTERVAL);
        }
    }

    /// 执行特技动作
    ///
    /// 发起即返回，叠加在当前步态之上，不改变步态状态机的状态。
    pub fn execute_trick(&self, trick_action: TrickAction) -> Result<()> {
        self.require_high_level()?;
        self.core
            .request(Request::ExecuteTrick(trick_action))
            .map(|_| ())
    }

    /// 发送实时摇杆指令
    ///
    /// 设计为按固定节拍（10ms）重复调用；每次调用完整替换上一次的
    /// 轴意图，无累积。轴值必须为有限值且在 [-1, 1] 内。
    pub fn send_joystick_command(&self, joy_command: JoystickCommand) -> Result<()> {
        self.require_high_level()?;
        if !joy_command.is_valid() {
            return Err(SdkError::InvalidArgument(format!(
                "joystick axes must be finite and within [-1, 1]: {joy_command:?}"
            )));
        }
        self.core.request(Request::Joystick(joy_command)).map(|_| ())
    }

    /// 获取当前头部姿态
    pub fn get_current_head_position(&self) -> Result<EulerAngles> {
        self.core.ensure_connected()?;
        match self.core.request(Request::GetHeadPosition)? {
            Response::HeadPosition(angles) => Ok(angles),
            other => Err(SdkError::Internal(format!(
                "unexpected response to GetHeadPosition: {other:?}"
            ))),
        }
    }

    /// 设置头部姿态（弧度）
    ///
    /// 角度范围（±60° 对应弧度）由调用方保证，越界值原样转发。
    pub fn set_head_position(&self, euler_angles: EulerAngles) -> Result<()> {
        self.require_high_level()?;
        self.core
            .request(Request::SetHeadPosition(euler_angles))
            .map(|_| ())
    }

    /// 关闭控制器（幂等）
    pub fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("high level motion controller shut down");
    }
}
