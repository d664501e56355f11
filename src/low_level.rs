//! 低层运动控制器
//!
//! 直接面向 12 个下肢关节的实时控制回路：
//!
//! - **指令方向**: 调用方按固定周期调用 `publish_leg_command`，核心
//!   不会自动重发上一条指令，意图与执行之间没有缓冲——调用方停顿
//!   即执行停顿，这是刻意的低延迟设计；
//! - **状态方向**: `subscribe_leg_state` 注册进程内唯一的投递路径，
//!   最新的 `LegState` 快照经专用分发线程异步送达，与指令发布完全
//!   解耦（无请求/响应耦合）。
//!
//! 前置条件：控制级别为 `LowLevel`，且步态已切到 `LowLevelSdk`
//! （经步态状态机的异步转换到达）。级别在本地校验；步态门控在
//! 硬件边界生效，不满足时指令静默无效。
//!
//! 回调在分发线程中执行，阻塞超过控制周期会触发有界背压
//! （丢弃最旧帧，见 [`crate::dispatch`]）。

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::error::{Result, SdkError};
use crate::robot::SessionCore;
use crate::transport::{Request, SubscriptionId, TelemetryChannel, TelemetryFrame};
use crate::types::{ControllerLevel, LegJointCommand, LegState, DEFAULT_PERIOD_MS};

struct LegSubscription {
    dispatcher: Dispatcher,
    sub_id: SubscriptionId,
}

pub struct LowLevelMotionController {
    core: Arc<SessionCore>,
    period_ms: AtomicU64,
    subscription: Mutex<Option<LegSubscription>>,
}

impl LowLevelMotionController {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        LowLevelMotionController {
            core,
            period_ms: AtomicU64::new(DEFAULT_PERIOD_MS),
            subscription: Mutex::new(None),
        }
    }

    fn require_low_level(&self) -> Result<()> {
        self.core.ensure_connected()?;
        self.core.arbiter.require(ControllerLevel::LowLevel)
    }

    /// 设置控制回路周期（毫秒）
    ///
    /// 小于 1ms 的值回落到默认 2ms；建议不低于 2ms。
    pub fn set_period_ms(&self, period_ms: u64) {
        let period_ms = if period_ms < 1 {
            tracing::warn!(
                requested = period_ms,
                "period below 1 ms, falling back to default {} ms",
                DEFAULT_PERIOD_MS
            );
            DEFAULT_PERIOD_MS
        } else {
            period_ms
        };
        self.period_ms.store(period_ms, Ordering::Relaxed);
        // 已连接时同步到机器人侧，失败只记录（本地周期仍然生效）
        if self.core.ensure_connected().is_ok() {
            if let Err(e) = self.core.request(Request::SetPeriodMs(period_ms)) {
                tracing::warn!("failed to propagate period to robot: {e}");
            }
        }
    }

    /// 当前控制回路周期（毫秒）
    pub fn period_ms(&self) -> u64 {
        self.period_ms.load(Ordering::Relaxed)
    }

    /// 订阅下肢关节状态
    ///
    /// 每进程只保留一条投递路径：重复订阅会替换旧回调。
    /// 前置条件不满足时返回错误且不改动现有订阅。
    pub fn subscribe_leg_state<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<LegState>) + Send + 'static,
    {
        self.require_low_level()?;

        let (dispatcher, sink) = Dispatcher::spawn("leg-state", move |frame| {
            if let TelemetryFrame::LegState(state) = frame {
                callback(Arc::new(state));
            }
        });
        let sub_id = self.core.subscribe(TelemetryChannel::LegState, sink)?;

        let mut guard = self.subscription.lock();
        if let Some(mut old) = guard.replace(LegSubscription { dispatcher, sub_id }) {
            self.core.unsubscribe(old.sub_id);
            old.dispatcher.shutdown();
        }
        Ok(())
    }

    /// 发布下肢关节控制指令
    ///
    /// 必须由调用方的控制回路以不低于配置周期的节拍调用；核心不
    /// 缓冲、不重发。增益必须为非负有限值，目标值必须有限。
    pub fn publish_leg_command(&self, command: &LegJointCommand) -> Result<()> {
        self.require_low_level()?;
        for (i, joint) in command.cmd.iter().enumerate() {
            let targets_finite = joint.q_des.is_finite()
                && joint.dq_des.is_finite()
                && joint.tau_des.is_finite();
            let gains_valid = joint.kp.is_finite()
                && joint.kd.is_finite()
                && joint.kp >= 0.0
                && joint.kd >= 0.0;
            if !targets_finite || !gains_valid {
                return Err(SdkError::InvalidArgument(format!(
                    "joint {i}: targets must be finite and gains non-negative"
                )));
            }
        }
        self.core
            .request(Request::PublishLegCommand(*command))
            .map(|_| ())
    }

    /// 运行固定周期控制回路（阻塞）
    ///
    /// 使用自旋睡眠实现低抖动定时，每个周期调用一次 `f` 产生指令并
    /// 发布。`f` 返回 `None` 或发布出错时回路结束；设置了
    /// `max_ticks` 时运行到该次数后正常返回。
    pub fn run_control_loop<F>(&self, config: ControlLoopConfig, mut f: F) -> Result<()>
    where
        F: FnMut(u64) -> Option<LegJointCommand>,
    {
        let period = Duration::from_millis(self.period_ms());
        let sleeper = spin_sleep::SpinSleeper::default();
        let mut tick: u64 = 0;

        loop {
            if let Some(max) = config.max_ticks {
                if tick >= max {
                    return Ok(());
                }
            }
            let Some(command) = f(tick) else {
                return Ok(());
            };
            self.publish_leg_command(&command)?;
            tick += 1;
            sleeper.sleep(period);
        }
    }

    /// 关闭控制器，终止投递路径并注销订阅（幂等）
    ///
    /// 可与在途发布或回调并发调用；返回后不再有回调被调用。
    pub fn shutdown(&self) {
        if let Some(mut sub) = self.subscription.lock().take() {
            self.core.unsubscribe(sub.sub_id);
            sub.dispatcher.shutdown();
            tracing::debug!("low level motion controller shut down");
        }
    }
}

impl Drop for LowLevelMotionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 控制回路配置
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlLoopConfig {
    /// 最大周期数（`None` 表示无限运行）
    pub max_ticks: Option<u64>,
}
