//! 进程内 Mock 传输实现
//!
//! 用确定性的进程内模拟代替真实机器人服务，供测试与离线仿真使用：
//!
//! - 步态切换异步生效：`SetGait` 在排队时即返回 OK，经过可配置的
//!   生效延迟后才能从 `GetGait` 观察到；
//! - 控制级别切到低层后，机器人自行转入 `LowLevelSdk` 步态；
//! - 低层指令直接作用于模拟关节（`q = q_des`），并按配置周期回发
//!   `LegState`；
//! - 传感器通道受总开关与分组开关共同约束，按固定节拍发布合成帧。

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::dispatch::TelemetrySink;
use crate::error::{Result, SdkError};
use crate::transport::{
    Request, Response, SensorGroup, SubscriptionId, TelemetryChannel, TelemetryFrame, Transport,
};
use crate::types::*;

/// 步态切换默认生效延迟
const DEFAULT_GAIT_LATENCY: Duration = Duration::from_millis(30);

/// 传感器帧发布节拍
const SENSOR_EMIT_INTERVAL: Duration = Duration::from_millis(20);

/// 模拟主循环节拍
const SIM_TICK: Duration = Duration::from_millis(1);

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

struct GaitState {
    current: GaitMode,
    pending: Option<(GaitMode, Instant)>,
}

struct Inner {
    connected: AtomicBool,
    level: RwLock<ControllerLevel>,
    gait: RwLock<GaitState>,
    head: RwLock<EulerAngles>,
    last_joystick: RwLock<Option<JoystickCommand>>,
    last_trick: RwLock<Option<TrickAction>>,
    period_ms: AtomicU64,
    switch_open: AtomicBool,
    open_groups: Mutex<HashSet<SensorGroup>>,
    subs: Mutex<HashMap<SubscriptionId, (TelemetryChannel, TelemetrySink)>>,
    next_sub: AtomicU64,
    joint_q: Mutex<[f32; LEG_JOINT_NUM]>,
    robot_state: Mutex<RobotState>,
    fail_next: Mutex<Option<SdkError>>,
    gait_latency: Mutex<Duration>,
    leg_cmd_count: AtomicU64,
    emitted: Mutex<HashMap<TelemetryChannel, u64>>,
    sim_stop: Arc<AtomicBool>,
}

/// Mock 传输（可克隆，克隆共享同一个模拟机器人）
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
    sim_thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Inner {
                connected: AtomicBool::new(false),
                level: RwLock::new(ControllerLevel::HighLevel),
                gait: RwLock::new(GaitState {
                    current: GaitMode::Default,
                    pending: None,
                }),
                head: RwLock::new(EulerAngles::default()),
                last_joystick: RwLock::new(None),
                last_trick: RwLock::new(None),
                period_ms: AtomicU64::new(DEFAULT_PERIOD_MS),
                switch_open: AtomicBool::new(false),
                open_groups: Mutex::new(HashSet::new()),
                subs: Mutex::new(HashMap::new()),
                next_sub: AtomicU64::new(1),
                joint_q: Mutex::new([0.0; LEG_JOINT_NUM]),
                robot_state: Mutex::new(RobotState {
                    faults: Vec::new(),
                    bms_data: BmsData {
                        battery_percentage: 85.0,
                        battery_health: 98.0,
                        battery_state: BatteryState::Good,
                        power_supply_status: PowerSupplyStatus::Discharging,
                    },
                }),
                fail_next: Mutex::new(None),
                gait_latency: Mutex::new(DEFAULT_GAIT_LATENCY),
                leg_cmd_count: AtomicU64::new(0),
                emitted: Mutex::new(HashMap::new()),
                sim_stop: Arc::new(AtomicBool::new(false)),
            }),
            sim_thread: Arc::new(Mutex::new(None)),
        }
    }

    // ==================== 测试辅助接口 ====================

    /// 配置步态切换生效延迟
    pub fn set_gait_latency(&self, latency: Duration) {
        *self.inner.gait_latency.lock() = latency;
    }

    /// 机器人侧当前步态（绕过请求通道直接读取）
    pub fn current_gait(&self) -> GaitMode {
        self.inner.gait.read().current
    }

    /// 最后收到的摇杆指令
    pub fn last_joystick(&self) -> Option<JoystickCommand> {
        *self.inner.last_joystick.read()
    }

    /// 最后收到的特技动作
    pub fn last_trick(&self) -> Option<TrickAction> {
        *self.inner.last_trick.read()
    }

    /// 已生效的下肢指令计数
    pub fn leg_command_count(&self) -> u64 {
        self.inner.leg_cmd_count.load(Ordering::Relaxed)
    }

    /// 指定通道累计发射的帧数（每发射节拍每通道至多一帧）
    pub fn emitted_frames(&self, channel: TelemetryChannel) -> u64 {
        self.inner.emitted.lock().get(&channel).copied().unwrap_or(0)
    }

    /// 机器人侧当前模拟关节位置
    pub fn joint_positions(&self) -> [f32; LEG_JOINT_NUM] {
        *self.inner.joint_q.lock()
    }

    /// 覆盖状态监控快照（注入故障等）
    pub fn set_robot_state(&self, state: RobotState) {
        *self.inner.robot_state.lock() = state;
    }

    /// 令下一次 `request` 失败
    pub fn fail_next_request(&self, err: SdkError) {
        *self.inner.fail_next.lock() = Some(err);
    }

    // ==================== 模拟循环 ====================

    fn start_sim(&self) {
        let mut guard = self.sim_thread.lock();
        if guard.is_some() {
            return;
        }
        self.inner.sim_stop.store(false, Ordering::Release);
        let inner = self.inner.clone();
        let stop = inner.sim_stop.clone();
        let handle = std::thread::Builder::new()
            .name("mock-robot".into())
            .spawn(move || {
                let mut last_leg = Instant::now();
                let mut last_sensor = Instant::now();
                while !stop.load(Ordering::Acquire) {
                    Inner::apply_pending_gait(&inner);

                    let period = Duration::from_millis(inner.period_ms.load(Ordering::Relaxed));
                    if last_leg.elapsed() >= period {
                        last_leg = Instant::now();
                        Inner::emit_leg_state(&inner);
                    }
                    if last_sensor.elapsed() >= SENSOR_EMIT_INTERVAL {
                        last_sensor = Instant::now();
                        Inner::emit_sensor_frames(&inner);
                    }
                    std::thread::sleep(SIM_TICK);
                }
            })
            .expect("failed to spawn mock robot thread");
        *guard = Some(handle);
    }

    fn stop_sim(&self) {
        self.inner.sim_stop.store(true, Ordering::Release);
        if let Some(handle) = self.sim_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Inner {
    fn apply_pending_gait(inner: &Arc<Inner>) {
        let mut gait = inner.gait.write();
        if let Some((target, due)) = gait.pending {
            if Instant::now() >= due {
                gait.current = target;
                gait.pending = None;
            }
        }
    }

    fn emit_leg_state(inner: &Arc<Inner>) {
        // 低层回路只在低层控制 + LowLevelSdk 步态下有数据
        if *inner.level.read() != ControllerLevel::LowLevel
            || inner.gait.read().current != GaitMode::LowLevelSdk
        {
            return;
        }
        let q = *inner.joint_q.lock();
        let mut state = LegState {
            timestamp: now_ns(),
            ..Default::default()
        };
        for (i, joint) in state.state.iter_mut().enumerate() {
            joint.q = q[i];
        }
        let subs = inner.subs.lock();
        for (channel, sink) in subs.values() {
            if *channel == TelemetryChannel::LegState {
                sink.push(TelemetryFrame::LegState(state));
            }
        }
    }

    fn emit_sensor_frames(inner: &Arc<Inner>) {
        if !inner.switch_open.load(Ordering::Acquire) {
            return;
        }
        let open_groups = inner.open_groups.lock().clone();
        let subs = inner.subs.lock();
        let mut emitted = inner.emitted.lock();
        let mut counted: HashSet<TelemetryChannel> = HashSet::new();
        for (channel, sink) in subs.values() {
            if *channel == TelemetryChannel::LegState {
                continue;
            }
            if let Some(group) = channel.group() {
                if !open_groups.contains(&group) {
                    continue;
                }
            }
            // 每发射节拍每通道只算一帧，与订阅者数量无关
            if counted.insert(*channel) {
                *emitted.entry(*channel).or_insert(0) += 1;
            }
            sink.push(Self::synthetic_frame(*channel));
        }
    }

    fn synthetic_frame(channel: TelemetryChannel) -> TelemetryFrame {
        let stamp = now_ns();
        let header = Header {
            stamp,
            frame_id: String::new(),
        };
        match channel {
            TelemetryChannel::Imu => TelemetryFrame::Imu(Imu {
                timestamp: stamp,
                orientation: [1.0, 0.0, 0.0, 0.0],
                linear_acceleration: [0.0, 0.0, 9.81],
                ..Default::default()
            }),
            TelemetryChannel::Lidar => TelemetryFrame::LaserScan(LaserScan {
                header,
                range_min: 0.1,
                range_max: 12.0,
                ranges: vec![1.0; 16],
                ..Default::default()
            }),
            TelemetryChannel::Ultra | TelemetryChannel::Tof => {
                TelemetryFrame::MultiArray(Float32MultiArray {
                    data: vec![0.5; 4],
                })
            }
            TelemetryChannel::HeadTouch => TelemetryFrame::HeadTouch(HeadTouch { data: 0 }),
            TelemetryChannel::RgbdColorImage | TelemetryChannel::RgbdDepthImage => {
                TelemetryFrame::Image(Image {
                    header,
                    height: 4,
                    width: 4,
                    encoding: "rgb8".into(),
                    step: 12,
                    data: vec![0; 48],
                    ..Default::default()
                })
            }
            TelemetryChannel::DepthImage => TelemetryFrame::Image(Image {
                header,
                height: 4,
                width: 4,
                encoding: "16UC1".into(),
                step: 8,
                data: vec![0; 32],
                ..Default::default()
            }),
            TelemetryChannel::RgbdColorCameraInfo | TelemetryChannel::RgbdDepthCameraInfo => {
                TelemetryFrame::CameraInfo(CameraInfo {
                    header,
                    height: 4,
                    width: 4,
                    distortion_model: "plumb_bob".into(),
                    ..Default::default()
                })
            }
            TelemetryChannel::LeftBinocularHigh
            | TelemetryChannel::LeftBinocularLow
            | TelemetryChannel::RightBinocularLow => {
                TelemetryFrame::CompressedImage(CompressedImage {
                    header,
                    format: "jpeg".into(),
                    data: vec![0; 16],
                })
            }
            TelemetryChannel::LegState => unreachable!("leg state handled separately"),
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, endpoint: &str, _timeout: Duration) -> Result<()> {
        if endpoint.is_empty() {
            return Err(SdkError::Internal("empty endpoint".into()));
        }
        self.inner.connected.store(true, Ordering::Release);
        self.start_sim();
        Ok(())
    }

    fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::Release);
        self.stop_sim();
    }

    fn request(&self, request: Request, _timeout: Duration) -> Result<Response> {
        if let Some(err) = self.inner.fail_next.lock().take() {
            return Err(err);
        }
        if !self.inner.connected.load(Ordering::Acquire) {
            return Err(SdkError::Internal("transport not connected".into()));
        }
        let inner = &self.inner;
        match request {
            Request::SetControlLevel(level) => {
                *inner.level.write() = level;
                if level == ControllerLevel::LowLevel {
                    // 低层接管后机器人自行转入 LowLevelSdk 步态
                    let latency = *inner.gait_latency.lock();
                    let mut gait = inner.gait.write();
                    if gait.current != GaitMode::LowLevelSdk {
                        gait.pending = Some((GaitMode::LowLevelSdk, Instant::now() + latency));
                    }
                }
                Ok(Response::Ack)
            }
            Request::SetGait(target) => {
                let latency = *inner.gait_latency.lock();
                let mut gait = inner.gait.write();
                if gait.current == target && gait.pending.is_none() {
                    // 请求当前步态：无转换的空操作
                    return Ok(Response::Ack);
                }
                // 快速连发时覆盖在途请求（last-wins）
                gait.pending = Some((target, Instant::now() + latency));
                Ok(Response::Ack)
            }
            Request::GetGait => Ok(Response::Gait(inner.gait.read().current)),
            Request::ExecuteTrick(action) => {
                *inner.last_trick.write() = Some(action);
                Ok(Response::Ack)
            }
            Request::Joystick(cmd) => {
                *inner.last_joystick.write() = Some(cmd);
                Ok(Response::Ack)
            }
            Request::GetHeadPosition => Ok(Response::HeadPosition(*inner.head.read())),
            Request::SetHeadPosition(angles) => {
                *inner.head.write() = angles;
                Ok(Response::Ack)
            }
            Request::PublishLegCommand(cmd) => {
                // 步态前置条件在硬件边界生效：不满足时指令静默无效
                if *inner.level.read() == ControllerLevel::LowLevel
                    && inner.gait.read().current == GaitMode::LowLevelSdk
                {
                    let mut q = inner.joint_q.lock();
                    for (i, joint) in cmd.cmd.iter().enumerate() {
                        q[i] = joint.q_des;
                    }
                    inner.leg_cmd_count.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Response::Ack)
            }
            Request::SetPeriodMs(ms) => {
                inner.period_ms.store(ms.max(1), Ordering::Relaxed);
                Ok(Response::Ack)
            }
            Request::OpenChannelSwitch => {
                inner.switch_open.store(true, Ordering::Release);
                Ok(Response::Ack)
            }
            Request::CloseChannelSwitch => {
                inner.switch_open.store(false, Ordering::Release);
                Ok(Response::Ack)
            }
            Request::OpenSensor(group) => {
                inner.open_groups.lock().insert(group);
                Ok(Response::Ack)
            }
            Request::CloseSensor(group) => {
                inner.open_groups.lock().remove(&group);
                Ok(Response::Ack)
            }
            Request::GetRobotState => Ok(Response::RobotState(inner.robot_state.lock().clone())),
        }
    }

    fn subscribe(&self, channel: TelemetryChannel, sink: TelemetrySink) -> Result<SubscriptionId> {
        let id = self.inner.next_sub.fetch_add(1, Ordering::Relaxed);
        self.inner.subs.lock().insert(id, (channel, sink));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.subs.lock().remove(&id);
    }
}
