//! 运动控制数据类型
//!
//! 判别值与固件侧枚举保持一致（`i32`），通过 `num_enum` 完成与
//! 原始值的互转，非法值在边界处转换失败而不是 panic。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 下肢关节数量
pub const LEG_JOINT_NUM: usize = 12;

/// 低层控制循环默认周期（毫秒）
pub const DEFAULT_PERIOD_MS: u64 = 2;

/// 运动控制器层级
///
/// 同一时刻会话内有且只有一个层级处于激活状态，
/// 切换由 `MagicRobot::set_motion_control_level` 完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum ControllerLevel {
    /// 高层控制（步态/摇杆/特技/头部）
    HighLevel = 1,
    /// 低层控制（实时关节指令）
    LowLevel = 2,
}

/// 步态模式（固件状态机的状态集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum GaitMode {
    /// 掉落（关闭电机使能）
    Passive = 0,
    /// 位控站立
    StandR = 2,
    /// 力控站立、姿态展示
    StandB = 3,
    /// 快跑
    RunFast = 8,
    /// 下爬楼梯 / 盲走 / 慢跑
    DownClimbStairs = 9,
    /// 小跑
    Trot = 10,
    /// 跳跃
    Pronk = 11,
    /// 前后跳
    Bound = 12,
    /// 交叉步
    Amble = 14,
    /// 爬行
    Crawl = 29,
    /// 低层 SDK 步态（实时关节控制的前置条件）
    LowLevelSdk = 30,
    /// 缓走
    Walk = 39,
    /// 上爬楼梯（全地形）
    UpClimbStairs = 56,
    /// 默认
    Default = 99,
    /// 全地形
    RlTerrain = 110,
    /// 跌倒爬起
    RlFallRecovery = 111,
    /// 倒立
    RlHandStand = 112,
    /// 正立
    RlFootStand = 113,
    /// 进入 RL
    EnterRl = 1001,
    /// 无步态
    None = 9999,
}

impl GaitMode {
    /// 是否为可行走步态（摇杆指令在这些步态下才有运动语义）
    pub fn is_locomotion(&self) -> bool {
        matches!(
            self,
            GaitMode::RunFast
                | GaitMode::DownClimbStairs
                | GaitMode::Trot
                | GaitMode::Amble
                | GaitMode::Crawl
                | GaitMode::Walk
                | GaitMode::UpClimbStairs
                | GaitMode::RlTerrain
        )
    }
}

/// 特技动作（固件动作 ID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum TrickAction {
    None = 0,
    WiggleHip = 26,
    SwingBody = 27,
    Stretch = 28,
    Stomp = 29,
    JumpJack = 30,
    SpaceWalk = 31,
    Imitate = 32,
    ShakeHead = 33,
    PushUp = 34,
    CheerUp = 35,
    HighFives = 36,
    Scratch = 37,
    HighJump = 38,
    SwingDance = 39,
    LeapFrog = 40,
    BackFlip = 41,
    FrontFlip = 42,
    SpinJumpLeft = 43,
    SpinJumpRight = 44,
    JumpFront = 45,
    ActCute = 46,
    Boxing = 47,
    SideSomersault = 48,
    RandomDance = 49,
    LeftSideSomersault = 84,
    RightSideSomersault = 85,
    Dance2 = 91,
    EmergencyStop = 101,
    LieDown = 102,
    RecoveryStand = 103,
    HappyNewYear = 105,
    SlowGoFront = 108,
    SlowGoBack = 109,
    BackHome = 110,
    LeaveHome = 111,
    TurnAround = 112,
    Dance = 115,
    RollAbout = 116,
    ShakeRightHand = 117,
    ShakeLeftHand = 118,
    SitDown = 119,
}

/// 高层摇杆指令
///
/// 四个轴均为 [-1.0, 1.0] 归一化值。指令是瞬时意图，按固定节拍
/// （建议 10ms）重复发送，每次发送完整替换上一次的轴值，不做累积。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoystickCommand {
    /// 左摇杆 X 轴（横移，-1 左 / +1 右）
    pub left_x_axis: f32,
    /// 左摇杆 Y 轴（前进，-1 后 / +1 前）
    pub left_y_axis: f32,
    /// 右摇杆 X 轴（旋转，-1 左旋 / +1 右旋）
    pub right_x_axis: f32,
    /// 右摇杆 Y 轴（保留）
    pub right_y_axis: f32,
}

impl JoystickCommand {
    /// 全部轴是否为有限值且落在 [-1, 1] 内
    pub fn is_valid(&self) -> bool {
        [
            self.left_x_axis,
            self.left_y_axis,
            self.right_x_axis,
            self.right_y_axis,
        ]
        .iter()
        .all(|v| v.is_finite() && (-1.0..=1.0).contains(v))
    }
}

/// 头部姿态欧拉角（弧度）
///
/// 范围约定（±60° 对应的弧度）由调用方保证，SDK 原样转发。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// 单个下肢关节的控制命令
///
/// 最终下发给电机的力矩为
/// `tau = tau_des + kp*(q_des - q) + kd*(dq_des - dq)`。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleLegJointCommand {
    /// 期望关节位置 [rad]
    pub q_des: f32,
    /// 期望关节速度 [rad/s]
    pub dq_des: f32,
    /// 前馈力矩 [N*m]
    pub tau_des: f32,
    /// 位置增益，必须为正
    pub kp: f32,
    /// 速度增益，必须为正
    pub kd: f32,
}

/// 整个下肢控制命令（每个控制周期下发一次）
///
/// 腿序为 FR、FL、RR、RL，每腿关节序为 HAA、HFE、KFE。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegJointCommand {
    /// 时间戳（纳秒）
    pub timestamp: i64,
    /// 12 个关节的控制命令
    pub cmd: [SingleLegJointCommand; LEG_JOINT_NUM],
}

/// 单个下肢关节的测量状态
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleLegJointState {
    /// 关节位置 [rad]
    pub q: f32,
    /// 关节速度 [rad/s]
    pub dq: f32,
    /// 估计力矩 [N*m]
    pub tau_est: f32,
}

/// 整个下肢状态（由硬件按控制周期异步产生）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegState {
    /// 时间戳（纳秒）
    pub timestamp: i64,
    /// 12 个关节的测量状态
    pub state: [SingleLegJointState; LEG_JOINT_NUM],
}
