//! 机器人聚合状态（BMS + 故障列表）

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 故障信息
///
/// 每次状态快照携带完整的当前故障列表，整体替换而非增量更新。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fault {
    /// 故障码
    pub error_code: i32,
    /// 故障描述
    pub error_message: String,
}

/// 电池状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum BatteryState {
    #[default]
    Unknown = 0,
    Good = 1,
    Overheat = 2,
    Dead = 3,
    Overvoltage = 4,
    UnspecFailure = 5,
    Cold = 6,
    WatchdogTimerExpire = 7,
    SafetyTimerExpire = 8,
}

/// 电池充放电状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum PowerSupplyStatus {
    #[default]
    Unknown = 0,
    Charging = 1,
    Discharging = 2,
    NotCharging = 3,
    Full = 4,
}

/// 电池管理系统数据
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BmsData {
    /// 剩余电量百分比 [0, 100]
    pub battery_percentage: f32,
    /// 电池健康度
    pub battery_health: f32,
    pub battery_state: BatteryState,
    pub power_supply_status: PowerSupplyStatus,
}

/// 机器人状态快照
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 当前活跃故障列表（每快照整体替换）
    pub faults: Vec<Fault>,
    /// BMS 数据
    pub bms_data: BmsData,
}
