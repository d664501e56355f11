//! 机器人状态监控器
//!
//! 拉取式的健康状态快照：故障列表与电池（BMS）数据。每次
//! `get_current_state` 向机器人发起一次查询，同时更新本地缓存；
//! `last_state` 无阻塞返回最近一次成功拉取的快照。

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::error::{Result, SdkError};
use crate::robot::SessionCore;
use crate::transport::{Request, Response};
use crate::types::RobotState;

pub struct StateMonitor {
    core: Arc<SessionCore>,
    cached: ArcSwap<RobotState>,
}

impl StateMonitor {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        StateMonitor {
            core,
            cached: ArcSwap::from_pointee(RobotState::default()),
        }
    }

    /// 拉取机器人当前状态（故障 + BMS）
    ///
    /// 成功时同时刷新本地缓存。
    pub fn get_current_state(&self) -> Result<RobotState> {
        match self.core.request(Request::GetRobotState)? {
            Response::RobotState(state) => {
                self.cached.store(Arc::new(state.clone()));
                Ok(state)
            }
            other => Err(SdkError::Internal(format!(
                "unexpected response to GetRobotState: {other:?}"
            ))),
        }
    }

    /// 最近一次成功拉取的状态快照（无阻塞，不发起查询）
    pub fn last_state(&self) -> Arc<RobotState> {
        self.cached.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::MagicRobot;
    use crate::transport::mock::MockTransport;
    use crate::types::{BatteryState, BmsData, Fault, PowerSupplyStatus};

    fn connected_robot() -> (MockTransport, MagicRobot) {
        let transport = MockTransport::new();
        let robot = MagicRobot::new(transport.clone());
        robot.initialize("192.168.55.10");
        robot.connect().unwrap();
        (transport, robot)
    }

    #[test]
    fn test_get_current_state() {
        let (_transport, robot) = connected_robot();
        let monitor = robot.state_monitor().unwrap();

        let state = monitor.get_current_state().unwrap();
        assert!(state.faults.is_empty());
        assert!(state.bms_data.battery_percentage > 0.0);
    }

    #[test]
    fn test_faults_surface_in_state() {
        let (transport, robot) = connected_robot();
        let monitor = robot.state_monitor().unwrap();

        transport.set_robot_state(RobotState {
            faults: vec![Fault {
                error_code: 3101,
                error_message: "motor over temperature".into(),
            }],
            bms_data: BmsData {
                battery_percentage: 12.0,
                battery_health: 90.0,
                battery_state: BatteryState::Good,
                power_supply_status: PowerSupplyStatus::Discharging,
            },
        });

        let state = monitor.get_current_state().unwrap();
        assert_eq!(state.faults.len(), 1);
        assert_eq!(state.faults[0].error_code, 3101);
        assert!((state.bms_data.battery_percentage - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_last_state_caches_previous_pull() {
        let (transport, robot) = connected_robot();
        let monitor = robot.state_monitor().unwrap();

        monitor.get_current_state().unwrap();
        let cached = monitor.last_state();
        assert!(cached.faults.is_empty());

        // 查询失败不影响缓存
        transport.fail_next_request(SdkError::Timeout(100));
        assert!(monitor.get_current_state().is_err());
        assert!(monitor.last_state().faults.is_empty());
    }

    #[test]
    fn test_monitor_requires_connection() {
        let robot = MagicRobot::new(MockTransport::new());
        robot.initialize("192.168.55.10");
        assert!(robot.state_monitor().is_err());
    }
}
