//! 端到端集成测试
//!
//! 使用进程内 Mock 传输模拟机器人服务，验证完整的会话生命周期、
//! 低层控制回路与多通道遥测流程。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use magicdog_sdk::prelude::*;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

fn connected_robot() -> (MockTransport, MagicRobot) {
    init_tracing();
    let transport = MockTransport::new();
    transport.set_gait_latency(Duration::from_millis(10));
    let robot = MagicRobot::new(transport.clone());
    assert!(robot.initialize("192.168.55.10"));
    robot.connect().unwrap();
    (transport, robot)
}

/// 切到低层控制并等待 LowLevelSdk 步态生效
fn enter_low_level(robot: &MagicRobot) {
    robot
        .set_motion_control_level(ControllerLevel::LowLevel)
        .unwrap();
    let high = robot.high_level_motion_controller().unwrap();
    high.set_gait(GaitMode::LowLevelSdk).unwrap();
    high.wait_for_gait(GaitMode::LowLevelSdk, Some(Duration::from_secs(2)))
        .unwrap();
}

#[test]
fn test_full_low_level_session() {
    let (_transport, robot) = connected_robot();
    enter_low_level(&robot);

    let low = robot.low_level_motion_controller().unwrap();
    low.set_period_ms(2);

    let received = Arc::new(AtomicU32::new(0));
    let received_clone = received.clone();
    low.subscribe_leg_state(move |state| {
        assert_eq!(state.state.len(), LEG_JOINT_NUM);
        received_clone.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    // 订阅后 1 秒内必须有状态回调
    let deadline = std::time::Instant::now() + Duration::from_secs(1);
    while received.load(Ordering::Relaxed) == 0 {
        assert!(std::time::Instant::now() < deadline, "no leg state within 1s");
        std::thread::sleep(Duration::from_millis(5));
    }

    robot.shutdown();
    let at_shutdown = received.load(Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(received.load(Ordering::Relaxed), at_shutdown);
}

#[test]
fn test_joint_interpolation_control_loop() {
    let (transport, robot) = connected_robot();
    enter_low_level(&robot);

    let low = robot.low_level_motion_controller().unwrap();
    low.set_period_ms(2);

    // 每条腿的目标关节角（hip, thigh, calf）
    let target = [0.0f32, 1.0477, -2.0944];
    let start = transport.joint_positions();
    const TICKS: u64 = 1000;

    low.run_control_loop(
        ControlLoopConfig {
            max_ticks: Some(TICKS),
        },
        |tick| {
            let ratio = (tick + 1) as f32 / TICKS as f32;
            let mut cmd = LegJointCommand::default();
            for (i, joint) in cmd.cmd.iter_mut().enumerate() {
                let goal = target[i % 3];
                joint.q_des = start[i] + (goal - start[i]) * ratio;
                joint.kp = 100.0;
                joint.kd = 1.2;
            }
            Some(cmd)
        },
    )
    .unwrap();

    assert_eq!(transport.leg_command_count(), TICKS);
    let q = transport.joint_positions();
    for (i, &qi) in q.iter().enumerate() {
        let goal = target[i % 3];
        assert!(
            (qi - goal).abs() < 1e-3,
            "joint {i}: q={qi}, expected {goal}"
        );
    }
}

#[test]
fn test_sensor_close_stops_delivery_after_drain() {
    let (_transport, robot) = connected_robot();
    let sensor = robot.sensor_controller().unwrap();
    sensor.open_channel_switch().unwrap();
    sensor.open_lidar().unwrap();

    let lidar_count = Arc::new(AtomicU32::new(0));
    let lidar_clone = lidar_count.clone();
    sensor
        .subscribe_lidar(move |scan| {
            assert!(!scan.ranges.is_empty());
            lidar_clone.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert!(lidar_count.load(Ordering::Relaxed) > 0);

    sensor.close_lidar().unwrap();
    sensor.close_channel_switch().unwrap();
    // 关闭后允许有界的排空窗口，之后不再有回调
    std::thread::sleep(Duration::from_millis(200));
    let after_drain = lidar_count.load(Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(lidar_count.load(Ordering::Relaxed), after_drain);
}

#[test]
fn test_wrong_level_does_not_disturb_subscriptions() {
    let (_transport, robot) = connected_robot();
    let sensor = robot.sensor_controller().unwrap();
    sensor.open_channel_switch().unwrap();

    let imu_count = Arc::new(AtomicU32::new(0));
    let imu_clone = imu_count.clone();
    sensor
        .subscribe_imu(move |_| {
            imu_clone.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    robot
        .set_motion_control_level(ControllerLevel::LowLevel)
        .unwrap();
    let high = robot.high_level_motion_controller().unwrap();
    let err = high.execute_trick(TrickAction::LieDown).unwrap_err();
    assert!(matches!(err, SdkError::WrongControlLevel { .. }));

    // 级别错误不影响遥测订阅
    let before = imu_count.load(Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(200));
    assert!(imu_count.load(Ordering::Relaxed) > before);
}

#[test]
fn test_high_level_command_sequence() {
    let (transport, robot) = connected_robot();
    let high = robot.high_level_motion_controller().unwrap();

    high.set_gait(GaitMode::StandR).unwrap();
    high.wait_for_gait(GaitMode::StandR, Some(Duration::from_secs(2)))
        .unwrap();
    high.set_gait(GaitMode::Trot).unwrap();
    high.wait_for_gait(GaitMode::Trot, Some(Duration::from_secs(2)))
        .unwrap();

    // 摇杆遥操：固定节拍下每次调用完整替换轴意图
    for i in 0..10 {
        let cmd = JoystickCommand {
            left_y_axis: (i as f32) / 10.0,
            ..Default::default()
        };
        high.send_joystick_command(cmd).unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }
    let last = transport.last_joystick().unwrap();
    assert!((last.left_y_axis - 0.9).abs() < f32::EPSILON);

    high.execute_trick(TrickAction::RecoveryStand).unwrap();
    assert_eq!(transport.last_trick(), Some(TrickAction::RecoveryStand));
    assert_eq!(high.get_gait().unwrap(), GaitMode::Trot);
}

#[test]
fn test_state_monitor_over_session() {
    let (transport, robot) = connected_robot();
    let monitor = robot.state_monitor().unwrap();

    let state = monitor.get_current_state().unwrap();
    assert!(state.faults.is_empty());

    transport.set_robot_state(RobotState {
        faults: vec![Fault {
            error_code: 0x3201,
            error_message: "laser no data".into(),
        }],
        bms_data: state.bms_data,
    });
    let state = monitor.get_current_state().unwrap();
    assert_eq!(state.faults.len(), 1);
    assert_eq!(state.faults[0].error_code, 0x3201);
}

#[test]
fn test_disconnect_blocks_operations_reconnect_restores() {
    let (_transport, robot) = connected_robot();
    let high = robot.high_level_motion_controller().unwrap();
    high.set_gait(GaitMode::StandB).unwrap();

    robot.disconnect();
    assert!(robot.high_level_motion_controller().is_err());

    robot.connect().unwrap();
    let high = robot.high_level_motion_controller().unwrap();
    high.wait_for_gait(GaitMode::StandB, Some(Duration::from_secs(2)))
        .unwrap();
}

#[test]
fn test_resubscribe_keeps_single_delivery_path() {
    let (_transport, robot) = connected_robot();
    enter_low_level(&robot);
    let low = robot.low_level_motion_controller().unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let log_a = log.clone();
    low.subscribe_leg_state(move |_| {
        log_a.lock().unwrap().push('a');
    })
    .unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let log_b = log.clone();
    low.subscribe_leg_state(move |_| {
        log_b.lock().unwrap().push('b');
    })
    .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    let entries = log.lock().unwrap().clone();
    assert!(entries.contains(&'a'));
    assert!(entries.contains(&'b'));
    // 替换后只剩一条投递路径：'a' 不会出现在尾部
    assert_eq!(*entries.last().unwrap(), 'b');
}
