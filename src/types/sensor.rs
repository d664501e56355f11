//! 传感器数据类型
//!
//! 结构与 ROS2 传感器消息保持一致的字段布局，方便与上层
//! 感知/导航栈对接。所有数据均为会话期内存对象，SDK 不落盘。

/// 消息头（时间戳 + 坐标系）
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// 时间戳（纳秒）
    pub stamp: i64,
    /// 坐标系名称
    pub frame_id: String,
}

/// IMU 数据
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Imu {
    /// 时间戳（纳秒）
    pub timestamp: i64,
    /// 姿态四元数 (w, x, y, z)
    pub orientation: [f64; 4],
    /// 角速度 [rad/s]
    pub angular_velocity: [f64; 3],
    /// 线加速度 [m/s^2]
    pub linear_acceleration: [f64; 3],
    /// 温度 [摄氏度]
    pub temperature: f32,
}

/// 激光雷达扫描数据
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaserScan {
    pub header: Header,
    pub angle_min: f32,
    pub angle_max: f32,
    pub angle_increment: f32,
    pub time_increment: f32,
    pub scan_time: f32,
    pub range_min: f32,
    pub range_max: f32,
    pub ranges: Vec<f64>,
    pub intensities: Vec<f64>,
}

/// 图像数据
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Image {
    pub header: Header,
    /// 图像高度（像素）
    pub height: i32,
    /// 图像宽度（像素）
    pub width: i32,
    /// 编码类型，如 "rgb8"、"mono8"、"16UC1"
    pub encoding: String,
    pub is_bigendian: bool,
    /// 每行字节数
    pub step: i32,
    pub data: Vec<u8>,
}

/// 相机内参与畸变信息
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraInfo {
    pub header: Header,
    pub height: i32,
    pub width: i32,
    /// 畸变模型，例如 "plumb_bob"
    pub distortion_model: String,
    /// 畸变参数
    pub d: Vec<f64>,
    /// 内参矩阵
    pub k: [f64; 9],
    /// 矫正矩阵
    pub r: [f64; 9],
    /// 投影矩阵
    pub p: [f64; 12],
}

/// 压缩图像（双目相机流使用）
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressedImage {
    pub header: Header,
    /// 压缩格式，如 "jpeg"
    pub format: String,
    pub data: Vec<u8>,
}

/// 浮点数多维数组（TOF / 超声波数据载体）
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Float32MultiArray {
    pub data: Vec<f32>,
}

/// 头部触摸数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeadTouch {
    pub data: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let scan = LaserScan::default();
        assert!(scan.ranges.is_empty());

        let info = CameraInfo::default();
        assert_eq!(info.k.len(), 9);
        assert_eq!(info.p.len(), 12);
    }
}
