//! 传感器控制器
//!
//! 传感器数据按通道组织：每个通道有独立的订阅者集合，彼此正交。
//! 通道是否产生数据由两级开关决定：
//!
//! 1. **总开关** `open_channel_switch` / `close_channel_switch`，
//!    关闭时所有传感器通道都不发布；
//! 2. **分组开关** 雷达 / RGBD 相机 / 双目相机各自独立启停，
//!    IMU、TOF、超声波、头部触摸无分组，仅受总开关约束。
//!
//! 订阅与开关解耦：允许先订阅再开通道，通道开启后开始投递；
//! 同一通道允许多个订阅者，各自独立收到全部帧。开关操作幂等，
//! 重复打开不会产生重复投递。

use parking_lot::Mutex;
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::error::{Result, SdkError};
use crate::robot::SessionCore;
use crate::transport::{Request, SensorGroup, SubscriptionId, TelemetryChannel, TelemetryFrame};
use crate::types::{
    CameraInfo, CompressedImage, Float32MultiArray, HeadTouch, Image, Imu, LaserScan,
};

struct Subscription {
    dispatcher: Dispatcher,
    sub_id: SubscriptionId,
}

pub struct SensorController {
    core: Arc<SessionCore>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SensorController {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        SensorController {
            core,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    fn open_group(&self, group: SensorGroup, name: &str) -> Result<()> {
        self.core
            .request(Request::OpenSensor(group))
            .map(|_| ())
            .map_err(|e| SdkError::ChannelOpenFailed {
                channel: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn close_group(&self, group: SensorGroup, name: &str) -> Result<()> {
        self.core
            .request(Request::CloseSensor(group))
            .map(|_| ())
            .map_err(|e| SdkError::ChannelCloseFailed {
                channel: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// 打开传感器数据总开关
    pub fn open_channel_switch(&self) -> Result<()> {
        self.core
            .request(Request::OpenChannelSwitch)
            .map(|_| ())
            .map_err(|e| SdkError::ChannelOpenFailed {
                channel: "channel_switch".into(),
                reason: e.to_string(),
            })
    }

    /// 关闭传感器数据总开关（所有通道停止发布）
    pub fn close_channel_switch(&self) -> Result<()> {
        self.core
            .request(Request::CloseChannelSwitch)
            .map(|_| ())
            .map_err(|e| SdkError::ChannelCloseFailed {
                channel: "channel_switch".into(),
                reason: e.to_string(),
            })
    }

    /// 打开激光雷达
    pub fn open_lidar(&self) -> Result<()> {
        self.open_group(SensorGroup::Lidar, "lidar")
    }

    /// 关闭激光雷达
    pub fn close_lidar(&self) -> Result<()> {
        self.close_group(SensorGroup::Lidar, "lidar")
    }

    /// 打开 RGBD 相机
    pub fn open_rgbd_camera(&self) -> Result<()> {
        self.open_group(SensorGroup::RgbdCamera, "rgbd_camera")
    }

    /// 关闭 RGBD 相机
    pub fn close_rgbd_camera(&self) -> Result<()> {
        self.close_group(SensorGroup::RgbdCamera, "rgbd_camera")
    }

    /// 打开双目相机
    pub fn open_binocular_camera(&self) -> Result<()> {
        self.open_group(SensorGroup::BinocularCamera, "binocular_camera")
    }

    /// 关闭双目相机
    pub fn close_binocular_camera(&self) -> Result<()> {
        self.close_group(SensorGroup::BinocularCamera, "binocular_camera")
    }

    /// 注册通道订阅（通用路径）
    ///
    /// 每个订阅者一条独立的有界队列和分发线程；允许在通道开启前
    /// 订阅，开启后开始投递。
    fn subscribe_channel<T, F>(
        &self,
        channel: TelemetryChannel,
        name: &str,
        extract: fn(TelemetryFrame) -> Option<T>,
        callback: F,
    ) -> Result<()>
    where
        T: Send + 'static,
        F: Fn(Arc<T>) + Send + 'static,
    {
        self.core.ensure_connected()?;
        let (dispatcher, sink) = Dispatcher::spawn(name, move |frame| {
            if let Some(payload) = extract(frame) {
                callback(Arc::new(payload));
            }
        });
        let sub_id = self.core.subscribe(channel, sink)?;
        self.subscriptions
            .lock()
            .push(Subscription { dispatcher, sub_id });
        Ok(())
    }

    /// 订阅激光雷达点云
    pub fn subscribe_lidar<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<LaserScan>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::Lidar,
            "lidar",
            |frame| match frame {
                TelemetryFrame::LaserScan(scan) => Some(scan),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 IMU 数据
    pub fn subscribe_imu<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Imu>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::Imu,
            "imu",
            |frame| match frame {
                TelemetryFrame::Imu(imu) => Some(imu),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 TOF 数据
    pub fn subscribe_tof<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Float32MultiArray>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::Tof,
            "tof",
            |frame| match frame {
                TelemetryFrame::MultiArray(arr) => Some(arr),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅超声波数据
    pub fn subscribe_ultra<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Float32MultiArray>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::Ultra,
            "ultra",
            |frame| match frame {
                TelemetryFrame::MultiArray(arr) => Some(arr),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅头部触摸事件
    pub fn subscribe_head_touch<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<HeadTouch>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::HeadTouch,
            "head-touch",
            |frame| match frame {
                TelemetryFrame::HeadTouch(touch) => Some(touch),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 RGBD 彩色图像
    pub fn subscribe_rgbd_color_image<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Image>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::RgbdColorImage,
            "rgbd-color",
            |frame| match frame {
                TelemetryFrame::Image(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 RGBD 深度图像
    pub fn subscribe_rgbd_depth_image<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Image>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::RgbdDepthImage,
            "rgbd-depth",
            |frame| match frame {
                TelemetryFrame::Image(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 RGBD 彩色相机标定参数
    pub fn subscribe_rgbd_color_camera_info<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<CameraInfo>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::RgbdColorCameraInfo,
            "rgbd-color-info",
            |frame| match frame {
                TelemetryFrame::CameraInfo(info) => Some(info),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅 RGBD 深度相机标定参数
    pub fn subscribe_rgbd_depth_camera_info<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<CameraInfo>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::RgbdDepthCameraInfo,
            "rgbd-depth-info",
            |frame| match frame {
                TelemetryFrame::CameraInfo(info) => Some(info),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅左目高分辨率压缩图像
    pub fn subscribe_left_binocular_high<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<CompressedImage>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::LeftBinocularHigh,
            "binocular-left-high",
            |frame| match frame {
                TelemetryFrame::CompressedImage(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅左目低分辨率压缩图像
    pub fn subscribe_left_binocular_low<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<CompressedImage>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::LeftBinocularLow,
            "binocular-left-low",
            |frame| match frame {
                TelemetryFrame::CompressedImage(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅右目低分辨率压缩图像
    pub fn subscribe_right_binocular_low<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<CompressedImage>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::RightBinocularLow,
            "binocular-right-low",
            |frame| match frame {
                TelemetryFrame::CompressedImage(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 订阅双目立体匹配输出的深度图像
    pub fn subscribe_depth_image<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Arc<Image>) + Send + 'static,
    {
        self.subscribe_channel(
            TelemetryChannel::DepthImage,
            "depth-image",
            |frame| match frame {
                TelemetryFrame::Image(img) => Some(img),
                _ => None,
            },
            callback,
        )
    }

    /// 关闭控制器，注销全部订阅并终止分发线程（幂等）
    pub fn shutdown(&self) {
        let subs = std::mem::take(&mut *self.subscriptions.lock());
        if subs.is_empty() {
            return;
        }
        for mut sub in subs {
            self.core.unsubscribe(sub.sub_id);
            sub.dispatcher.shutdown();
        }
        tracing::debug!("sensor controller shut down");
    }
}

impl Drop for SensorController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
