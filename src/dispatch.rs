//! 订阅分发器
//!
//! 每个订阅对应一条有界队列加一个专用分发线程，回调在分发线程中
//! 执行，与指令发布完全解耦。
//!
//! # 背压策略
//!
//! 队列深度固定为 [`DISPATCH_QUEUE_DEPTH`]。回调阻塞超过投递节拍时
//! 采用 **drop-oldest**：丢弃队列中最旧的帧为新帧腾位，丢弃计数可查。
//! 单通道内保持硬件发射顺序，不同通道之间无顺序保证。
//!
//! # 停机语义
//!
//! [`Dispatcher::shutdown`] 置停止标志并发送哨兵消息，分发线程在
//! 有界时间内退出；停止标志置位后不再有任何回调被调用，可与在途
//! 投递并发执行。

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::transport::TelemetryFrame;

/// 每个订阅的队列深度
pub const DISPATCH_QUEUE_DEPTH: usize = 8;

/// 分发线程等待新帧的最大阻塞时长（停止标志的检查周期）
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Message {
    Frame(TelemetryFrame),
    Stop,
}

/// 订阅投递端
///
/// 交给传输层持有，传输层收到一帧就调用 [`TelemetrySink::push`]。
#[derive(Clone)]
pub struct TelemetrySink {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    stopped: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl TelemetrySink {
    /// 投递一帧（drop-oldest，有界，不阻塞）
    ///
    /// 分发器已停止或队列断开时静默丢弃。
    pub fn push(&self, frame: TelemetryFrame) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let mut msg = Message::Frame(frame);
        loop {
            match self.tx.try_send(msg) {
                Ok(()) => return,
                Err(TrySendError::Full(m)) => {
                    // 丢弃最旧帧后重试
                    if self.rx.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    msg = m;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// 累计丢帧数
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 订阅分发器（队列消费端 + 分发线程句柄）
pub struct Dispatcher {
    tx: Sender<Message>,
    stopped: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// 启动一个分发线程，返回分发器与对应的投递端
    ///
    /// `callback` 在分发线程中执行；回调耗时超过投递节拍会触发
    /// 背压（丢弃最旧帧），这是调用方契约的一部分。
    pub fn spawn<F>(name: &str, mut callback: F) -> (Self, TelemetrySink)
    where
        F: FnMut(TelemetryFrame) + Send + 'static,
    {
        let (tx, rx) = bounded(DISPATCH_QUEUE_DEPTH);
        let stopped = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let sink = TelemetrySink {
            tx: tx.clone(),
            rx: rx.clone(),
            stopped: stopped.clone(),
            dropped,
        };

        let worker_stopped = stopped.clone();
        let worker = std::thread::Builder::new()
            .name(format!("dispatch-{name}"))
            .spawn(move || loop {
                if worker_stopped.load(Ordering::Acquire) {
                    break;
                }
                match rx.recv_timeout(STOP_POLL_INTERVAL) {
                    Ok(Message::Frame(frame)) => {
                        if worker_stopped.load(Ordering::Acquire) {
                            break;
                        }
                        callback(frame);
                    }
                    Ok(Message::Stop) => break,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .expect("failed to spawn dispatch thread");

        (
            Dispatcher {
                tx,
                stopped,
                worker: Some(worker),
            },
            sink,
        )
    }

    /// 停止分发线程并等待其退出
    ///
    /// 幂等；返回后不再有回调被调用。
    pub fn shutdown(&mut self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        // 哨兵消息仅用于尽快唤醒，队列满时靠停止标志的轮询兜底
        let _ = self.tx.try_send(Message::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("dispatch thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LegState;
    use std::sync::Mutex;

    fn leg_frame(timestamp: i64) -> TelemetryFrame {
        TelemetryFrame::LegState(LegState {
            timestamp,
            ..Default::default()
        })
    }

    #[test]
    fn test_delivery_preserves_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let (mut dispatcher, sink) = Dispatcher::spawn("test", move |frame| {
            if let TelemetryFrame::LegState(s) = frame {
                received_clone.lock().unwrap().push(s.timestamp);
            }
        });

        for i in 0..5 {
            sink.push(leg_frame(i));
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(50));
        dispatcher.shutdown();

        assert_eq!(*received.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_backpressure_drops_oldest() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let gate = Arc::new(AtomicBool::new(true));
        let gate_clone = gate.clone();

        let (mut dispatcher, sink) = Dispatcher::spawn("test", move |frame| {
            // 第一帧上模拟慢回调，让后续帧在队列中堆积
            while gate_clone.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(1));
            }
            if let TelemetryFrame::LegState(s) = frame {
                received_clone.lock().unwrap().push(s.timestamp);
            }
        });

        sink.push(leg_frame(0));
        std::thread::sleep(Duration::from_millis(20));
        // 超量投递，队列只有 DISPATCH_QUEUE_DEPTH 个位置
        for i in 1..=(DISPATCH_QUEUE_DEPTH as i64 * 4) {
            sink.push(leg_frame(i));
        }
        gate.store(false, Ordering::Release);
        std::thread::sleep(Duration::from_millis(100));
        dispatcher.shutdown();

        let got = received.lock().unwrap().clone();
        // 有界投递：堆积部分最多保留队列深度个帧
        assert!(got.len() <= 1 + DISPATCH_QUEUE_DEPTH);
        assert!(sink.dropped_frames() > 0);
        // 保留的是最新的帧
        assert_eq!(*got.last().unwrap(), DISPATCH_QUEUE_DEPTH as i64 * 4);
    }

    #[test]
    fn test_no_delivery_after_shutdown() {
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        let (mut dispatcher, sink) = Dispatcher::spawn("test", move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });

        sink.push(leg_frame(1));
        std::thread::sleep(Duration::from_millis(20));
        dispatcher.shutdown();
        let delivered = count.load(Ordering::Relaxed);

        // 停机后的投递被静默丢弃
        for i in 0..10 {
            sink.push(leg_frame(i));
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), delivered);
    }

    #[test]
    fn test_shutdown_idempotent() {
        let (mut dispatcher, _sink) = Dispatcher::spawn("test", |_| {});
        dispatcher.shutdown();
        dispatcher.shutdown();
    }

    #[test]
    fn test_shutdown_concurrent_with_push() {
        let (dispatcher, sink) = Dispatcher::spawn("test", |_| {
            std::thread::sleep(Duration::from_millis(1));
        });
        let mut dispatcher = dispatcher;

        let pusher = std::thread::spawn(move || {
            for i in 0..1000 {
                sink.push(leg_frame(i));
            }
        });
        std::thread::sleep(Duration::from_millis(5));
        dispatcher.shutdown();
        pusher.join().unwrap();
    }
}
