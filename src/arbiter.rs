//! 控制级别仲裁器
//!
//! 高层/低层控制器之间唯一的共享可变门控。写入只经由
//! [`LevelArbiter::switch`]（单写者），前置条件检查在一次调用内
//! 读到一致的值，不会观察到撕裂的切换中间态。

use parking_lot::RwLock;

use crate::error::{Result, SdkError};
use crate::types::ControllerLevel;

pub(crate) struct LevelArbiter {
    level: RwLock<ControllerLevel>,
}

impl LevelArbiter {
    /// 会话建立后默认为高层控制
    pub fn new() -> Self {
        LevelArbiter {
            level: RwLock::new(ControllerLevel::HighLevel),
        }
    }

    /// 当前激活的控制级别
    pub fn current(&self) -> ControllerLevel {
        *self.level.read()
    }

    /// 前置条件检查：要求指定级别处于激活状态
    pub fn require(&self, required: ControllerLevel) -> Result<()> {
        let current = *self.level.read();
        if current == required {
            Ok(())
        } else {
            Err(SdkError::WrongControlLevel { required, current })
        }
    }

    /// 切换级别
    ///
    /// `commit` 在写锁内执行（通常是发往机器人的切换请求）；
    /// commit 失败时本地级别保持不变。
    pub fn switch<F>(&self, target: ControllerLevel, commit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut level = self.level.write();
        if *level == target {
            return Ok(());
        }
        commit()?;
        *level = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_high_level() {
        let arbiter = LevelArbiter::new();
        assert_eq!(arbiter.current(), ControllerLevel::HighLevel);
        assert!(arbiter.require(ControllerLevel::HighLevel).is_ok());
    }

    #[test]
    fn test_require_wrong_level() {
        let arbiter = LevelArbiter::new();
        let err = arbiter.require(ControllerLevel::LowLevel).unwrap_err();
        match err {
            SdkError::WrongControlLevel { required, current } => {
                assert_eq!(required, ControllerLevel::LowLevel);
                assert_eq!(current, ControllerLevel::HighLevel);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failed_switch_keeps_previous_level() {
        let arbiter = LevelArbiter::new();
        let result = arbiter.switch(ControllerLevel::LowLevel, || {
            Err(SdkError::Timeout(100))
        });
        assert!(result.is_err());
        assert_eq!(arbiter.current(), ControllerLevel::HighLevel);
    }

    #[test]
    fn test_successful_switch() {
        let arbiter = LevelArbiter::new();
        arbiter.switch(ControllerLevel::LowLevel, || Ok(())).unwrap();
        assert_eq!(arbiter.current(), ControllerLevel::LowLevel);
        assert!(arbiter.require(ControllerLevel::LowLevel).is_ok());
    }

    #[test]
    fn test_switch_to_active_level_is_noop() {
        let arbiter = LevelArbiter::new();
        // commit 不应被调用
        arbiter
            .switch(ControllerLevel::HighLevel, || {
                panic!("commit must not run for a no-op switch")
            })
            .unwrap();
    }
}
