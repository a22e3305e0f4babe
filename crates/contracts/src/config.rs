//! DispatcherConfig - Config Loader 输出
//!
//! 描述批处理参数与输出 sink。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ContractError;

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 默认刷新间隔 (毫秒)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// 完整的 dispatcher 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// 批处理参数
    #[serde(default)]
    pub batch: BatchConfig,

    /// 输出 sink
    #[serde(default)]
    pub sink: SinkConfig,
}

/// 批处理参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 单批最大记录数，达到即立即刷新
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// 非空批次最长停留时间 (毫秒)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
        }
    }
}

impl BatchConfig {
    /// 以指定参数创建
    ///
    /// 间隔按毫秒向上取整，非零的亚毫秒间隔记为 1ms，超出 u64 时饱和。
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        let millis = flush_interval.as_nanos().div_ceil(1_000_000);
        Self {
            batch_size,
            flush_interval_ms: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// 刷新间隔
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// 校验参数合法性 (均须 > 0)
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.batch_size == 0 {
            return Err(ContractError::config_validation(
                "batch.batch_size",
                "batch_size must be > 0",
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(ContractError::config_validation(
                "batch.flush_interval_ms",
                "flush_interval_ms must be > 0",
            ));
        }
        Ok(())
    }
}

/// Sink 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量 (批次数)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: default_queue_capacity(),
            params: HashMap::new(),
        }
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (NDJSON bulk)
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_defaults() {
        let cfg = BatchConfig::default();
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.flush_interval(), Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_batch_config_rejects_zero() {
        let err = BatchConfig::new(0, Duration::from_secs(1))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("batch_size"), "got: {err}");

        let err = BatchConfig::new(10, Duration::ZERO).validate().unwrap_err();
        assert!(err.to_string().contains("flush_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_flush_interval_rounds_up_to_millis() {
        let cfg = BatchConfig::new(10, Duration::from_micros(300));
        assert_eq!(cfg.flush_interval_ms, 1);
        assert!(cfg.validate().is_ok());

        let cfg = BatchConfig::new(10, Duration::from_micros(1_500));
        assert_eq!(cfg.flush_interval_ms, 2);

        let cfg = BatchConfig::new(10, Duration::from_millis(250));
        assert_eq!(cfg.flush_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_flush_interval_saturates() {
        let cfg = BatchConfig::new(10, Duration::MAX);
        assert_eq!(cfg.flush_interval_ms, u64::MAX);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let cfg: DispatcherConfig = toml::from_str(
            r#"
[sink]
name = "out"
sink_type = "file"
"#,
        )
        .unwrap();
        assert_eq!(cfg.batch, BatchConfig::default());
        assert_eq!(cfg.sink.sink_type, SinkType::File);
        assert_eq!(cfg.sink.queue_capacity, 16);
    }
}
