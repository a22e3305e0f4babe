//! 配置校验模块
//!
//! 校验规则：
//! - batch_size > 0
//! - flush_interval_ms > 0
//! - sink 名称非空，且可用作文件名
//! - queue_capacity > 0

use contracts::{ContractError, DispatcherConfig, SinkConfig};

/// 校验 DispatcherConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &DispatcherConfig) -> Result<(), ContractError> {
    config.batch.validate()?;
    validate_sink(&config.sink)?;
    Ok(())
}

/// 校验 sink 配置
fn validate_sink(sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.name.is_empty() {
        return Err(ContractError::config_validation(
            "sink.name",
            "sink name cannot be empty",
        ));
    }

    if sink.name.contains(['/', '\\']) {
        return Err(ContractError::config_validation(
            "sink.name",
            format!("sink name '{}' must not contain path separators", sink.name),
        ));
    }

    if sink.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "sink.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BatchConfig;
    use std::time::Duration;

    #[test]
    fn test_valid_config() {
        assert!(validate(&DispatcherConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut cfg = DispatcherConfig::default();
        cfg.batch = BatchConfig::new(0, Duration::from_secs(1));
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("batch_size must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_flush_interval() {
        let mut cfg = DispatcherConfig::default();
        cfg.batch.flush_interval_ms = 0;
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("flush_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut cfg = DispatcherConfig::default();
        cfg.sink.name = String::new();
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_sink_name_with_separator() {
        let mut cfg = DispatcherConfig::default();
        cfg.sink.name = "../escape".into();
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("path separators"), "got: {err}");
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut cfg = DispatcherConfig::default();
        cfg.sink.queue_capacity = 0;
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("queue_capacity"), "got: {err}");
    }
}
