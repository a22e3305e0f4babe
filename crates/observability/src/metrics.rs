//! 批处理指标收集模块
//!
//! 通过 `metrics` facade 记录 dispatcher 与 sink 的运行指标。
//! 未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录一条被接受的记录
pub fn record_push_accepted() {
    counter!("bulk_dispatcher_records_accepted_total").increment(1);
}

/// 记录一条被拒绝的记录
///
/// `reason` 取自 `ContractError::reason()`，例如 `invalid_routing_key`。
pub fn record_push_rejected(reason: &'static str) {
    counter!("bulk_dispatcher_records_rejected_total", "reason" => reason).increment(1);
}

/// 记录当前待刷新的记录数
pub fn record_pending_records(pending: usize) {
    gauge!("bulk_dispatcher_pending_records").set(pending as f64);
}

/// 记录一次刷新
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_batch_flushed;
///
/// record_batch_flushed(batch.trigger.as_str(), batch.records, batch.len());
/// ```
pub fn record_batch_flushed(trigger: &'static str, records: usize, bytes: usize) {
    counter!("bulk_dispatcher_flushes_total", "trigger" => trigger).increment(1);
    counter!("bulk_dispatcher_records_flushed_total").increment(records as u64);
    histogram!("bulk_dispatcher_batch_records").record(records as f64);
    histogram!("bulk_dispatcher_batch_bytes").record(bytes as f64);
}

/// 记录 sink 投递结果
pub fn record_batch_delivered(sink_name: &str, success: bool) {
    let status = if success { "ok" } else { "error" };
    counter!(
        "bulk_dispatcher_batches_delivered_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录因队列已满或 sink 已关闭而丢弃的批次
pub fn record_batch_dropped(sink_name: &str) {
    counter!(
        "bulk_dispatcher_batches_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}
