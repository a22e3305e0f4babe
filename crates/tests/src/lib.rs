//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 -> DispatcherBuilder -> sink 全链路
//! - 批次时序场景 (size / interval)
//! - 拒绝记录的隔离性

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_defaults() {
        let config = contracts::DispatcherConfig::default();
        assert_eq!(config.batch.batch_size, contracts::DEFAULT_BATCH_SIZE);
        assert_eq!(config.sink.sink_type, contracts::SinkType::Log);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BatchConfig, BatchSink, ContractError, FlushTrigger, FlushedBatch, Stamped};
    use dispatcher::{create_dispatcher, Dispatcher};
    use observability::{LogFormat, ObservabilityConfig};
    use serde::Serialize;
    use tokio::time::sleep;

    #[derive(Debug, Serialize)]
    struct Alert {
        rule: String,
        priority: String,
        output: String,
    }

    fn alert(n: usize) -> Stamped<Alert> {
        Stamped::new(
            Alert {
                rule: "Terminal shell in container".to_string(),
                priority: "Notice".to_string(),
                output: format!("shell spawned #{n}"),
            },
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    /// Sink that keeps every batch it is given
    #[derive(Clone, Default)]
    struct RecordingSink {
        batches: Arc<Mutex<Vec<FlushedBatch>>>,
    }

    impl RecordingSink {
        fn batches(&self) -> Vec<FlushedBatch> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl BatchSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write(&mut self, batch: &FlushedBatch) -> Result<(), ContractError> {
            self.batches.lock().unwrap().push(batch.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn bodies(batch: &FlushedBatch) -> Vec<serde_json::Value> {
        batch
            .units()
            .map(|(_, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }

    /// End-to-end test: TOML config -> Dispatcher -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并校验配置
    /// 2. 多个生产者并发写入
    /// 3. FileSink 输出可直接回放的 bulk 文件
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_config_to_file() {
        // another test may have installed the subscriber already
        let _ = observability::init_with_config(ObservabilityConfig {
            log_format: LogFormat::Compact,
            ..ObservabilityConfig::default()
        });

        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[batch]
batch_size = 7
flush_interval_ms = 60000

[sink]
name = "falco"
sink_type = "file"
queue_capacity = 64

[sink.params]
base_path = "{}"
rotation = "never"
"#,
            dir.path().display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = Arc::new(create_dispatcher(config).await.unwrap());

        let mut producers = Vec::new();
        for p in 0..4 {
            let dispatcher = Arc::clone(&dispatcher);
            producers.push(tokio::spawn(async move {
                for i in 0..25 {
                    dispatcher
                        .push(&format!("falco-{p}"), &alert(p * 100 + i))
                        .unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        let dispatcher = Arc::into_inner(dispatcher).expect("producers finished");
        let (batcher, sink) = dispatcher.shutdown().await;
        assert_eq!(batcher.accepted, 100);
        assert_eq!(batcher.records_flushed, 100);
        // 14 full batches of 7, plus the remainder of 2 at shutdown
        assert_eq!(batcher.size_flushes, 14);
        assert_eq!(batcher.manual_flushes, 0);
        assert_eq!(batcher.shutdown_flushes, 1);
        assert_eq!(sink.write_count, 15);
        assert_eq!(sink.failure_count, 0);

        let output = std::fs::read_to_string(dir.path().join("falco.ndjson")).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 200);
        for pair in lines.chunks(2) {
            assert!(pair[0].starts_with(r#"{"create":{"_index":"falco-"#));
            let doc: serde_json::Value = serde_json::from_str(pair[1]).unwrap();
            assert_eq!(doc["@timestamp"], "2024-03-01T12:00:00Z");
            assert_eq!(doc["priority"], "Notice");
        }
    }

    /// batch_size=3, flush_interval=1s: R1..R3 flush by size, R4 by interval
    #[tokio::test(start_paused = true)]
    async fn test_size_then_interval_through_sink() {
        let sink = RecordingSink::default();
        let dispatcher = Dispatcher::with_sink(
            BatchConfig::new(3, Duration::from_secs(1)),
            sink.clone(),
            8,
        )
        .unwrap();

        dispatcher.push("idx", "R1").unwrap();
        sleep(Duration::from_millis(10)).await;
        dispatcher.push("idx", "R2").unwrap();
        sleep(Duration::from_millis(10)).await;
        dispatcher.push("idx", "R3").unwrap();
        sleep(Duration::from_millis(10)).await;
        dispatcher.push("idx", "R4").unwrap();

        sleep(Duration::from_millis(1100)).await;
        dispatcher.shutdown().await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].trigger, FlushTrigger::Size);
        assert_eq!(bodies(&batches[0]), vec!["R1", "R2", "R3"]);
        assert_eq!(batches[1].trigger, FlushTrigger::Interval);
        assert_eq!(bodies(&batches[1]), vec!["R4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_record_never_reaches_sink() {
        let sink = RecordingSink::default();
        let dispatcher = Dispatcher::with_sink(
            BatchConfig::new(2, Duration::from_secs(1)),
            sink.clone(),
            8,
        )
        .unwrap();

        let err = dispatcher.push("bad\"index", &alert(0)).unwrap_err();
        assert!(matches!(err, ContractError::InvalidRoutingKey { .. }));
        assert_eq!(dispatcher.batcher().pending_count(), 0);

        dispatcher.push("good", &alert(1)).unwrap();
        dispatcher.push("good", &alert(2)).unwrap();

        let (batcher, _) = dispatcher.shutdown().await;
        assert_eq!(batcher.rejected, 1);

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records, 2);
        let headers: Vec<&[u8]> = batches[0].units().map(|(header, _)| header).collect();
        assert!(headers
            .iter()
            .all(|h| *h == br#"{"create":{"_index":"good"}}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_push_after_shutdown_of_shared_batcher() {
        let sink = RecordingSink::default();
        let dispatcher =
            Dispatcher::with_sink(BatchConfig::default(), sink.clone(), 8).unwrap();

        dispatcher.push("idx", &alert(0)).unwrap();
        dispatcher.batcher().shutdown().await;

        let err = dispatcher.push("idx", &alert(1)).unwrap_err();
        assert!(matches!(err, ContractError::Closed));

        dispatcher.shutdown().await;
        assert_eq!(sink.batches().len(), 1);
    }
}
