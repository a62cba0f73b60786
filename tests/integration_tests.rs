//! Integration tests for the logger hierarchy
//!
//! These tests verify:
//! - Level inheritance and the two filter points (logger, handler)
//! - Propagation and its cut-off
//! - Lazy message evaluation
//! - Rotation and retention through configuration
//! - Failure isolation and the diagnostic channel
//! - Configuration validation before any file is created
//! - Log injection prevention
//! - Global registry lifecycle

use parking_lot::Mutex;
use rust_logger_hierarchy::prelude::*;
use rust_logger_hierarchy::{global, info, FormatterError};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct MemorySink(Arc<Mutex<Vec<String>>>);

impl Sink for MemorySink {
    fn write_line(&mut self, _level: LogLevel, line: &str) -> Result<()> {
        self.0.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct BrokenSink;

impl Sink for BrokenSink {
    fn write_line(&mut self, _level: LogLevel, _line: &str) -> Result<()> {
        Err(LoggerError::io_operation(
            "write log line",
            "device unavailable",
            std::io::Error::new(std::io::ErrorKind::Other, "simulated I/O failure"),
        ))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn memory_handler(name: &str, level: LogLevel) -> (Arc<Handler>, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let handler = Handler::new(name, MemorySink(Arc::clone(&lines))).with_level(level);
    (Arc::new(handler), lines)
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn registry_from(value: serde_json::Value) -> Registry {
    let config = LoggingConfig::from_json_str(&value.to_string()).expect("config parses");
    Registry::from_config(&config).expect("config applies")
}

#[test]
fn test_get_logger_is_idempotent() {
    let registry = Registry::new();
    let first = registry.get_logger("a.b");
    let second = registry.get_logger("a.b");

    assert!(first.same_node(&second));
    first.set_level(Some(LogLevel::Error));
    assert_eq!(second.level(), Some(LogLevel::Error));
}

#[test]
fn test_level_inheritance() {
    let registry = Registry::new();
    let a = registry.get_logger("a");
    let abc = registry.get_logger("a.b.c");

    assert_eq!(abc.effective_level(), LogLevel::Info);

    a.set_level(Some(LogLevel::Debug));
    assert_eq!(abc.effective_level(), LogLevel::Debug);
    assert!(abc.is_enabled_for(LogLevel::Debug));
    assert!(!abc.is_enabled_for(LogLevel::Trace));

    registry.root().set_level(Some(LogLevel::Fatal));
    assert_eq!(abc.effective_level(), LogLevel::Debug);
}

#[test]
fn test_scenario_logger_and_handler_filters() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("svc.log");

    let registry = registry_from(json!({
        "version": 1,
        "formatters": {"plain": {"format": "%(levelname)s %(name)s %(message)s"}},
        "handlers": {
            "console": {"class": "console", "level": "INFO", "stream": "stderr"},
            "file": {"class": "rotating-file", "level": "DEBUG", "path": log_file, "formatter": "plain"}
        },
        "loggers": {"svc": {"level": "DEBUG", "handlers": ["console", "file"], "propagate": true}},
        "root": {"level": "INFO"}
    }));

    registry.get_logger("svc").debug("x");
    registry.flush().unwrap();

    assert_eq!(read_lines(&log_file), vec!["DEBUG svc x"]);
    // The console handler saw the record but rejected it by level
    assert_eq!(registry.metrics().handler_writes(), 1);
    assert_eq!(registry.metrics().handler_failures(), 0);
}

#[test]
fn test_scenario_propagation_cut_off() {
    let registry = Registry::new();
    let (root_handler, root_lines) = memory_handler("root", LogLevel::Trace);
    registry.root().add_handler(root_handler);

    let svc = registry.get_logger("svc");
    svc.set_propagate(false);
    svc.error("y");

    assert!(root_lines.lock().is_empty());
    assert_eq!(registry.metrics().handler_writes(), 0);
    assert_eq!(registry.metrics().records_emitted(), 1);
}

#[test]
fn test_propagation_reaches_every_ancestor_once_per_attachment() {
    let registry = Registry::builder().root_level(LogLevel::Trace).build();
    let (shared, lines) = memory_handler("shared", LogLevel::Trace);
    registry.root().add_handler(Arc::clone(&shared));
    registry.get_logger("a").add_handler(Arc::clone(&shared));

    registry.get_logger("a.b").info("twice");

    assert_eq!(lines.lock().as_slice(), ["twice", "twice"]);
}

#[test]
fn test_lazy_message_evaluated_at_most_once() {
    let registry = Registry::new();
    let (first, _) = memory_handler("first", LogLevel::Trace);
    let (second, _) = memory_handler("second", LogLevel::Trace);
    let logger = registry.get_logger("lazy");
    logger.add_handler(first);
    registry.root().add_handler(second);

    let calls = AtomicUsize::new(0);
    let produce = || {
        calls.fetch_add(1, Ordering::SeqCst);
        "payload".to_string()
    };

    logger.log_lazy(LogLevel::Debug, produce);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.metrics().records_filtered(), 1);

    logger.log_lazy(LogLevel::Warning, || {
        calls.fetch_add(1, Ordering::SeqCst);
        "payload".to_string()
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scenario_rotation_retention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("log");

    let registry = registry_from(json!({
        "handlers": {
            "file": {"class": "rotating-file", "path": log_file, "max_bytes": 100, "backup_count": 2}
        },
        "root": {"level": "INFO", "handlers": ["file"]}
    }));
    let logger = registry.get_logger("rot");

    // 10 lines of 10 bytes fill one file; 40 lines cross the threshold three times
    for i in 0..40 {
        logger.info(format!("{:09}", i));
    }
    registry.flush().unwrap();

    assert!(log_file.exists());
    assert!(temp_dir.path().join("log.1").exists());
    assert!(temp_dir.path().join("log.2").exists());
    assert!(!temp_dir.path().join("log.3").exists());
    assert_eq!(read_lines(&log_file).len(), 10);
    assert_eq!(read_lines(&temp_dir.path().join("log.1"))[0], "000000020");
}

#[test]
fn test_scenario_single_diagnostic_per_record() {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let collected = Arc::clone(&reports);
    let registry = Registry::builder()
        .diagnostic_callback(Arc::new(move |msg: &str| collected.lock().push(msg.to_string())))
        .build();

    let logger = registry.get_logger("fragile");
    logger.add_handler(Arc::new(Handler::new("first", BrokenSink)));
    logger.add_handler(Arc::new(Handler::new("second", BrokenSink)));
    let (healthy, lines) = memory_handler("healthy", LogLevel::Trace);
    registry.root().add_handler(healthy);

    logger.error("still delivered");

    assert_eq!(lines.lock().as_slice(), ["still delivered"]);
    assert_eq!(registry.diagnostics_reported(), 1);
    assert_eq!(registry.metrics().handler_failures(), 2);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("first"));
    assert!(reports[0].contains("second"));
    assert!(reports[0].contains("simulated I/O failure") || reports[0].contains("device unavailable"));
}

#[test]
fn test_invalid_config_creates_no_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("never").join("created.log");

    let config = LoggingConfig::from_json_str(
        &json!({
            "formatters": {"bad": {"format": "%(hostname)s %(message)s"}},
            "handlers": {"file": {"class": "rotating-file", "path": log_file, "formatter": "bad"}},
            "loggers": {"svc": {"level": "VERBOSE", "handlers": ["file", "ghost"]}}
        })
        .to_string(),
    )
    .unwrap();

    let registry = Registry::new();
    let err = registry.configure(&config).unwrap_err();

    let LoggerError::Config(ConfigError::Validation(errors)) = &err else {
        panic!("expected validation failure, got {err}");
    };
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::Formatter {
            source: FormatterError::UnknownPlaceholder { .. },
            ..
        }
    )));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::InvalidLevel { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::UnknownHandler { handler, .. } if handler == "ghost")));

    assert!(!log_file.exists());
    assert!(!temp_dir.path().join("never").exists());
    assert!(!registry.is_configured());
}

#[test]
fn test_handler_open_failure_leaves_registry_unconfigured() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    // A regular file where the log directory should be
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let config = LoggingConfig::from_json_str(
        &json!({
            "handlers": {"file": {"class": "rotating-file", "path": blocker.join("app.log")}},
            "root": {"level": "DEBUG", "handlers": ["file"]}
        })
        .to_string(),
    )
    .unwrap();

    let registry = Registry::new();
    let err = registry.configure(&config).unwrap_err();

    assert!(matches!(
        err,
        LoggerError::Config(ConfigError::OpenHandler { ref name, .. }) if name == "file"
    ));
    assert!(!registry.is_configured());
    assert_eq!(registry.root().effective_level(), LogLevel::Info);
    assert!(registry.root().handlers().is_empty());
}

#[test]
fn test_disable_existing_loggers() {
    let registry = Registry::new();
    let (handler, lines) = memory_handler("memory", LogLevel::Trace);
    registry.root().add_handler(handler);

    let legacy = registry.get_logger("legacy.module");
    let kept = registry.get_logger("app.worker");

    let config = LoggingConfig::from_json_str(
        r#"{"disable_existing_loggers": true, "loggers": {"app": {"level": "INFO"}}}"#,
    )
    .unwrap();
    registry.configure(&config).unwrap();

    legacy.error("muted");
    kept.info("kept");
    registry.get_logger("brand.new").warning("new");
    registry.root().error("root");

    assert_eq!(lines.lock().as_slice(), ["kept", "new", "root"]);
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection_test.log");

    let registry = registry_from(json!({
        "handlers": {"file": {"class": "rotating-file", "filename": log_file, "mode": "w"}},
        "root": {"handlers": ["file"]}
    }));

    let malicious_message = "User login\nERROR [2024-10-17] Fake error injected\r\tINFO Continuation";
    registry.get_logger("auth").info(malicious_message);
    registry.flush().unwrap();

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert!(content.contains("\\n"));
    assert!(content.contains("\\r\\t"));
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
}

#[test]
fn test_field_values_cannot_inject_lines() {
    let registry = Registry::new();
    let formatter = Formatter::new("%(message)s %(fields)s", None).unwrap();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let handler = Handler::new("memory", MemorySink(Arc::clone(&lines)))
        .with_formatter(Arc::new(formatter));
    registry.root().add_handler(Arc::new(handler));

    registry.get_logger("auth").info_with_fields(
        "login",
        LogContext::new().with_field("user", "bob\nERROR fake entry"),
    );

    let lines = lines.lock();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains('\n'));
    assert_eq!(lines[0], "login user=\"bob\\nERROR fake entry\"");
}

#[test]
fn test_structured_fields_and_call_site() {
    let registry = Registry::new();
    let formatter = Formatter::new("%(filename)s:%(message)s %(fields)s", None).unwrap();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let handler = Handler::new("memory", MemorySink(Arc::clone(&lines)))
        .with_formatter(Arc::new(formatter));
    registry.root().add_handler(Arc::new(handler));

    let logger = registry.get_logger("orders");
    logger.info_with_fields(
        "order placed",
        LogContext::new()
            .with_field("order_id", 42_i64)
            .with_field("customer", "ada"),
    );
    info!(logger, "shipped {}", 3);

    let lines = lines.lock();
    assert_eq!(lines[0], "(unknown file):order placed order_id=42 customer=ada");
    assert_eq!(lines[1], "integration_tests.rs:shipped 3 ");
}

#[test]
fn test_env_overrides_apply_to_registry() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("env.log");

    let config = LoggingConfig::from_json_str(
        &json!({
            "formatters": {"f": {"format": "%(message)s"}},
            "handlers": {"file": {"class": "rotating-file", "path": log_file, "formatter": "f"}},
            "root": {"level": "ERROR", "handlers": ["file"]}
        })
        .to_string(),
    )
    .unwrap()
    .with_overrides_from("SVC_", |key| match key {
        "SVC_LOG_LEVEL" => Some("DEBUG".to_string()),
        "SVC_LOG_FORMAT" => Some("%(levelname)s|%(message)s".to_string()),
        _ => None,
    });

    let registry = Registry::from_config(&config).unwrap();
    registry.get_logger("svc").debug("visible");
    registry.flush().unwrap();

    assert_eq!(read_lines(&log_file), vec!["DEBUG|visible"]);
}

#[test]
fn test_shutdown_closes_handlers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("closing.log");

    let registry = registry_from(json!({
        "handlers": {"file": {"class": "rotating-file", "path": log_file}},
        "root": {"handlers": ["file"]}
    }));
    let logger = registry.get_logger("app");
    logger.info("before");

    let handler = registry.handler("file").expect("configured handler");
    registry.shutdown().unwrap();
    assert!(handler.is_closed());

    logger.info("after");
    assert_eq!(read_lines(&log_file), vec!["before"]);
    assert_eq!(registry.diagnostics_reported(), 0);
}

#[test]
fn test_global_registry_lifecycle() {
    assert!(matches!(
        global::get_logger("early"),
        Err(LoggerError::NotInitialized)
    ));

    global::init_from_config(&LoggingConfig::basic(LogLevel::Warning, None)).unwrap();
    assert!(matches!(
        global::init(Registry::new()),
        Err(LoggerError::AlreadyInitialized)
    ));

    let logger = global::get_logger("global.test").unwrap();
    assert_eq!(logger.effective_level(), LogLevel::Warning);
    assert!(logger.same_node(&global::get_logger("global.test").unwrap()));

    global::shutdown().unwrap();
    assert!(!global::is_initialized());
}
