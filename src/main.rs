use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use pulsewatch::ai::{AnalysisBackend, GeminiBackend, MockBackend, RiskAnalyzer};
use pulsewatch::alerts::{AlertEvaluator, Cooldown, CriticalAlert, LogNotifier, Notifier};
use pulsewatch::chat::ChatProxy;
use pulsewatch::config::{AiBackendConfig, Config};
use pulsewatch::engine::VitalsEngine;
use pulsewatch::error::ConfigError;
use pulsewatch::pairing::DevicePairing;
use pulsewatch::simulator::VitalsSimulator;
use pulsewatch::store::FileStore;
use pulsewatch::vitals::VitalsSample;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Command-line arguments for the vitals monitor
#[derive(Parser)]
#[command(
    name = "pulsewatch",
    about = "Senior health vitals monitor - simulated wearable with AI risk assessment",
    long_about = "Monitors vital signs from a (simulated) wearable device, classifies each \
                  reading against configurable thresholds, raises critical alerts with an \
                  AI-generated risk assessment, and persists a rolling history."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults later; only reject paths
            // that exist but are not regular files
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

/// Main application struct that wires all monitor components together
///
/// HealthMonitor owns the engine, the simulator feeding it, and the alerting
/// path. It manages the component lifecycle and handles graceful shutdown.
pub struct HealthMonitor {
    /// Application configuration
    config: Config,

    /// Vitals state engine behind a lock shared with the reading loop
    engine: Arc<Mutex<VitalsEngine>>,

    /// Simulated wearable producing periodic readings
    simulator: VitalsSimulator,

    /// Channel carrying readings from the simulator to the loop thread
    sample_receiver: Receiver<VitalsSample>,

    /// Shutdown signal
    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,

    /// Shutdown senders for spawned threads
    shutdown_senders: Vec<Sender<()>>,

    /// Thread handles for cleanup
    thread_handles: Vec<JoinHandle<()>>,

    /// Chat relay, present when a webhook URL is configured
    chat: Option<ChatProxy>,
}

impl HealthMonitor {
    /// Create a new HealthMonitor with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or the data
    /// directory cannot be prepared.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        info!("Initializing HealthMonitor with configuration");

        config.validate()?;

        let store = FileStore::new(&config.storage.data_dir).map_err(|e| {
            ConfigError::ReadError(format!(
                "Failed to prepare data directory {}: {}",
                config.storage.data_dir.display(),
                e
            ))
        })?;

        let engine = Arc::new(Mutex::new(VitalsEngine::new(Box::new(store))));

        let (sample_sender, sample_receiver) = mpsc::channel();
        let (shutdown_sender, shutdown_receiver) = mpsc::channel();

        let simulator = VitalsSimulator::new(config.simulation.interval(), sample_sender);

        let chat = config
            .chat
            .webhook_url
            .as_ref()
            .map(|url| ChatProxy::new(url.clone()));

        Ok(HealthMonitor {
            config,
            engine,
            simulator,
            sample_receiver,
            shutdown_sender,
            shutdown_receiver,
            shutdown_senders: Vec::new(),
            thread_handles: Vec::new(),
            chat,
        })
    }

    /// Chat relay built from the configured webhook, if any
    pub fn chat_proxy(&self) -> Option<&ChatProxy> {
        self.chat.as_ref()
    }

    /// Load configuration from file or use defaults
    ///
    /// Unreadable or invalid files are reported and replaced with defaults.
    pub fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
        match config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path);
                match Config::from_file(std::path::Path::new(path)) {
                    Ok(config) => Ok(config),
                    Err(ConfigError::ReadError(_)) => {
                        warn!(
                            "Configuration file '{}' not found or unreadable, using defaults",
                            path
                        );
                        Ok(Config::default())
                    }
                    Err(e) => {
                        error!("Configuration error in '{}': {}", path, e);
                        warn!("Using default configuration due to invalid config file");
                        Ok(Config::default())
                    }
                }
            }
            None => {
                info!("Using default configuration");
                Ok(Config::default())
            }
        }
    }

    /// Pair with the wearable, start the reading loop and the simulator
    pub fn start(&mut self) -> anyhow::Result<()> {
        info!("Starting HealthMonitor components");

        let device = DevicePairing::default()
            .pair()
            .context("Device pairing failed")?;
        info!("Using device '{}'", device);

        if let Ok(mut engine) = self.engine.lock() {
            engine.connect();
        }

        match &self.chat {
            Some(_) => info!("Chat relay enabled, forwarding messages to the configured webhook"),
            None => info!("Chat relay disabled (no webhook configured)"),
        }

        let reading_thread = self.spawn_reading_thread();
        self.thread_handles.push(reading_thread);

        self.simulator.start();

        info!("All HealthMonitor components started successfully");
        Ok(())
    }

    /// Stop the monitor: simulator first, then the reading loop
    ///
    /// Teardown keeps the in-memory and persisted history intact; clearing
    /// is reserved for an explicit `VitalsEngine::disconnect`.
    pub fn stop(&mut self) -> anyhow::Result<()> {
        info!("Stopping HealthMonitor components");

        self.simulator.stop();

        for sender in &self.shutdown_senders {
            if let Err(e) = sender.send(()) {
                error!("Failed to send shutdown signal to thread: {}", e);
            }
        }

        for handle in self.thread_handles.drain(..) {
            if let Err(e) = handle.join() {
                error!("Thread failed to join: {:?}", e);
            }
        }

        info!("HealthMonitor stopped successfully");
        Ok(())
    }

    /// Block until a shutdown signal is received
    pub fn wait_for_shutdown(&self) -> anyhow::Result<()> {
        info!("Waiting for shutdown signal...");

        self.shutdown_receiver
            .recv()
            .context("Shutdown channel closed unexpectedly")?;

        info!("Shutdown signal received");
        Ok(())
    }

    /// Spawn the reading loop that records samples and raises alerts
    fn spawn_reading_thread(&mut self) -> JoinHandle<()> {
        let (shutdown_sender, shutdown_receiver) = mpsc::channel();
        self.shutdown_senders.push(shutdown_sender);

        let engine = Arc::clone(&self.engine);

        let mut evaluator = AlertEvaluator::new(Cooldown::new(chrono::Duration::milliseconds(
            self.config.alerts.cooldown_ms as i64,
        )));
        let notifier: Arc<dyn Notifier + Sync> = Arc::new(LogNotifier);
        let analyzer = Arc::new(RiskAnalyzer::new(build_backend(&self.config.ai)));

        // Move the receiver into the thread; the monitor keeps a dummy
        let sample_receiver = std::mem::replace(&mut self.sample_receiver, {
            let (_, dummy_receiver) = mpsc::channel();
            dummy_receiver
        });

        std::thread::spawn(move || {
            info!("Reading thread started");

            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create async runtime for risk assessment: {}", e);
                    return;
                }
            };

            loop {
                if shutdown_receiver.try_recv().is_ok() {
                    info!("Reading thread received shutdown signal");
                    break;
                }

                let sample = match sample_receiver.recv_timeout(Duration::from_millis(100)) {
                    Ok(sample) => sample,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        info!("Sample channel disconnected");
                        break;
                    }
                };

                let snapshot = match engine.lock() {
                    Ok(mut engine) => {
                        if let Err(e) = engine.record_sample(&sample) {
                            error!("Failed to record sample: {}", e);
                        }
                        engine.snapshot().clone()
                    }
                    Err(e) => {
                        error!("Engine lock poisoned: {}", e);
                        break;
                    }
                };

                if let Some(alert) = evaluator.evaluate(&snapshot) {
                    if let Err(e) = notifier.critical(&alert.message) {
                        error!("Failed to deliver critical alert: {}", e);
                    }

                    spawn_assessment(
                        rt.handle(),
                        Arc::clone(&analyzer),
                        Arc::clone(&notifier),
                        alert,
                    );
                }
            }

            info!("Reading thread stopped");
        })
    }
}

/// Deliver the risk assessment as an async follow-up
///
/// The critical notification has already fired; the assessment is awaited on
/// the runtime's worker threads, so a slow backend never stalls the reading
/// loop between samples.
fn spawn_assessment(
    handle: &tokio::runtime::Handle,
    analyzer: Arc<RiskAnalyzer>,
    notifier: Arc<dyn Notifier + Sync>,
    alert: CriticalAlert,
) {
    handle.spawn(async move {
        let assessment = analyzer.analyze(&alert.snapshot).await;
        if let Err(e) = notifier.follow_up(&assessment) {
            error!("Failed to deliver risk assessment: {}", e);
        }
    });
}

/// Build the configured assessment backend
fn build_backend(config: &AiBackendConfig) -> Arc<dyn AnalysisBackend> {
    match config {
        AiBackendConfig::Gemini { api_key, model } => {
            Arc::new(GeminiBackend::new(api_key.clone(), model.clone()))
        }
        AiBackendConfig::Mock => Arc::new(MockBackend::success(
            "Vitals reviewed. No immediate action required.",
        )),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting pulsewatch vitals monitor");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let config = match HealthMonitor::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut monitor = match HealthMonitor::new(config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to initialize HealthMonitor: {}", e);
            std::process::exit(1);
        }
    };

    info!("HealthMonitor initialized successfully");

    if let Err(e) = monitor.start() {
        error!("Failed to start HealthMonitor: {}", e);
        std::process::exit(1);
    }

    // Graceful shutdown on SIGINT
    let shutdown_sender = monitor.shutdown_sender.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .expect("Error setting SIGINT handler for graceful shutdown");

    info!("Vitals monitor is running. Press Ctrl+C to stop.");

    if let Err(e) = monitor.wait_for_shutdown() {
        error!("Error during shutdown wait: {}", e);
    }

    if let Err(e) = monitor.stop() {
        error!("Error during shutdown: {}", e);
        std::process::exit(1);
    }

    info!("HealthMonitor shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch::config::{ChatConfig, StorageConfig};
    use pulsewatch::error::{AlertError, AnalysisError};
    use pulsewatch::vitals::VitalsSnapshot;
    use tempfile::TempDir;

    #[test]
    fn test_cli_validation_with_existing_file() {
        let temp_file = std::env::temp_dir().join("pulsewatch_test_config.toml");
        std::fs::write(&temp_file, "[ai]\nbackend = \"mock\"").unwrap();

        let cli = Cli {
            config: Some(temp_file.clone()),
            verbose: false,
        };

        assert!(cli.validate().is_ok());

        std::fs::remove_file(&temp_file).unwrap();
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/config.toml")),
            verbose: false,
        };

        // Missing files are handled gracefully later
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let cli = Cli {
            config: Some(PathBuf::from("/tmp")),
            verbose: false,
        };

        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_cli_validation_no_config() {
        let cli = Cli {
            config: None,
            verbose: false,
        };

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_config_path_str_with_valid_path() {
        let cli = Cli {
            config: Some(PathBuf::from("config.toml")),
            verbose: false,
        };

        let result = cli.config_path_str().unwrap();
        assert_eq!(result, Some("config.toml"));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let config = HealthMonitor::load_config(Some("/nonexistent/pulsewatch.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_build_backend_mock() {
        // Smoke test: the mock backend is constructed without network access
        let _backend = build_backend(&AiBackendConfig::Mock);
    }

    fn config_with_data_dir(dir: &std::path::Path) -> Config {
        Config {
            storage: StorageConfig {
                data_dir: dir.to_path_buf(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_stop_keeps_history() {
        let dir = TempDir::new().unwrap();
        let mut monitor = HealthMonitor::new(config_with_data_dir(dir.path())).unwrap();

        let sample = VitalsSample {
            heart_rate: 72.0,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            spo2: 98.0,
            temperature: 36.6,
        };
        monitor
            .engine
            .lock()
            .unwrap()
            .record_sample(&sample)
            .unwrap();

        monitor.stop().unwrap();
        assert_eq!(monitor.engine.lock().unwrap().history_len(), 1);

        // A fresh engine over the same data directory restores the record
        let store = FileStore::new(dir.path()).unwrap();
        let engine = VitalsEngine::new(Box::new(store));
        assert_eq!(engine.history_len(), 1);
    }

    #[test]
    fn test_chat_relay_follows_configuration() {
        let dir = TempDir::new().unwrap();

        let mut config = config_with_data_dir(dir.path());
        config.chat = ChatConfig {
            webhook_url: Some("https://hooks.example.com/chat".to_string()),
        };
        let monitor = HealthMonitor::new(config).unwrap();
        assert!(monitor.chat_proxy().is_some());

        let monitor = HealthMonitor::new(config_with_data_dir(dir.path())).unwrap();
        assert!(monitor.chat_proxy().is_none());
    }

    #[test]
    fn test_assessment_does_not_block_the_caller() {
        use std::future::Future;
        use std::pin::Pin;
        use std::time::Instant;

        struct SlowBackend;

        impl AnalysisBackend for SlowBackend {
            fn assess<'a>(
                &'a self,
                _vitals: &'a VitalsSnapshot,
            ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>
            {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok("assessment".to_string())
                })
            }
        }

        #[derive(Default)]
        struct CapturingNotifier {
            follow_ups: Mutex<Vec<String>>,
        }

        impl Notifier for CapturingNotifier {
            fn critical(&self, _message: &str) -> Result<(), AlertError> {
                Ok(())
            }

            fn follow_up(&self, message: &str) -> Result<(), AlertError> {
                self.follow_ups.lock().unwrap().push(message.to_string());
                Ok(())
            }
        }

        let rt = tokio::runtime::Runtime::new().unwrap();
        let analyzer = Arc::new(RiskAnalyzer::new(Arc::new(SlowBackend)));
        let notifier = Arc::new(CapturingNotifier::default());
        let alert = CriticalAlert {
            message: "CRITICAL: Heart Rate is 150 bpm!".to_string(),
            snapshot: VitalsSnapshot::default(),
        };

        let started = Instant::now();
        spawn_assessment(
            rt.handle(),
            analyzer,
            Arc::clone(&notifier) as Arc<dyn Notifier + Sync>,
            alert,
        );
        // The caller returns immediately, not after the backend answers
        assert!(started.elapsed() < Duration::from_millis(300));

        let deadline = Instant::now() + Duration::from_secs(5);
        while notifier.follow_ups.lock().unwrap().is_empty() {
            assert!(
                Instant::now() < deadline,
                "risk assessment follow-up was never delivered"
            );
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(notifier.follow_ups.lock().unwrap()[0], "assessment");
    }
}
