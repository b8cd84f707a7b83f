//! Console/file logger behind the `log` facade.
//!
//! `init` installs it once per process; later calls only update the
//! configuration so tests and binaries can both call it freely.

use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::Config;

static STUDIO_LOGGER: Lazy<StudioLogger> = Lazy::new(StudioLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let level = config.min_level;
    STUDIO_LOGGER.update_config(config)?;

    // Already installed by an earlier call: keep it, just adjust the level.
    let _ = log::set_logger(&*STUDIO_LOGGER);
    log::set_max_level(level);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct LogLine<'a> {
    pub timestamp: DateTime<Utc>,
    pub level: &'a str,
    pub target: &'a str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub show_location: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            show_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: false,
            output_json: true,
            log_file_path: Some("genstudio.log".to_string()),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_colors: true,
            show_location: true,
            ..Default::default()
        }
    }

    /// `GENSTUDIO_LOG` = `trace|debug|info|warn|error`, `GENSTUDIO_LOG_JSON=true`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = std::env::var("GENSTUDIO_LOG")
            .ok()
            .and_then(|value| value.parse().ok())
        {
            config.min_level = level;
        }
        if std::env::var("GENSTUDIO_LOG_JSON").map_or(false, |v| v == "true") {
            config.output_json = true;
            config.show_colors = false;
        }
        config
    }
}

pub struct StudioLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl StudioLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    fn update_config(&self, new_config: LoggerConfig) -> Result<(), String> {
        let file = match &new_config.log_file_path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| format!("Failed to open log file {}: {}", path, e))?,
            ),
            None => None,
        };

        let mut config = self.config.lock().map_err(|e| e.to_string())?;
        *config = new_config;
        let mut log_file = self.log_file.lock().map_err(|e| e.to_string())?;
        *log_file = file;
        Ok(())
    }

    fn level_label(level: Level, colors: bool) -> String {
        let label = format!("{:<5}", level.as_str());
        if !colors {
            return label;
        }
        match level {
            Level::Error => label.red().bold().to_string(),
            Level::Warn => label.yellow().bold().to_string(),
            Level::Info => label.green().bold().to_string(),
            Level::Debug => label.blue().to_string(),
            Level::Trace => label.cyan().to_string(),
        }
    }

    fn format_plain(&self, record: &Record, config: &LoggerConfig, colors: bool) -> String {
        let timestamp = Utc::now().format(&config.timestamp_format).to_string();
        let mut output = if colors {
            format!("{} ", timestamp.bright_black())
        } else {
            format!("{} ", timestamp)
        };

        output.push_str(&format!("[{}] ", Self::level_label(record.level(), colors)));
        if colors {
            output.push_str(&format!("{}: ", record.target().bright_blue()));
        } else {
            output.push_str(&format!("{}: ", record.target()));
        }
        output.push_str(&record.args().to_string());

        if config.show_location {
            if let (Some(file), Some(line)) = (record.file(), record.line()) {
                let location = format!("{}:{}", file, line);
                if colors {
                    output.push_str(&format!(" ({})", location.bright_black()));
                } else {
                    output.push_str(&format!(" ({})", location));
                }
            }
        }
        output
    }

    fn format_json(&self, record: &Record, config: &LoggerConfig) -> String {
        let line = LogLine {
            timestamp: Utc::now(),
            level: record.level().as_str(),
            target: record.target(),
            message: record.args().to_string(),
            location: if config.show_location {
                record
                    .file()
                    .zip(record.line())
                    .map(|(file, line)| format!("{}:{}", file, line))
            } else {
                None
            },
        };
        serde_json::to_string(&line).unwrap_or_default()
    }
}

impl log::Log for StudioLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let config = match self.config.lock() {
            Ok(config) => config.clone(),
            Err(_) => return,
        };

        if config.output_json {
            println!("{}", self.format_json(record, &config));
        } else {
            println!("{}", self.format_plain(record, &config, config.show_colors));
        }

        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let line = if config.output_json {
                    self.format_json(record, &config)
                } else {
                    self.format_plain(record, &config, false)
                };
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long a scope took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("Starting {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("{} took {}ms", self.name, self.elapsed().as_millis());
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str) {
    log::info!("Starting {} v{}", app_name, version);
}

/// Never prints the API key itself.
pub fn log_config_info(config: &Config) {
    log::info!("Configuration loaded:");
    log::info!("   Model: {}", config.gemini.model);
    log::info!("   Endpoint: {}", config.gemini.base_url);
    log::info!(
        "   API key: {}",
        if config.gemini.api_key.is_some() { "set" } else { "missing" }
    );
    log::info!(
        "   Storage: {:?} ({})",
        config.storage.backend,
        config.storage.path.display()
    );
    log::info!("   Cost per image: {} credits", config.image_cost);
}
