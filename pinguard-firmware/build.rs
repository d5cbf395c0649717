//! Build script for pinguard-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates guard.toml at compile time
//! - Generates `guard_config.rs` constants from it

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use pinguard_core::diagnostics::HISTORY_DEPTH;
use pinguard_core::enforce::{MAX_PULSE_REPETITIONS, MAX_PULSE_US};
use pinguard_core::pin::PinIdentity;

fn main() {
    setup_linker();
    let config = load_config();
    let guard = validate_config(&config);
    write_constants(&guard);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Read and parse guard.toml
fn load_config() -> toml::Value {
    println!("cargo:rerun-if-changed=guard.toml");

    let config_path = Path::new("guard.toml");

    if !config_path.exists() {
        fail(
            "guard.toml not found",
            &["The firmware requires a guard.toml next to Cargo.toml".to_string()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read guard.toml", &[e.to_string()]),
    };

    match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let lines: Vec<String> = e.to_string().lines().map(str::to_string).collect();
            fail("Invalid TOML syntax in guard.toml", &lines)
        }
    }
}

/// Validated guard settings, already rendered as Rust expressions
struct Guard {
    pin_name: String,
    port: u8,
    pin: u8,
    pull: &'static str,
    drive: &'static str,
    sense: &'static str,
    input_buffer: bool,
    fast_ms: u32,
    medium_ms: u32,
    slow_ms: u32,
    fast_cycles: u32,
    medium_cycles: u32,
    hold_us: u32,
    gap_us: u32,
    repetitions: u8,
    fallback: &'static str,
    monitor_interval_ms: u32,
    contention_threshold: u8,
}

/// Validate every section, collecting all errors before failing
fn validate_config(config: &toml::Value) -> Guard {
    let mut errors = Vec::new();

    for section in ["pin", "target", "backoff", "pulse", "fallback", "monitor"] {
        if !matches!(config.get(section), Some(toml::Value::Table(_))) {
            errors.push(format!("Missing [{}] section", section));
        }
    }
    if !errors.is_empty() {
        fail("Missing required sections in guard.toml", &errors);
    }

    // [pin]
    let pin_name = string(config, "pin", "name", &mut errors).unwrap_or_default();
    let (port, pin) = match PinIdentity::parse(&pin_name) {
        Ok(id) => (id.port().index(), id.pin()),
        Err(e) => {
            errors.push(format!("[pin] name '{}' is not a valid pin: {:?}", pin_name, e));
            (0, 0)
        }
    };

    // [target]
    let pull = choice(
        config,
        "target",
        "pull",
        &[
            ("none", "Pull::None"),
            ("down", "Pull::PullDown"),
            ("up", "Pull::PullUp"),
        ],
        &mut errors,
    );
    let drive = choice(
        config,
        "target",
        "drive",
        &[
            ("s0s1", "DriveStrength::Standard"),
            ("h0s1", "DriveStrength::HighSink"),
            ("s0h1", "DriveStrength::HighSource"),
            ("h0h1", "DriveStrength::High"),
            ("d0s1", "DriveStrength::OpenSource"),
            ("d0h1", "DriveStrength::OpenSourceHigh"),
            ("s0d1", "DriveStrength::OpenDrain"),
            ("h0d1", "DriveStrength::OpenDrainHigh"),
        ],
        &mut errors,
    );
    let sense = choice(
        config,
        "target",
        "sense",
        &[
            ("disabled", "SenseMode::Disabled"),
            ("high", "SenseMode::High"),
            ("low", "SenseMode::Low"),
        ],
        &mut errors,
    );
    let input_buffer = match config.get("target").and_then(|t| t.get("input_buffer")) {
        Some(toml::Value::Boolean(b)) => *b,
        None => true,
        Some(_) => {
            errors.push("[target] input_buffer must be true or false".to_string());
            true
        }
    };
    if !input_buffer && sense != "SenseMode::Disabled" {
        errors.push("[target] sense requires input_buffer = true".to_string());
    }

    // [backoff]
    let fast_ms = integer(config, "backoff", "fast_ms", 1..=60_000, &mut errors);
    let medium_ms = integer(config, "backoff", "medium_ms", 1..=60_000, &mut errors);
    let slow_ms = integer(config, "backoff", "slow_ms", 1..=600_000, &mut errors);
    let fast_cycles = integer(config, "backoff", "fast_cycles", 0..=10_000, &mut errors);
    let medium_cycles = integer(config, "backoff", "medium_cycles", 0..=10_000, &mut errors);
    if fast_cycles > medium_cycles {
        errors.push("[backoff] fast_cycles must not exceed medium_cycles".to_string());
    }

    // [pulse]
    let max_us = MAX_PULSE_US as i64;
    let hold_us = integer(config, "pulse", "hold_us", 0..=max_us, &mut errors);
    let gap_us = integer(config, "pulse", "gap_us", 0..=max_us, &mut errors);
    let max_reps = MAX_PULSE_REPETITIONS as i64;
    let repetitions = integer(config, "pulse", "repetitions", 0..=max_reps, &mut errors);

    // [fallback]
    let fallback = choice(
        config,
        "fallback",
        "policy",
        &[
            ("disable_pull", "FallbackPolicy::DisablePull"),
            ("none", "FallbackPolicy::NoFallback"),
        ],
        &mut errors,
    );

    // [monitor]
    let monitor_interval_ms = integer(config, "monitor", "interval_ms", 100..=3_600_000, &mut errors);
    // Consecutive failures are only visible across the attempt history
    let max_threshold = HISTORY_DEPTH as i64;
    let contention_threshold = integer(
        config,
        "monitor",
        "contention_threshold",
        1..=max_threshold,
        &mut errors,
    );

    if !errors.is_empty() {
        fail("Invalid guard configuration", &errors);
    }

    println!("cargo:warning=guard.toml validated successfully ({})", pin_name);

    Guard {
        pin_name,
        port,
        pin,
        pull,
        drive,
        sense,
        input_buffer,
        fast_ms: fast_ms as u32,
        medium_ms: medium_ms as u32,
        slow_ms: slow_ms as u32,
        fast_cycles: fast_cycles as u32,
        medium_cycles: medium_cycles as u32,
        hold_us: hold_us as u32,
        gap_us: gap_us as u32,
        repetitions: repetitions as u8,
        fallback,
        monitor_interval_ms: monitor_interval_ms as u32,
        contention_threshold: contention_threshold as u8,
    }
}

/// Write `$OUT_DIR/guard_config.rs`
fn write_constants(guard: &Guard) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("guard_config.rs")).unwrap();

    writeln!(f, "// Generated by build.rs from guard.toml").unwrap();
    writeln!(f, "pub const PIN_NAME: &str = {:?};", guard.pin_name).unwrap();
    writeln!(f, "pub const PIN_PORT: u8 = {};", guard.port).unwrap();
    writeln!(f, "pub const PIN_NUMBER: u8 = {};", guard.pin).unwrap();
    writeln!(f, "pub const TARGET_PULL: Pull = {};", guard.pull).unwrap();
    writeln!(f, "pub const TARGET_DRIVE: DriveStrength = {};", guard.drive).unwrap();
    writeln!(f, "pub const TARGET_SENSE: SenseMode = {};", guard.sense).unwrap();
    writeln!(f, "pub const TARGET_INPUT_BUFFER: bool = {};", guard.input_buffer).unwrap();
    writeln!(f, "pub const BACKOFF_FAST_MS: u32 = {};", guard.fast_ms).unwrap();
    writeln!(f, "pub const BACKOFF_MEDIUM_MS: u32 = {};", guard.medium_ms).unwrap();
    writeln!(f, "pub const BACKOFF_SLOW_MS: u32 = {};", guard.slow_ms).unwrap();
    writeln!(f, "pub const BACKOFF_FAST_CYCLES: u32 = {};", guard.fast_cycles).unwrap();
    writeln!(f, "pub const BACKOFF_MEDIUM_CYCLES: u32 = {};", guard.medium_cycles).unwrap();
    writeln!(f, "pub const PULSE_HOLD_US: u32 = {};", guard.hold_us).unwrap();
    writeln!(f, "pub const PULSE_GAP_US: u32 = {};", guard.gap_us).unwrap();
    writeln!(f, "pub const PULSE_REPETITIONS: u8 = {};", guard.repetitions).unwrap();
    writeln!(f, "pub const FALLBACK: FallbackPolicy = {};", guard.fallback).unwrap();
    writeln!(f, "pub const MONITOR_INTERVAL_MS: u32 = {};", guard.monitor_interval_ms).unwrap();
    writeln!(f, "pub const CONTENTION_THRESHOLD: u8 = {};", guard.contention_threshold).unwrap();
}

/// Required string field
fn string(
    config: &toml::Value,
    section: &str,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(format!("[{}] {} must be a string", section, key));
            None
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            None
        }
    }
}

/// Required string field restricted to a set of names
///
/// Returns the Rust expression for the chosen name.
fn choice(
    config: &toml::Value,
    section: &str,
    key: &str,
    options: &[(&str, &'static str)],
    errors: &mut Vec<String>,
) -> &'static str {
    let Some(value) = string(config, section, key, errors) else {
        return options[0].1;
    };
    match options.iter().find(|(name, _)| *name == value.to_lowercase()) {
        Some((_, expr)) => *expr,
        None => {
            let names: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
            errors.push(format!(
                "[{}] {} must be one of: {}",
                section,
                key,
                names.join(", ")
            ));
            options[0].1
        }
    }
}

/// Required integer field within a range
fn integer(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(n)) if range.contains(n) => *n,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            *range.start()
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            *range.start()
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            *range.start()
        }
    }
}

/// Abort the build with a boxed error report
fn fail(title: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format_error_line(e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Format one error line with box drawing
fn format_error_line(line: &str) -> String {
    let truncated = if line.chars().count() > 62 {
        format!("{}...", line.chars().take(59).collect::<String>())
    } else {
        line.to_string()
    };
    format!("║  • {:<62} ║", truncated)
}
