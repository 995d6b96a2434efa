//! Interactive terminal selector.
//!
//! Fills unset configuration fields by prompting on the terminal. Every
//! prompt accepts an empty answer to defer to the fixed default, so a
//! run of plain Enter presses reproduces the default configuration.

use std::io::BufRead;

use crate::config::SelectionOverrides;
use crate::error::ConfigError;
use crate::kernel::sources::DeviceDb;

/// Prompt on stdin/stderr for the run's answers.
pub fn prompt_overrides(db: &DeviceDb) -> Result<SelectionOverrides, ConfigError> {
    let stdin = std::io::stdin();
    let mut lock = stdin.lock();
    read_selection(&mut lock, db)
}

/// Prompt against an arbitrary reader (tests feed canned answers).
pub fn read_selection<R: BufRead>(
    reader: &mut R,
    db: &DeviceDb,
) -> Result<SelectionOverrides, ConfigError> {
    let devices = db.available_devices();

    eprintln!("Select device profile:");
    for (index, device) in devices.iter().enumerate() {
        eprintln!("  {}. {}", index + 1, device);
    }
    eprint!("Device [default: keep]: ");
    let device = match read_line(reader)? {
        answer if answer.is_empty() => None,
        answer => match answer.parse::<usize>() {
            Ok(number) if (1..=devices.len()).contains(&number) => {
                Some(devices[number - 1].to_string())
            }
            Ok(number) => {
                return Err(ConfigError::ValidationFailed(format!(
                    "device selection {} out of range 1..={}",
                    number,
                    devices.len()
                )))
            }
            Err(_) => Some(answer),
        },
    };

    eprint!("Kernel suffix [default: keep]: ");
    let kernel_suffix = match read_line(reader)? {
        answer if answer.is_empty() => None,
        answer => Some(answer),
    };

    eprint!("Enable KPM image patching? [y/N]: ");
    let enable_kpm = parse_bool_answer(&read_line(reader)?);

    eprint!("Enable LZ4KD compression patches? [y/N]: ");
    let enable_lz4kd = parse_bool_answer(&read_line(reader)?);

    Ok(SelectionOverrides {
        device,
        kernel_suffix,
        enable_kpm,
        enable_lz4kd,
        ..Default::default()
    })
}

/// Interpret a yes/no answer; empty defers to the default.
pub fn parse_bool_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, ConfigError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
