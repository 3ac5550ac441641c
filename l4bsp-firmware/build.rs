//! Build script for l4bsp-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time
//! - Generates the `BOARD` constant from board.toml

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = validate_config();
    generate_board(&config);
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

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml configuration at compile time
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml board description.           ║\n\
            ║  Please create one in the l4bsp-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Parse and validate TOML syntax
    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_required_sections(&config);

    validate_i2c(&config);
    validate_touch(&config);
    validate_flash(&config);
    validate_sd(&config);
    validate_memory(&config);
    validate_idd(&config);

    println!("cargo:warning=board.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Abort the build with a boxed list of errors
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
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
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

const SECTIONS: [&str; 6] = ["i2c", "touch", "flash", "sd", "memory", "idd"];

/// Validate that required sections exist
fn validate_required_sections(config: &toml::Value) {
    let errors: Vec<String> = SECTIONS
        .iter()
        .filter(|s| !matches!(config.get(**s), Some(toml::Value::Table(_))))
        .map(|s| format!("Missing [{}] section", s))
        .collect();

    report("Missing required sections in board.toml", &errors);
}

fn section<'a>(config: &'a toml::Value, name: &str) -> &'a toml::value::Table {
    config
        .get(name)
        .and_then(|v| v.as_table())
        .expect("section presence checked")
}

/// Integer field within `min..=max`, recording an error otherwise
fn int_field(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) -> i64 {
    match table.get(key) {
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => *v,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
            0
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
}

fn bool_field(table: &toml::value::Table, section: &str, key: &str, errors: &mut Vec<String>) -> bool {
    match table.get(key) {
        Some(toml::Value::Boolean(b)) => *b,
        Some(_) => {
            errors.push(format!("[{}] {} must be true or false", section, key));
            false
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            false
        }
    }
}

const I2C_DEVICES: [&str; 4] = ["eeprom", "eeprom_system", "io_expander", "touch"];

/// Validate I2C bus and device addresses
fn validate_i2c(config: &toml::Value) {
    let i2c = section(config, "i2c");
    let mut errors = Vec::new();

    int_field(i2c, "i2c", "frequency", 1, 1_000_000, &mut errors);

    // 0x00-0x07 and 0x78-0x7F are reserved addresses
    let mut seen: Vec<(i64, &str)> = Vec::new();
    for device in I2C_DEVICES {
        let addr = int_field(i2c, "i2c", device, 0x08, 0x77, &mut errors);
        if addr == 0 {
            continue;
        }
        if let Some((_, other)) = seen.iter().find(|(a, _)| *a == addr) {
            errors.push(format!(
                "[i2c] {} and {} share address 0x{:02X}",
                other, device, addr
            ));
        }
        seen.push((addr, device));
    }

    report("Invalid i2c configuration", &errors);
}

const ORIENTATIONS: [(&str, &str); 4] = [
    ("portrait", "Portrait"),
    ("landscape", "Landscape"),
    ("portrait_flipped", "PortraitFlipped"),
    ("landscape_flipped", "LandscapeFlipped"),
];

/// Validate touch panel geometry
fn validate_touch(config: &toml::Value) {
    let touch = section(config, "touch");
    let mut errors = Vec::new();

    int_field(touch, "touch", "width", 1, 4095, &mut errors);
    int_field(touch, "touch", "height", 1, 4095, &mut errors);

    match touch.get("orientation") {
        Some(toml::Value::String(o)) => {
            if !ORIENTATIONS.iter().any(|(name, _)| name == o) {
                errors.push(format!(
                    "[touch] orientation '{}' unknown (portrait, landscape, ...)",
                    o
                ));
            }
        }
        _ => errors.push("[touch] missing 'orientation'".to_string()),
    }

    report("Invalid touch configuration", &errors);
}

/// Validate internal flash layout
fn validate_flash(config: &toml::Value) {
    let flash = section(config, "flash");
    let mut errors = Vec::new();

    let size = int_field(flash, "flash", "size", 1, u32::MAX as i64, &mut errors);
    let page_size = int_field(flash, "flash", "page_size", 8, 8192, &mut errors);
    let user_page = int_field(flash, "flash", "user_page", 0, u32::MAX as i64, &mut errors);
    let storage_pages = int_field(flash, "flash", "storage_pages", 2, 256, &mut errors);

    if errors.is_empty() {
        if page_size & (page_size - 1) != 0 {
            errors.push("[flash] page_size must be a power of two".to_string());
        } else if size % page_size != 0 {
            errors.push("[flash] size must be a multiple of page_size".to_string());
        } else {
            let pages = size / page_size;
            if storage_pages >= pages {
                errors.push("[flash] storage_pages leaves no room for code".to_string());
            } else if user_page >= pages - storage_pages {
                errors.push("[flash] user_page overlaps the storage pages".to_string());
            }
        }
    }

    report("Invalid flash configuration", &errors);
}

/// Validate the SD detect wiring
fn validate_sd(config: &toml::Value) {
    let sd = section(config, "sd");
    let mut errors = Vec::new();

    match sd.get("detect") {
        Some(toml::Value::String(detect)) => {
            if parse_detect(detect).is_none() {
                errors.push(format!(
                    "[sd] detect '{}' must be a pin, 'mfx:<0-23>' or 'none'",
                    detect
                ));
            }
        }
        _ => errors.push("[sd] missing 'detect'".to_string()),
    }

    report("Invalid sd configuration", &errors);
}

/// Validate external memory sizes
fn validate_memory(config: &toml::Value) {
    let memory = section(config, "memory");
    let mut errors = Vec::new();

    int_field(memory, "memory", "nor_size", 0, u32::MAX as i64, &mut errors);
    bool_field(memory, "memory", "nor_dtr", &mut errors);
    int_field(memory, "memory", "psram_size", 0, u32::MAX as i64, &mut errors);
    int_field(memory, "memory", "psram_latency", 3, 7, &mut errors);
    let sram = int_field(memory, "memory", "sram_size", 0, u32::MAX as i64, &mut errors);
    if sram % 2 != 0 {
        errors.push("[memory] sram_size must be even (16-bit bus)".to_string());
    }

    report("Invalid memory configuration", &errors);
}

/// Validate IDD measurement settings
fn validate_idd(config: &toml::Value) {
    let idd = section(config, "idd");
    let mut errors = Vec::new();

    int_field(idd, "idd", "pre_delay_ms", 0, 2540, &mut errors);
    int_field(idd, "idd", "measurements", 1, 255, &mut errors);
    int_field(idd, "idd", "delta_delay_ms", 0, 2540, &mut errors);
    int_field(idd, "idd", "shunts_on_board", 1, 5, &mut errors);
    int_field(idd, "idd", "vdd_min_mv", 0, 3600, &mut errors);

    report("Invalid idd configuration", &errors);
}

/// SD detect string as a `SdDetect` expression
fn parse_detect(s: &str) -> Option<String> {
    let s = s.trim();
    if s == "none" {
        return Some("SdDetect::None".to_string());
    }
    if let Some(n) = s.strip_prefix("mfx:") {
        let pin: u8 = n.parse().ok()?;
        return (pin < 24).then(|| format!("SdDetect::Expander({})", pin));
    }

    let (pin, inverted) = match s.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let rest = pin.strip_prefix('P')?;
    let port = rest.chars().next()?;
    if !('A'..='I').contains(&port) {
        return None;
    }
    let number: u8 = rest[1..].parse().ok()?;
    if number > 15 {
        return None;
    }
    Some(format!(
        "SdDetect::Pin(PinId {{ port: Port::{}, pin: {}, inverted: {} }})",
        port, number, inverted
    ))
}

fn int(config: &toml::Value, section: &str, key: &str) -> i64 {
    config[section][key].as_integer().unwrap_or_default()
}

/// Write `board_config.rs` into OUT_DIR
fn generate_board(config: &toml::Value) {
    let orientation = config["touch"]["orientation"].as_str().unwrap_or_default();
    let orientation = ORIENTATIONS
        .iter()
        .find(|(name, _)| *name == orientation)
        .map(|(_, variant)| *variant)
        .unwrap();
    let detect = parse_detect(config["sd"]["detect"].as_str().unwrap_or_default()).unwrap();
    let nor_dtr = config["memory"]["nor_dtr"].as_bool().unwrap_or_default();

    let code = format!(
        "// Generated from board.toml by build.rs\n\
        pub const BOARD: BoardConfig = BoardConfig {{\n    \
            i2c: I2cDevices {{\n        \
                frequency: {},\n        \
                eeprom: 0x{:02X},\n        \
                eeprom_system: 0x{:02X},\n        \
                io_expander: 0x{:02X},\n        \
                touch: 0x{:02X},\n    \
            }},\n    \
            touch: TouchConfig {{\n        \
                width: {},\n        \
                height: {},\n        \
                orientation: Orientation::{},\n    \
            }},\n    \
            flash: FlashLayout {{\n        \
                size: {},\n        \
                page_size: {},\n        \
                user_page: {},\n        \
                storage_pages: {},\n    \
            }},\n    \
            sd_detect: {},\n    \
            memory: MemoryConfig {{\n        \
                nor_size: {},\n        \
                nor_dtr: {},\n        \
                psram_size: {},\n        \
                psram_latency: {},\n        \
                sram_size: {},\n    \
            }},\n    \
            idd: IddSettings {{\n        \
                pre_delay_ms: {},\n        \
                measurements: {},\n        \
                delta_delay_ms: {},\n        \
                shunts_on_board: {},\n        \
                vdd_min_mv: {},\n    \
            }},\n\
        }};\n",
        int(config, "i2c", "frequency"),
        int(config, "i2c", "eeprom"),
        int(config, "i2c", "eeprom_system"),
        int(config, "i2c", "io_expander"),
        int(config, "i2c", "touch"),
        int(config, "touch", "width"),
        int(config, "touch", "height"),
        orientation,
        int(config, "flash", "size"),
        int(config, "flash", "page_size"),
        int(config, "flash", "user_page"),
        int(config, "flash", "storage_pages"),
        detect,
        int(config, "memory", "nor_size"),
        nor_dtr,
        int(config, "memory", "psram_size"),
        int(config, "memory", "psram_latency"),
        int(config, "memory", "sram_size"),
        int(config, "idd", "pre_delay_ms"),
        int(config, "idd", "measurements"),
        int(config, "idd", "delta_delay_ms"),
        int(config, "idd", "shunts_on_board"),
        int(config, "idd", "vdd_min_mv"),
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board_config.rs"), code).unwrap();
}
