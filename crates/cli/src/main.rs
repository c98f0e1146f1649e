//! # NES CPU CLI
//!
//! iNESのROMを読み込み、自動テストのエントリポイントから実行して結果コードを表示する

use anyhow::{bail, Context, Result};
use clap::Parser;
use nes_cpu::compliance::{self, ComplianceReport, Halt};
use nes_cpu::{MemoryMap, Rom};
use std::path::PathBuf;

/// NES CPU コンプライアンスランナー
#[derive(Parser, Debug)]
#[command(name = "nes_cpu_cli")]
#[command(about = "Runs an iNES ROM on the 6502 core and reports its result codes", long_about = None)]
struct Args {
    /// ROMファイルのパス
    #[arg(value_name = "ROM")]
    rom_path: PathBuf,

    /// リセット後に強制するPC（16進数）
    #[arg(short, long, default_value = "C000", value_parser = parse_hex)]
    entry: u16,

    /// 実行する最大命令数
    #[arg(short, long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// 結果コードを検査しない
    #[arg(long)]
    free_run: bool,

    /// メモリマップのJSONファイル
    #[arg(long, value_name = "FILE")]
    map: Option<PathBuf>,

    /// 結果をJSONで出力
    #[arg(long)]
    json: bool,

    /// 1命令ごとのトレースを出力
    #[arg(short, long)]
    trace: bool,
}

fn parse_hex(value: &str) -> std::result::Result<u16, String> {
    let digits = value
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address '{}': {}", value, e))
}

fn load_map(path: Option<&PathBuf>) -> Result<MemoryMap> {
    let Some(path) = path else {
        return Ok(MemoryMap::NES);
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read memory map {:?}", path))?;
    let map: MemoryMap = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse memory map {:?}", path))?;
    map.validate()
        .with_context(|| format!("Invalid memory map {:?}", path))?;
    Ok(map)
}

fn print_report(report: &ComplianceReport) {
    println!("entry:  ${:04X}", report.entry);
    println!("pc:     ${:04X}", report.pc);
    println!("steps:  {}", report.summary.steps);
    println!("cycles: {}", report.summary.cycles);
    match &report.summary.halt {
        Halt::Budget => println!("halt:   step budget exhausted"),
        Halt::Unimplemented { message, .. } => println!("halt:   {}", message),
    }
    println!(
        "result: ${:02X} ${:02X}",
        report.result_codes[0], report.result_codes[1]
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_module("nes_cpu", log::LevelFilter::Trace);
    }
    logger.init();

    // ROMの読み込み
    let rom = Rom::from_file(&args.rom_path)
        .with_context(|| format!("Failed to load ROM {:?}", args.rom_path))?;
    log::info!("Loaded ROM: {:?}", args.rom_path);

    let map = load_map(args.map.as_ref())?;
    let report = compliance::run_rom(map, rom, args.entry, args.max_steps)
        .context("Emulation error")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !args.free_run && !report.passed() {
        bail!(
            "ROM reported failures: ${:02X} ${:02X}",
            report.result_codes[0],
            report.result_codes[1]
        );
    }
    Ok(())
}
