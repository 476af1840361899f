use std::io;

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// `-v`の指定回数からログレベルを決める。
pub fn level_from_verbosity(verbose: u64) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 標準エラー出力へのロガーを初期化する。
///
/// 標準出力はタイムカードの表示に利用するため、ログは標準エラー出力に出す。
pub fn init(verbose: u64) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%:z"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level_from_verbosity(verbose))
        // HTTPクライアントとサーバーの内部ログは抑える
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(io::stderr())
        .apply()
        .context("Failed to initialize logger")
}
