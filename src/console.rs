use core::fmt::{self, Write};
use log::{self, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

use crate::sync::SpinNoIrqLock;

/// Byte sink the logger writes through, typically a UART transmit routine.
pub type Putchar = fn(u8);

static SINK: Once<Putchar> = Once::new();
static PRINT_LOCK: SpinNoIrqLock<()> = SpinNoIrqLock::new(());

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(&putchar) = SINK.get() {
            s.bytes().for_each(putchar);
        }
        Ok(())
    }
}

pub fn print(args: fmt::Arguments) {
    let _locked = PRINT_LOCK.lock();
    // The sink cannot fail.
    let _ = Stdout.write_fmt(args);
}

#[repr(u8)]
enum ColorCode {
    Red = 31,
    Green = 32,
    Yellow = 33,
    Cyan = 36,
    White = 37,
    BrightBlack = 90,
    BrightRed = 91,
    BrightGreen = 92,
    BrightYellow = 93,
    BrightCyan = 96,
}

impl ColorCode {
    /// Colours of the level tag and of the message body.
    fn for_level(level: Level) -> (Self, Self) {
        match level {
            Level::Error => (Self::BrightRed, Self::Red),
            Level::Warn => (Self::BrightYellow, Self::Yellow),
            Level::Info => (Self::BrightGreen, Self::Green),
            Level::Debug => (Self::BrightCyan, Self::Cyan),
            Level::Trace => (Self::BrightBlack, Self::BrightBlack),
        }
    }
}

/// Add escape sequence to print with color in Linux console
macro_rules! with_color {
    ($color_code:expr, $($arg:tt)*) => {{
        format_args!("\u{1B}[{}m{}\u{1B}[m", $color_code as u8, format_args!($($arg)*))
    }};
}

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        let target = record.target();
        let (level_color, args_color) = ColorCode::for_level(level);
        print(with_color!(
            ColorCode::White,
            "[{level} {info} {data}\n",
            level = with_color!(level_color, "{level:<5}"),
            info = with_color!(ColorCode::White, "{target}]"),
            data = with_color!(args_color, "{args}", args = record.args()),
        ));
    }

    fn flush(&self) {}
}

/// Installs the kernel logger, writing every record through `putchar`.
///
/// Fails if another logger was installed first.
pub fn init(putchar: Putchar, level: LevelFilter) -> Result<(), SetLoggerError> {
    static LOGGER: SimpleLogger = SimpleLogger;
    SINK.call_once(|| putchar);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
