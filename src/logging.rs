use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use cfg_if::cfg_if;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Entries kept by the on-screen console
pub const CONSOLE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    pub level: Level,
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct ConsoleState {
    entries: VecDeque<ConsoleEntry>,
    hidden: bool,
}

/// Ring buffer of recent log lines, shared between the tracing layer and the
/// debug console window
#[derive(Debug, Clone, Default)]
pub struct ConsoleLog {
    inner: Arc<Mutex<ConsoleState>>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        // A panic while logging must not take the console down with it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: Level, message: impl Into<String>) {
        let mut state = self.state();
        if state.entries.len() == CONSOLE_CAPACITY {
            state.entries.pop_front();
        }
        state.entries.push_back(ConsoleEntry {
            level,
            timestamp: timestamp(),
            message: message.into(),
        });
    }

    pub fn clear(&self) {
        self.state().entries.clear();
    }

    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.state().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_visible(&self) -> bool {
        !self.state().hidden
    }

    pub fn set_visible(&self, visible: bool) {
        self.state().hidden = !visible;
    }

    pub fn toggle(&self) {
        let mut state = self.state();
        state.hidden = !state.hidden;
    }
}

/// Tracing layer feeding a [`ConsoleLog`]
pub struct ConsoleLayer {
    log: ConsoleLog,
}

impl ConsoleLayer {
    pub fn new(log: ConsoleLog) -> Self {
        Self { log }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        visitor.message.push_str(&visitor.fields);
        self.log.push(*event.metadata().level(), visitor.message);
    }
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        fn timestamp() -> String {
            String::from(js_sys::Date::new_0().to_iso_string())
        }

        pub fn init(console: ConsoleLog) {
            // Log to browser console via tracing-wasm
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"));

            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            tracing_subscriber::registry()
                .with(filter)
                .with(wasm_layer)
                .with(ConsoleLayer::new(console))
                .init();

            // Panics with stacktrace
            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;
        use std::env;
        use std::io;
        use std::path::Path;
        use std::time::{SystemTime, UNIX_EPOCH};
        use once_cell::sync::OnceCell;

        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// UTC wall clock time of day, `HH:MM:SS.mmm`
        fn timestamp() -> String {
            let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
            let secs = since_epoch.as_secs() % 86_400;
            format!(
                "{:02}:{:02}:{:02}.{:03}",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60,
                since_epoch.subsec_millis()
            )
        }

        pub fn init(console: ConsoleLog) {
            // Env filter: use RUST_LOG or default to info
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"));

            // Console (stderr) layer with file/line
            let console_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .compact();

            // File logging (RUST_LOG_FILE or logs/showroom.log), rotated daily
            let log_path = env::var("RUST_LOG_FILE").unwrap_or_else(|_| "logs/showroom.log".to_string());
            let log_path = Path::new(&log_path);
            let (nb_writer, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::daily(
                    log_path.parent().unwrap_or(Path::new(".")),
                    log_path.file_name().unwrap_or(std::ffi::OsStr::new("showroom.log")),
                )
            );
            let _ = FILE_GUARD.set(guard);

            let file_layer = fmt::layer()
                .with_writer(nb_writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .compact();

            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .with(ConsoleLayer::new(console))
                .init();

            // Hook panics to log with backtrace
            std::panic::set_hook(Box::new(|info| {
                let mut msg = String::new();
                if let Some(loc) = info.location() {
                    msg.push_str(&format!("panic at {}:{}:{} ", loc.file(), loc.line(), loc.column()));
                }
                if let Some(s) = info.payload().downcast_ref::<&str>() { msg.push_str(s); }
                else if let Some(s) = info.payload().downcast_ref::<String>() { msg.push_str(s); }
                else { msg.push_str("<non-string panic>"); }
                let bt = std::backtrace::Backtrace::force_capture();
                tracing::error!("{}\nBacktrace:\n{:?}", msg, bt);
            }));
        }
    }
}
