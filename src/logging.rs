//! Feature-gated console logging.
//!
//! With `esp32-log` enabled the [`log!`] macro forwards to
//! `esp_println::println!`. Without it the arguments are still type-checked
//! but nothing is emitted.

#[cfg(feature = "esp32-log")]
macro_rules! log {
    ($($arg:tt)*) => {
        esp_println::println!($($arg)*)
    };
}

#[cfg(not(feature = "esp32-log"))]
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

pub(crate) use log;
