#[macro_export]
macro_rules! message {
    ($($arg:tt)*) => {
        log::info!($($arg)*);
    };
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        log::warn!($($arg)*);
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        log::error!($($arg)*);
    };
}

#[macro_export]
macro_rules! error_and_exit {
    ($($arg:tt)*) => {
        log::error!($($arg)*);
        std::process::exit(1);
    };
}

#[macro_export]
macro_rules! debug_message {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

pub use debug_message;
pub use error;
pub use error_and_exit;
pub use message;
pub use warning;
