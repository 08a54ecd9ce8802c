//! Helper functions that need OS/platform specific implementations

use std::{thread, time};

/// Sleep for the given time, rounded up by the OS timer resolution
pub fn sleep(duration: time::Duration) {
    thread::sleep(duration);
}
