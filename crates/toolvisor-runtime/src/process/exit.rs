//! Human-readable exit statuses.

use std::process::ExitStatus;

/// Describe how a process ended, e.g. `exited with status 1`.
pub fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with status {code}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }

    "exited with unknown status".to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_describe_exit() {
        assert_eq!(
            describe_exit(&ExitStatus::from_raw(1 << 8)),
            "exited with status 1"
        );
        assert_eq!(
            describe_exit(&ExitStatus::from_raw(9)),
            "terminated by signal 9"
        );
    }
}
