//! Utility functions for socket operations

/// Check if running as root
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Hint printed when raw sockets cannot be opened.
pub fn privilege_hint() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "run as root or grant the binary CAP_NET_RAW (sudo setcap cap_net_raw+ep <path>)"
    }
    #[cfg(all(unix, not(target_os = "linux")))]
    {
        "run as root (e.g. with sudo)"
    }
    #[cfg(not(unix))]
    {
        "raw ICMP probing is only supported on Unix-like systems"
    }
}
