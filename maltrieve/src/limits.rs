use std::io;

/// Raise the soft open-file limit to `target` (capped at the hard limit).
/// Returns the soft limit now in effect. The change lasts for the process
/// lifetime; a limit already at or above `target` is left alone.
pub fn raise_open_file_limit(target: u64) -> io::Result<u64> {
    rlimit::increase_nofile_limit(target)
}
