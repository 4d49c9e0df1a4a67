//! Device accessibility probe
//!
//! A node counts as inaccessible only when the read-permission check fails
//! with a permission error. Busy drives and empty drives are still usable
//! nodes.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accessible,
    PermissionDenied,
    Busy,
    /// Any other failure (no medium, no such device, ...)
    Unavailable(String),
}

impl ProbeOutcome {
    pub fn is_accessible(&self) -> bool {
        !matches!(self, Self::PermissionDenied)
    }

    pub fn from_io_error(error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied;
        }
        match error.raw_os_error() {
            Some(libc::EBUSY) => Self::Busy,
            _ => Self::Unavailable(error.to_string()),
        }
    }
}

pub trait AccessProbe: Send + Sync {
    fn probe(&self, path: &Path) -> ProbeOutcome;
}

/// Checks read permission with `access(2)`. The node is never opened, so
/// the st driver never sees a close and a loaded tape keeps its position
/// even on rewinding nodes. The call only walks the path, it does not wait
/// on the drive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadAccessProbe;

impl AccessProbe for ReadAccessProbe {
    fn probe(&self, path: &Path) -> ProbeOutcome {
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return ProbeOutcome::Unavailable(format!("{} contains a NUL byte", path.display()));
        };

        // SAFETY: c_path is a valid NUL-terminated string for the whole call
        let rc = unsafe { libc::access(c_path.as_ptr(), libc::R_OK) };
        if rc == 0 {
            return ProbeOutcome::Accessible;
        }

        let outcome = ProbeOutcome::from_io_error(&io::Error::last_os_error());
        debug!("Probe {}: {:?}", path.display(), outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_error_classification() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            ProbeOutcome::from_io_error(&denied),
            ProbeOutcome::PermissionDenied
        );

        let eacces = io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(
            ProbeOutcome::from_io_error(&eacces),
            ProbeOutcome::PermissionDenied
        );

        let busy = io::Error::from_raw_os_error(libc::EBUSY);
        assert_eq!(ProbeOutcome::from_io_error(&busy), ProbeOutcome::Busy);

        let missing = io::Error::from_raw_os_error(libc::ENXIO);
        assert!(matches!(
            ProbeOutcome::from_io_error(&missing),
            ProbeOutcome::Unavailable(_)
        ));
    }

    #[test]
    fn test_only_permission_errors_are_inaccessible() {
        assert!(ProbeOutcome::Accessible.is_accessible());
        assert!(ProbeOutcome::Busy.is_accessible());
        assert!(ProbeOutcome::Unavailable("ENOMEDIUM".into()).is_accessible());
        assert!(!ProbeOutcome::PermissionDenied.is_accessible());
    }

    #[test]
    fn test_readable_file_is_accessible() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(ReadAccessProbe.probe(file.path()), ProbeOutcome::Accessible);
    }

    #[test]
    fn test_missing_path_is_still_accessible() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ReadAccessProbe.probe(&dir.path().join("st0"));
        assert!(matches!(outcome, ProbeOutcome::Unavailable(_)));
        assert!(outcome.is_accessible());
    }

    #[test]
    fn test_unreadable_file_is_denied() {
        // root bypasses permission bits
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o200)).unwrap();
        assert_eq!(
            ReadAccessProbe.probe(file.path()),
            ProbeOutcome::PermissionDenied
        );
    }

    #[test]
    fn test_fifo_without_writer_is_checked_without_opening() {
        // a blocking read open of a FIFO with no writer would hang forever
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("nst0");
        let c_path = CString::new(fifo.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);

        assert_eq!(ReadAccessProbe.probe(&fifo), ProbeOutcome::Accessible);
    }
}
