//! Who is running the tool, and on whose behalf.

/// Numeric identity of the invoking user.
///
/// When running under `sudo`, `uid`/`gid` are the original user's (from
/// `SUDO_UID`/`SUDO_GID`) so created files stay owned by that user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    /// Primary group of the invoking user.
    pub gid: u32,
    /// Effective uid of this process.
    pub euid: u32,
}

impl Identity {
    #[allow(unsafe_code)]
    pub fn current() -> Self {
        // SAFETY: getuid/getgid/geteuid take no arguments, touch no memory
        // we own, and are documented to always succeed.
        let (uid, gid, euid) = unsafe { (libc::getuid(), libc::getgid(), libc::geteuid()) };

        if euid == 0 {
            let sudo = |name: &str| std::env::var(name).ok().and_then(|v| v.parse::<u32>().ok());
            if let (Some(sudo_uid), Some(sudo_gid)) = (sudo("SUDO_UID"), sudo("SUDO_GID")) {
                return Self {
                    uid: sudo_uid,
                    gid: sudo_gid,
                    euid,
                };
            }
        }

        Self { uid, gid, euid }
    }

    pub fn is_root(&self) -> bool {
        self.euid == 0
    }

    /// `uid:gid` form accepted by `chown`.
    pub fn owner_spec(&self) -> String {
        format!("{}:{}", self.uid, self.gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_spec() {
        let id = Identity {
            uid: 501,
            gid: 20,
            euid: 501,
        };
        assert_eq!(id.owner_spec(), "501:20");
        assert!(!id.is_root());
    }
}
