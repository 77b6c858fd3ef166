//! Platform Isolation Hooks
//!
//! Best-effort isolation applied to a child process before it starts. Any
//! step the OS refuses degrades silently; validation has already run by the
//! time these hooks apply.
//!
//! - Linux: new session (which implies a new process group), namespace
//!   isolation where permitted, and a drop to an unprivileged uid/gid when
//!   running elevated
//! - macOS: new session
//! - Windows: new process group, hidden window
//! - elsewhere: validation only

use tokio::process::Command;

/// Unprivileged uid/gid used when the shell itself runs as root.
#[cfg(target_os = "linux")]
const NOBODY: u32 = 65534;

// Hardcoded rather than pulling in a Windows API crate for two constants.
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub fn apply_isolation(command: &mut Command) {
    #[cfg(target_os = "linux")]
    unsafe {
        command.pre_exec(|| {
            // New session; the child becomes its own process-group leader.
            libc::setsid();
            // Namespace isolation needs privileges most environments do not
            // grant; failure is fine.
            libc::unshare(libc::CLONE_NEWPID | libc::CLONE_NEWNS | libc::CLONE_NEWNET | libc::CLONE_NEWIPC);
            if libc::geteuid() == 0 {
                libc::setgid(NOBODY);
                libc::setuid(NOBODY);
            }
            Ok(())
        });
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    unsafe {
        command.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    #[cfg(windows)]
    {
        command.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = command;
    }
}

/// Send termination to a child and its process group.
pub fn terminate(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        // After setsid the child's pgid equals its pid; this reaches any
        // grandchildren it spawned.
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    let _ = child.start_kill();
}
