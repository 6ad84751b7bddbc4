use std::time::Duration;

use tokio::process::Child;

/// Forcibly stop a child and every process in its group.
///
/// Children are spawned as process-group leaders, so signalling the group
/// also reaches grandchildren (a test runner's workers, a shell's
/// background jobs). With a non-zero `grace` the group gets SIGTERM first.
/// Always reaps the child before returning.
pub async fn terminate_tree(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let pgid = pid as libc::pid_t;
            if !grace.is_zero() {
                signal_group(pgid, libc::SIGTERM);
                if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                    // Leader is gone; stragglers in the group still get killed.
                    signal_group(pgid, libc::SIGKILL);
                    return;
                }
            }
            signal_group(pgid, libc::SIGKILL);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "start_kill on already exited child");
    }
    let _ = child.wait().await;
}

/// SIGKILL whatever is left in the group led by `pid`.
///
/// Used after the leader has been reaped but descendants still hold its
/// output pipes open.
pub fn kill_group(pid: u32) {
    #[cfg(unix)]
    {
        signal_group(pid as libc::pid_t, libc::SIGKILL);
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, sig: libc::c_int) {
    // SAFETY: killpg has no memory-safety preconditions; pgid is the group
    // created for this child at spawn time.
    let rc = unsafe { libc::killpg(pgid, sig) };
    if rc != 0 {
        tracing::debug!(pgid, sig, "killpg failed (group already gone?)");
    }
}
