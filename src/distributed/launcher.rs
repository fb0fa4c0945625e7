//! Local process-group launcher
//!
//! In launch mode the current process becomes rank 0 and spawns ranks
//! 1..np-1 as copies of the current executable. Each child receives its rank,
//! the group size, and the coordinator address through the environment, and
//! the launcher's own arguments are forwarded unchanged.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use tokio::time::sleep;

/// Poll interval while watching children
const WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Ranks 1..np-1 running as child processes
#[derive(Debug)]
pub struct RankGroup {
    /// (rank, process)
    children: Vec<(usize, Child)>,
}

impl RankGroup {
    /// Spawn ranks `1..world_size`, all connecting to `coordinator`
    ///
    /// Children write nothing to stdout; their stderr is inherited so logs
    /// from every rank land on the launcher's stderr.
    pub fn spawn(
        world_size: usize,
        coordinator: SocketAddr,
        forwarded: &[OsString],
    ) -> Result<Self> {
        let exe_path = std::env::current_exe()
            .context("Failed to get current executable path")?;
        let coordinator = connectable(coordinator);

        let mut group = Self {
            children: Vec::with_capacity(world_size.saturating_sub(1)),
        };

        for rank in 1..world_size {
            let mut cmd = Command::new(&exe_path);
            cmd.args(forwarded)
                .env("RIEMANN_RANK", rank.to_string())
                .env("RIEMANN_NP", world_size.to_string())
                .env("RIEMANN_COORDINATOR", coordinator.to_string())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::inherit());

            match cmd.spawn() {
                Ok(child) => {
                    tracing::debug!(rank, pid = child.id(), "rank launched");
                    group.children.push((rank, child));
                }
                Err(e) => {
                    group.kill_all();
                    return Err(e).with_context(|| format!("Failed to spawn rank {}", rank));
                }
            }
        }

        Ok(group)
    }

    /// Number of spawned ranks; zero for a group of one
    pub fn spawned(&self) -> usize {
        self.children.len()
    }

    /// Resolve once any rank exits unsuccessfully
    ///
    /// Ranks that exit cleanly are ignored; if every rank succeeds this never
    /// resolves, so race it against the coordinator.
    pub async fn first_failure(&mut self) -> Result<(usize, ExitStatus)> {
        loop {
            for (rank, child) in self.children.iter_mut() {
                if let Some(status) = child.try_wait()
                    .with_context(|| format!("Failed to poll rank {}", rank))?
                {
                    if !status.success() {
                        return Ok((*rank, status));
                    }
                }
            }
            sleep(WATCH_INTERVAL).await;
        }
    }

    /// Wait up to `grace` for every rank to exit, then kill stragglers
    ///
    /// Returns `true` when every rank exited successfully on its own.
    pub fn cleanup(mut self, grace: Duration) -> Result<bool> {
        let deadline = std::time::Instant::now() + grace;
        let mut all_succeeded = true;

        for (rank, child) in self.children.iter_mut() {
            loop {
                match child.try_wait()? {
                    Some(status) => {
                        tracing::debug!(rank = *rank, %status, "rank exited");
                        all_succeeded &= status.success();
                        break;
                    }
                    None if std::time::Instant::now() >= deadline => {
                        tracing::warn!(rank = *rank, "rank still running, force killing");
                        child.kill()?;
                        let status = child.wait()?;
                        tracing::debug!(rank = *rank, %status, "rank killed");
                        all_succeeded = false;
                        break;
                    }
                    None => std::thread::sleep(Duration::from_millis(20)),
                }
            }
        }

        self.children.clear();
        Ok(all_succeeded)
    }

    fn kill_all(&mut self) {
        for (_, child) in self.children.iter_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.children.clear();
    }
}

impl Drop for RankGroup {
    fn drop(&mut self) {
        self.kill_all();
    }
}

/// Turn a wildcard listen address into one a local child can dial
pub fn connectable(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        let ip = match addr.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
        };
        SocketAddr::new(ip, addr.port())
    } else {
        addr
    }
}
