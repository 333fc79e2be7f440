//! Startup banner utilities.

use std::fmt::Write;
use std::net::SocketAddr;

use crate::config::format_size;

/// Configuration for the startup banner.
pub struct BannerConfig<'a> {
    /// Version string
    pub version: &'a str,
    /// Cache group name
    pub group: &'a str,
    /// Combined byte budget for the group
    pub cache_bytes: u64,
    /// Admin/API listen address
    pub api_addr: SocketAddr,
    /// Peer RPC listen address
    pub groupcache_addr: SocketAddr,
    /// URL prefix the peer RPC is mounted under
    pub base_path: &'a str,
    /// Number of configured initial peers
    pub initial_peers: usize,
}

/// Print a startup banner to stdout.
pub fn print_banner(config: &BannerConfig) {
    let mut output = String::with_capacity(512);

    let name = "herd";
    writeln!(output, "{} v{}", name, config.version).unwrap();
    writeln!(
        output,
        "{}",
        "=".repeat(name.len() + config.version.len() + 2)
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(output, "Group:       {}", config.group).unwrap();
    writeln!(output, "Budget:      {}", format_size(config.cache_bytes)).unwrap();
    writeln!(
        output,
        "Peer RPC:    {} (under {})",
        config.groupcache_addr, config.base_path
    )
    .unwrap();
    writeln!(output, "Admin/API:   {}", config.api_addr).unwrap();
    writeln!(output, "Seed peers:  {}", config.initial_peers).unwrap();

    print!("{}", output);
}
