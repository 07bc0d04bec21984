//! Timed IP bans
//!
//! Bans expire lazily: an entry stays in the map until the next connection
//! attempt from that IP finds it expired and drops it. There is no sweeper.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

/// One banned source address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanEntry {
    pub ip: IpAddr,
    pub banned_at: Instant,
}

/// Result of checking an IP against the ban list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanStatus {
    NotBanned,
    /// Still banned for `remaining`
    Banned { remaining: Duration },
    /// Was banned; the entry has just been removed
    Expired,
}

#[derive(Debug)]
pub struct BanList {
    bans: HashMap<IpAddr, BanEntry>,
    duration: Duration,
}

impl BanList {
    pub fn new(duration: Duration) -> Self {
        Self {
            bans: HashMap::new(),
            duration,
        }
    }

    /// Bans `ip` starting at `now`, restarting any existing ban
    pub fn ban(&mut self, ip: IpAddr, now: Instant) {
        self.bans.insert(ip, BanEntry { ip, banned_at: now });
    }

    /// Checks `ip`, evicting its entry if the ban has run out
    pub fn check(&mut self, ip: &IpAddr, now: Instant) -> BanStatus {
        let Some(entry) = self.bans.get(ip) else {
            return BanStatus::NotBanned;
        };

        let elapsed = now.saturating_duration_since(entry.banned_at);
        if elapsed < self.duration {
            BanStatus::Banned {
                remaining: self.duration - elapsed,
            }
        } else {
            self.bans.remove(ip);
            BanStatus::Expired
        }
    }

    pub fn get(&self, ip: &IpAddr) -> Option<&BanEntry> {
        self.bans.get(ip)
    }

    /// Number of stored entries, including expired ones not yet checked
    pub fn len(&self) -> usize {
        self.bans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bans.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
