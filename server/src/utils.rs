use std::net::{IpAddr, SocketAddr};

// Renders peer addresses for log output, honouring safe mode
#[derive(Debug, Clone, Copy, Default)]
pub struct Redactor {
    safe_mode: bool,
}

impl Redactor {
    pub fn new(safe_mode: bool) -> Self {
        Self { safe_mode }
    }

    pub fn addr(&self, addr: &SocketAddr) -> String {
        if self.safe_mode {
            shared::REDACTED.to_string()
        } else {
            addr.to_string()
        }
    }

    pub fn ip(&self, ip: &IpAddr) -> String {
        if self.safe_mode {
            shared::REDACTED.to_string()
        } else {
            ip.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_addresses_without_safe_mode() {
        let redactor = Redactor::new(false);
        let addr: SocketAddr = "192.168.1.7:50123".parse().unwrap();
        assert_eq!(redactor.addr(&addr), "192.168.1.7:50123");
        assert_eq!(redactor.ip(&addr.ip()), "192.168.1.7");
    }

    #[test]
    fn test_placeholder_in_safe_mode() {
        let redactor = Redactor::new(true);
        let addr: SocketAddr = "[::1]:6969".parse().unwrap();
        assert_eq!(redactor.addr(&addr), "[REDACTED]");
        assert_eq!(redactor.ip(&addr.ip()), "[REDACTED]");
    }
}
