use crate::error::{SchedulerError, SchedulerResult};

/// Where to find the master, resolved from the address string handed to
/// the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterSpec {
    /// Fault-tolerant mode: follow the leader election published on the
    /// given coordination-service ensemble.
    Zoo {
        servers: Vec<String>,
        path: Option<String>,
    },
    /// Direct mode: a single master at a fixed address.
    Direct { addr: String },
    /// Spawn an in-process single-node cluster.
    Local { quiet: bool },
}

impl MasterSpec {
    /// Resolution rules, in order: `zoo://HOST[,HOST…][/PATH]`,
    /// `nexus://ADDRESS`, the literals `local` and `localquiet`, and
    /// finally a bare address in direct mode.
    pub fn parse(spec: &str) -> SchedulerResult<MasterSpec> {
        if let Some(rest) = spec.strip_prefix("zoo://") {
            let (hosts, path) = match rest.find('/') {
                Some(at) => (&rest[..at], Some(rest[at..].to_string())),
                None => (rest, None),
            };
            let servers: Vec<String> = hosts
                .split(',')
                .filter(|host| !host.is_empty())
                .map(|host| host.to_string())
                .collect();
            if servers.is_empty() {
                return Err(SchedulerError::InvalidMasterAddress(spec.to_string()));
            }
            return Ok(MasterSpec::Zoo { servers, path });
        }
        if let Some(addr) = spec.strip_prefix("nexus://") {
            if addr.is_empty() {
                return Err(SchedulerError::InvalidMasterAddress(spec.to_string()));
            }
            return Ok(MasterSpec::Direct {
                addr: addr.to_string(),
            });
        }
        match spec {
            "local" => Ok(MasterSpec::Local { quiet: false }),
            "localquiet" => Ok(MasterSpec::Local { quiet: true }),
            "" => Err(SchedulerError::InvalidMasterAddress(spec.to_string())),
            addr => Ok(MasterSpec::Direct {
                addr: addr.to_string(),
            }),
        }
    }

    pub fn is_fault_tolerant(&self) -> bool {
        matches!(self, MasterSpec::Zoo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zoo_with_hosts_and_path() {
        let spec = MasterSpec::parse("zoo://zk1:2181,zk2:2181/nexus").unwrap();
        assert_eq!(
            spec,
            MasterSpec::Zoo {
                servers: vec!["zk1:2181".to_string(), "zk2:2181".to_string()],
                path: Some("/nexus".to_string()),
            }
        );
        assert!(spec.is_fault_tolerant());
    }

    #[test]
    fn test_parse_zoo_without_path() {
        let spec = MasterSpec::parse("zoo://zk1").unwrap();
        assert_eq!(
            spec,
            MasterSpec::Zoo {
                servers: vec!["zk1".to_string()],
                path: None,
            }
        );
    }

    #[test]
    fn test_parse_zoo_requires_hosts() {
        assert!(MasterSpec::parse("zoo://").is_err());
        assert!(MasterSpec::parse("zoo:///path").is_err());
    }

    #[test]
    fn test_parse_nexus_scheme() {
        let spec = MasterSpec::parse("nexus://master:5050").unwrap();
        assert_eq!(
            spec,
            MasterSpec::Direct {
                addr: "master:5050".to_string()
            }
        );
        assert!(!spec.is_fault_tolerant());
        assert!(MasterSpec::parse("nexus://").is_err());
    }

    #[test]
    fn test_parse_local_literals() {
        assert_eq!(
            MasterSpec::parse("local").unwrap(),
            MasterSpec::Local { quiet: false }
        );
        assert_eq!(
            MasterSpec::parse("localquiet").unwrap(),
            MasterSpec::Local { quiet: true }
        );
    }

    #[test]
    fn test_parse_bare_address_is_direct() {
        assert_eq!(
            MasterSpec::parse("master:5050").unwrap(),
            MasterSpec::Direct {
                addr: "master:5050".to_string()
            }
        );
        assert!(MasterSpec::parse("").is_err());
    }
}
