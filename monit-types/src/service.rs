//! Monit service checks.

use std::fmt;

/// Kind of a Monit service, as carried by the `type` attribute of a
/// `<service>` element in the status XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Filesystem,
    Directory,
    File,
    /// Process checked through its pidfile.
    ProcessPidfile,
    RemoteHost,
    System,
    Fifo,
    /// Process matched by its command path.
    ProcessPath,
    Network,
    /// A type code this exporter does not know about.
    Unknown(i32),
}

impl ServiceType {
    /// Map a Monit type code to a service type.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ServiceType::Filesystem,
            1 => ServiceType::Directory,
            2 => ServiceType::File,
            3 => ServiceType::ProcessPidfile,
            4 => ServiceType::RemoteHost,
            5 => ServiceType::System,
            6 => ServiceType::Fifo,
            7 => ServiceType::ProcessPath,
            8 => ServiceType::Network,
            other => ServiceType::Unknown(other),
        }
    }

    /// The Monit type code.
    pub fn code(&self) -> i32 {
        match self {
            ServiceType::Filesystem => 0,
            ServiceType::Directory => 1,
            ServiceType::File => 2,
            ServiceType::ProcessPidfile => 3,
            ServiceType::RemoteHost => 4,
            ServiceType::System => 5,
            ServiceType::Fifo => 6,
            ServiceType::ProcessPath => 7,
            ServiceType::Network => 8,
            ServiceType::Unknown(code) => *code,
        }
    }

    /// Label value used for the `type` label of the service check gauge.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Filesystem => "filesystem",
            ServiceType::Directory => "directory",
            ServiceType::File => "file",
            ServiceType::ProcessPidfile => "program with pidfile",
            ServiceType::RemoteHost => "remote host",
            ServiceType::System => "system",
            ServiceType::Fifo => "fifo",
            ServiceType::ProcessPath => "program with path",
            ServiceType::Network => "network",
            ServiceType::Unknown(_) => "unknown",
        }
    }

    /// Whether the code mapped to one of the known Monit service types.
    pub fn is_known(&self) -> bool {
        !matches!(self, ServiceType::Unknown(_))
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One Monit service check, decoded from a `<service>` element.
///
/// Checks are rebuilt from scratch on every scrape; they carry no identity
/// beyond `(name, service_type)` for the duration of that scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCheck {
    /// Kind of service.
    pub service_type: ServiceType,

    /// Service name as configured in Monit.
    pub name: String,

    /// Monit status code. Zero means the check is passing.
    pub status: i64,

    /// Monitoring state as reported by Monit (`"0"` not monitored,
    /// `"1"` monitored, `"2"` initializing).
    pub monitored: String,
}

impl ServiceCheck {
    /// Create a service check.
    pub fn new(
        service_type: ServiceType,
        name: impl Into<String>,
        status: i64,
        monitored: impl Into<String>,
    ) -> Self {
        Self {
            service_type,
            name: name.into(),
            status,
            monitored: monitored.into(),
        }
    }

    /// Whether Monit reports this check as passing.
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }
}
