//! External collaborators injected into the logger: credential lookup and
//! host information. Kept behind traits so applications substitute their
//! own sources without touching logger internals.

pub mod credentials;
pub mod sysinfo;

pub use credentials::{Credentials, EnvCredentials, MemoryCredentials};
pub use sysinfo::{HostSysinfo, Sysinfo};
