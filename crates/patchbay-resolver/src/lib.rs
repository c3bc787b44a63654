//! patchbay resolver — answers the softswitch's directory, dialplan,
//! and configuration lookups.
//!
//! The services are generic over the `patchbay-core` repository traits
//! so this crate has no dependency on the database layer. Every
//! resolver returns a finished XML document string; the dialplan path
//! in particular never fails, internal errors degrade to the standard
//! answer/announce/hangup program.

pub mod cnam;
pub mod config;
pub mod configuration;
pub mod dialplan;
pub mod directory;
pub mod error;
pub mod number;
pub mod program;
pub mod vars;
pub mod xml;

pub use cnam::{CnamClient, CnamRecord};
pub use config::{CnamCredentials, ResolverConfig};
pub use configuration::ConfigurationService;
pub use dialplan::DialplanService;
pub use directory::DirectoryService;
pub use error::{ResolverError, ResolverResult};
pub use program::ExtensionProgram;
pub use vars::SwitchVars;
