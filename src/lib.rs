//! # aliddns
//!
//! A Dynamic DNS client that keeps one Alibaba Cloud DNS A/AAAA record
//! pointed at the machine's current public IP.
//!
//! ## Features
//!
//! - Minimal reconciliation: create, update in place, or leave alone
//! - Automatic recovery from duplicate records
//! - Public IP detection racing several web services
//! - Cheap skip when public DNS already answers with the current IP
//! - Repeat mode with optional random delay
//!
//! ## Usage
//!
//! ```bash
//! # List a zone
//! aliddns list --domain example.com
//!
//! # Point ddns.example.com at an address
//! aliddns update --domain ddns.example.com --ipaddr 203.0.113.7
//!
//! # Keep it in sync every 10-20 minutes
//! aliddns auto-update --domain ddns.example.com --redo 600r
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod geo;
pub mod providers;
pub mod reconciler;
pub mod record;
pub mod resolver;
pub mod scheduler;

pub use config::{Config, Credentials};
pub use detector::IpDetector;
pub use error::{DdnsError, Result};
pub use reconciler::{Outcome, Reconciler};
pub use record::{DesiredRecord, Record, RecordType};
pub use resolver::DnsResolver;
pub use scheduler::{RedoSpec, Scheduler};
