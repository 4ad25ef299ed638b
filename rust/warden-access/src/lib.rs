//! Agents, the access service, and the session protocol between them.
//!
//! An [`Agent`](agent::Agent) holds a key and the delegations granted to
//! it. It creates spaces, delegates parts of them onward, and invokes
//! capabilities through a [`Connection`](connection::Connection) to an
//! [`AccessService`](service::AccessService). The service validates every
//! invocation's proof chain before acting on it.
//!
//! Linking a device to an email account takes a round trip through the
//! account holder's inbox:
//!
//! ```text
//!   agent ──access/authorize──▶ service ──email(link)──▶ account holder
//!                                  ▲                           │
//!                                  └──────access/confirm───────┘
//!   agent ──access/claim──▶ service: account delegation + attestation
//! ```
//!
//! | Ability             | Performed by   | Effect                                  |
//! |---------------------|----------------|-----------------------------------------|
//! | `access/authorize`  | service        | emails a confirmation link              |
//! | `access/confirm`    | service        | issues the session                      |
//! | `access/claim`      | service        | returns delegations held for the agent  |
//! | `access/delegate`   | service        | keeps delegations for later claims      |
//! | `ucan/revoke`       | service        | records a revocation                    |
//! | `space/info`        | service        | describes a provisioned space           |
//! | `provider/add`      | service        | provisions a space for an account       |

pub mod agent;
pub mod config;
pub mod connection;
mod error;
pub mod invocation;
pub mod mailto;
pub mod notifier;
pub mod service;
pub mod session;
pub mod storage;
pub mod validator;

pub use agent::{Agent, AgentMeta, DelegateOptions, InvokeOptions, RevokeOptions};
pub use config::{AgentConfig, ServiceConfig};
pub use connection::{Connection, ServiceConnection};
pub use error::*;
pub use invocation::{Failure, Invocation, Receipt};
pub use service::AccessService;
pub use validator::{Authorized, Validator};
