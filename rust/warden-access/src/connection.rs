//! Transport between agents and services.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use warden_common::ConditionalSync;
use warden_ucan::CodecError;
use warden_varsig::Did;

use crate::{
    invocation::{Invocation, Receipt},
    service::AccessService,
};

/// The connection itself failed; failures of individual invocations are
/// reported in their receipts instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An invocation or its proofs did not survive encoding.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The service answered with the wrong number of receipts.
    #[error("expected {expected} receipts, received {actual}")]
    ReceiptCount {
        /// Invocations sent.
        expected: usize,
        /// Receipts received.
        actual: usize,
    },
}

/// Submits invocations to a service.
///
/// Connections hold no per-agent state and may be shared by any number of
/// agents.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Connection: ConditionalSync + Debug {
    /// The service's DID; invocations are addressed to it.
    fn id(&self) -> &Did;

    /// Runs a batch of invocations. Receipts come back in the order the
    /// invocations were given.
    async fn execute(&self, invocations: Vec<Invocation>) -> Result<Vec<Receipt>, TransportError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn id(&self) -> &Did {
        (**self).id()
    }

    async fn execute(&self, invocations: Vec<Invocation>) -> Result<Vec<Receipt>, TransportError> {
        (**self).execute(invocations).await
    }
}

/// An in-process connection to an [`AccessService`].
///
/// Every invocation is archived and extracted again on the way in, so the
/// service only sees what would have crossed a wire.
#[derive(Debug, Clone)]
pub struct ServiceConnection {
    id: Did,
    service: Arc<AccessService>,
}

impl ServiceConnection {
    /// Connects to `service`.
    pub fn new(service: Arc<AccessService>) -> Self {
        Self {
            id: service.did(),
            service,
        }
    }

    /// The service behind the connection.
    pub fn service(&self) -> &Arc<AccessService> {
        &self.service
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Connection for ServiceConnection {
    fn id(&self) -> &Did {
        &self.id
    }

    async fn execute(&self, invocations: Vec<Invocation>) -> Result<Vec<Receipt>, TransportError> {
        let received = invocations
            .iter()
            .map(|invocation| Invocation::extract(&invocation.archive()?))
            .collect::<Result<Vec<_>, CodecError>>()?;
        let receipts = join_all(
            received
                .into_iter()
                .map(|delegation| self.service.receive(delegation)),
        )
        .await;
        Ok(receipts)
    }
}
