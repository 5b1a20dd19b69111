//! Long-running operation polling.
//!
//! Some server-side work, such as bulk imports or index builds, outlives a
//! single RPC. The server hands back an [`OperationStatus`] naming the work
//! and, optionally, a type-erased progress payload. [`Operation`] tracks one
//! such piece of work on the client side and refreshes it through an
//! [`OperationsRpc`] handle; a [`MetadataRegistry`] supplies the decoders
//! that turn payload bytes into typed progress values.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use cirrus_protocol::{AnyPayload, GetOperationRequest, OperationStatus};

use crate::error::{ClientError, ClientResult};

/// Type URL prefix for metadata payloads produced by Cirrus servers.
pub const DEFAULT_TYPE_URL_PREFIX: &str = "type.cirrus.dev";

/// Builds the canonical type URL for a metadata kind.
#[must_use]
pub fn type_url_for(kind: &str) -> String {
    format!("{DEFAULT_TYPE_URL_PREFIX}/{kind}")
}

/// Fetches operation statuses from the server.
pub trait OperationsRpc: Send + Sync {
    /// Returns the current status of the named operation.
    fn get_operation(&self, request: &GetOperationRequest) -> ClientResult<OperationStatus>;
}

type Decoder<M> = Box<dyn Fn(&[u8]) -> Option<M> + Send + Sync>;

/// Maps metadata type URLs to decoders for progress type `M`.
///
/// Registries are plain values handed to the call sites that need them, so
/// two clients can decode the same type URL differently and tests can
/// register decoders without touching shared state.
pub struct MetadataRegistry<M> {
    decoders: HashMap<String, Decoder<M>>,
}

impl<M> MetadataRegistry<M> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers `decoder` for payloads tagged with `type_url`.
    ///
    /// Each type URL takes exactly one decoder; registering a second is an
    /// error rather than a silent replacement.
    pub fn register<F>(&mut self, type_url: impl Into<String>, decoder: F) -> ClientResult<()>
    where
        F: Fn(&[u8]) -> Option<M> + Send + Sync + 'static,
    {
        match self.decoders.entry(type_url.into()) {
            Entry::Occupied(entry) => Err(ClientError::DuplicateDecoder {
                type_url: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Box::new(decoder));
                Ok(())
            }
        }
    }

    /// Decodes `payload`, returning `None` for unknown type URLs and for
    /// payloads the registered decoder rejects.
    pub fn decode(&self, payload: &AnyPayload) -> Option<M> {
        self.decoders
            .get(&payload.type_url)
            .and_then(|decoder| decoder(&payload.value))
    }

    /// Returns `true` if a decoder is registered for `type_url`.
    #[must_use]
    pub fn contains(&self, type_url: &str) -> bool {
        self.decoders.contains_key(type_url)
    }

    /// Returns the number of registered decoders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` if no decoders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl<M> Default for MetadataRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MetadataRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut type_urls: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        type_urls.sort_unstable();
        f.debug_struct("MetadataRegistry")
            .field("type_urls", &type_urls)
            .finish()
    }
}

/// Client-side handle for one long-running server operation.
#[derive(Debug, Clone)]
pub struct Operation<M> {
    name: String,
    metadata: Option<M>,
    complete: bool,
}

impl<M> Operation<M> {
    /// Creates a handle for the named operation with no status fetched yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            complete: false,
        }
    }

    /// Creates a handle from a status the server already returned,
    /// decoding its metadata through `registry`.
    #[must_use]
    pub fn from_status(status: &OperationStatus, registry: &MetadataRegistry<M>) -> Self {
        Self {
            name: status.name.clone(),
            metadata: status
                .metadata
                .as_ref()
                .and_then(|payload| registry.decode(payload)),
            complete: status.done,
        }
    }

    /// Returns the server-assigned operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the most recently decoded progress metadata.
    #[must_use]
    pub fn metadata(&self) -> Option<&M> {
        self.metadata.as_ref()
    }

    /// Returns `true` once the operation has been observed complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Fetches the operation's current status and returns whether it has
    /// finished.
    ///
    /// Metadata attached to the refreshed status replaces the held value;
    /// a status without metadata keeps the previous value. Polling an
    /// operation already observed complete is an error.
    pub fn poll(
        &mut self,
        service: &dyn OperationsRpc,
        registry: &MetadataRegistry<M>,
    ) -> ClientResult<bool> {
        if self.complete {
            return Err(ClientError::OperationAlreadyComplete);
        }

        let request = GetOperationRequest::new(&self.name);
        let status = service.get_operation(&request)?;
        if let Some(payload) = &status.metadata {
            self.metadata = registry.decode(payload);
        }
        self.complete = status.done;
        Ok(self.complete)
    }
}
