//! Media generation: request building, provider endpoints and the
//! primary/retry/fallback dispatcher.

pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod provider;
pub mod quick;
pub mod request;

pub use {
    dispatcher::{AttemptRecord, Dispatch, FailureReason, GenerationDispatcher, GenerationResult, Tier},
    endpoint::{EndpointSet, Pipeline, ProviderEndpoint},
    error::{Error, ProviderError, Result},
    provider::{HttpMediaProvider, MediaProvider},
    quick::QuickImageProvider,
    request::{MediaKind, MediaRequest, SizePreset, VideoLength},
};
