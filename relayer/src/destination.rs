//! Destination chain collaborator.
//!
//! The chain hosting the LCP light client. The transaction submitter and
//! query client live in the embedding relayer; the lifecycle manager needs
//! only this narrow capability handle.

use async_trait::async_trait;

use crate::types::{ChainError, Height, MsgId, MsgSearchResult, MsgUpdateClient, ProtoAny};

/// Interface to the destination chain.
#[async_trait]
pub trait DestinationChain: Send + Sync {
    /// Identifier of the LCP client hosted on this chain.
    fn client_id(&self) -> &str;

    /// The chain's latest observed height.
    async fn latest_height(&self) -> Result<Height, ChainError>;

    /// The chain's latest finalized height.
    async fn latest_finalized_height(&self) -> Result<Height, ChainError>;

    /// Queries the packed LCP client state at the given height.
    async fn query_client_state(&self, height: Height) -> Result<ProtoAny, ChainError>;

    /// Submits messages and returns one id per message.
    async fn send_msgs(&self, msgs: Vec<MsgUpdateClient>) -> Result<Vec<MsgId>, ChainError>;

    /// Looks up the inclusion and execution result of a submitted message.
    ///
    /// Returns [`MsgSearchResult::NotFound`] when the message is in no known
    /// block; an `Err` is reserved for transport failures.
    async fn msg_result(&self, msg_id: &MsgId) -> Result<MsgSearchResult, ChainError>;

    /// The account address used for submissions.
    async fn signer_address(&self) -> Result<String, ChainError>;
}
