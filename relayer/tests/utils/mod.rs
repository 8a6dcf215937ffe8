//! Shared fixtures and mock collaborators for lifecycle tests.
//!
//! Real IAS-signed reports cannot be minted in tests, so fixtures build
//! structurally valid AVRs (correct JSON shape, quote body, and timestamp)
//! and the key manager under test runs with the signature-skipping verifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;
use attestation_verifier::EnclaveKeyInfo;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use enclave_key_store::EnclaveKeyStore;
use lcp_relayer::lcp::{
    CreateClientRequest, CreateClientResponse, ElcClient, LcpService, UpdateClientRequest,
    VerifyMembershipRequest,
};
use lcp_relayer::{
    ChainError, ChainType, DestinationChain, EnclaveKeyManager, Height, LcpClientState, LcpError,
    MsgId, MsgSearchResult, MsgUpdateClient, OriginProver, ProtoAny, ProverConfig, ProxyProof,
};
use tempfile::TempDir;

/// The enclave measurement trusted in all tests.
pub const MRENCLAVE: [u8; 32] = [0xaa; 32];

pub fn dt(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).expect("valid timestamp")
}

pub fn avr_timestamp(secs: u64) -> String {
    dt(secs).naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn quote_body(mrenclave: [u8; 32], enclave_key: Address, operator: Address) -> Vec<u8> {
    let mut body = vec![0u8; 432];
    body[0] = 3; // quote version
    body[96..104].copy_from_slice(&0x05u64.to_le_bytes()); // INIT | MODE64, not DEBUG
    body[112..144].copy_from_slice(&mrenclave);
    body[368..388].copy_from_slice(enclave_key.as_slice());
    body[388..408].copy_from_slice(operator.as_slice());
    body
}

pub fn avr_json(
    body: &[u8],
    attestation_time: u64,
    status: &str,
    advisories: &[&str],
) -> Vec<u8> {
    serde_json::json!({
        "id": "142090828149453720542199954221331392599",
        "version": 4,
        "timestamp": avr_timestamp(attestation_time),
        "isvEnclaveQuoteStatus": status,
        "isvEnclaveQuoteBody": STANDARD.encode(body),
        "advisoryIDs": advisories,
    })
    .to_string()
    .into_bytes()
}

/// Builds a structurally valid enclave key record.
pub fn eki(tag: u8, attestation_time: u64) -> EnclaveKeyInfo {
    eki_with(tag, attestation_time, MRENCLAVE, "OK", &[], Address::ZERO)
}

pub fn eki_with(
    tag: u8,
    attestation_time: u64,
    mrenclave: [u8; 32],
    status: &str,
    advisories: &[&str],
    operator: Address,
) -> EnclaveKeyInfo {
    let address = Address::from([tag; 20]);
    let body = quote_body(mrenclave, address, operator);
    EnclaveKeyInfo {
        enclave_key_address: address,
        report: avr_json(&body, attestation_time, status, advisories),
        signature: vec![tag; 8],
        signing_cert: vec![tag; 16],
        attestation_time,
    }
}

pub fn test_config() -> ProverConfig {
    ProverConfig {
        lcp_service_address: "http://127.0.0.1:50051".to_string(),
        elc_client_id: "elc-0".to_string(),
        mrenclave: hex::encode(MRENCLAVE),
        key_expiration: 3600,
        key_rotation_margin: None,
        allowed_quote_statuses: vec![],
        allowed_advisory_ids: vec![],
        operator_enabled: false,
        operator_private_key: None,
        chain_type: ChainType::Cosmos,
        operator_evm_eip712_params: None,
        operator_cosmos_eip712_params: None,
        debug_allow_debug_enclaves: false,
    }
}

/// Scriptable in-memory LCP service.
#[derive(Default)]
pub struct MockLcpService {
    pub available: Mutex<Vec<EnclaveKeyInfo>>,
    pub known: Mutex<HashMap<Address, EnclaveKeyInfo>>,
    pub elc_client: Mutex<Option<ElcClient>>,
    pub create_client_id: Mutex<String>,
    pub update_requests: Mutex<Vec<UpdateClientRequest>>,
    pub verify_requests: Mutex<Vec<VerifyMembershipRequest>>,
}

impl MockLcpService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            create_client_id: Mutex::new("elc-0".to_string()),
            ..Self::default()
        })
    }

    /// Makes `key` both available for selection and known to the presence
    /// probe.
    pub fn offer(&self, key: &EnclaveKeyInfo) {
        self.available.lock().unwrap().push(key.clone());
        self.known
            .lock()
            .unwrap()
            .insert(key.enclave_key_address, key.clone());
    }

    pub fn forget(&self, address: Address) {
        self.known.lock().unwrap().remove(&address);
        self.available
            .lock()
            .unwrap()
            .retain(|k| k.enclave_key_address != address);
    }
}

#[async_trait]
impl LcpService for MockLcpService {
    async fn available_enclave_keys(
        &self,
        _mrenclave: attestation_verifier::Mrenclave,
    ) -> Result<Vec<EnclaveKeyInfo>, LcpError> {
        Ok(self.available.lock().unwrap().clone())
    }

    async fn enclave_key(&self, address: Address) -> Result<Option<EnclaveKeyInfo>, LcpError> {
        Ok(self.known.lock().unwrap().get(&address).cloned())
    }

    async fn create_client(
        &self,
        _request: CreateClientRequest,
    ) -> Result<CreateClientResponse, LcpError> {
        Ok(CreateClientResponse {
            client_id: self.create_client_id.lock().unwrap().clone(),
        })
    }

    async fn update_client(&self, request: UpdateClientRequest) -> Result<ProxyProof, LcpError> {
        let signer = request.signer;
        self.update_requests.lock().unwrap().push(request);
        Ok(ProxyProof {
            message: b"proxy-message".to_vec(),
            signer,
            signature: b"enclave-signature".to_vec(),
        })
    }

    async fn verify_membership(
        &self,
        request: VerifyMembershipRequest,
    ) -> Result<ProxyProof, LcpError> {
        let signer = request.signer;
        self.verify_requests.lock().unwrap().push(request);
        Ok(ProxyProof {
            message: b"membership-message".to_vec(),
            signer,
            signature: b"enclave-signature".to_vec(),
        })
    }

    async fn client(&self, _client_id: &str) -> Result<Option<ElcClient>, LcpError> {
        Ok(self.elc_client.lock().unwrap().clone())
    }
}

/// Scriptable in-memory destination chain.
pub struct MockDestination {
    pub latest: Mutex<Height>,
    pub latest_finalized: Mutex<Height>,
    pub client_state: Mutex<LcpClientState>,
    pub msg_results: Mutex<HashMap<String, MsgSearchResult>>,
    /// Result auto-attached to every id returned by `send_msgs`
    pub auto_result: Mutex<Option<MsgSearchResult>>,
    /// Overrides the ids returned by `send_msgs` when set
    pub send_override: Mutex<Option<Vec<MsgId>>>,
    pub sent: Mutex<Vec<MsgUpdateClient>>,
    counter: AtomicU64,
}

impl MockDestination {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            latest: Mutex::new(Height::new(0, 61)),
            latest_finalized: Mutex::new(Height::new(0, 60)),
            client_state: Mutex::new(LcpClientState {
                mrenclave: MRENCLAVE.to_vec(),
                key_expiration: 3600,
                ..LcpClientState::default()
            }),
            msg_results: Mutex::new(HashMap::new()),
            auto_result: Mutex::new(Some(MsgSearchResult::Found {
                block_height: Height::new(0, 50),
                success: true,
                failure_reason: None,
            })),
            send_override: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn set_finalized_height(&self, height: Height) {
        *self.latest_finalized.lock().unwrap() = height;
    }

    pub fn set_msg_result(&self, msg_id: &str, result: MsgSearchResult) {
        self.msg_results
            .lock()
            .unwrap()
            .insert(msg_id.to_string(), result);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DestinationChain for MockDestination {
    fn client_id(&self) -> &str {
        "lcp-client-0"
    }

    async fn latest_height(&self) -> Result<Height, ChainError> {
        Ok(*self.latest.lock().unwrap())
    }

    async fn latest_finalized_height(&self) -> Result<Height, ChainError> {
        Ok(*self.latest_finalized.lock().unwrap())
    }

    async fn query_client_state(&self, _height: Height) -> Result<ProtoAny, ChainError> {
        self.client_state
            .lock()
            .unwrap()
            .into_any()
            .map_err(|e| ChainError::Query(e.to_string()))
    }

    async fn send_msgs(&self, msgs: Vec<MsgUpdateClient>) -> Result<Vec<MsgId>, ChainError> {
        let mut ids = Vec::with_capacity(msgs.len());
        for msg in msgs {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let id = MsgId(format!("msg-{n}"));
            if let Some(result) = self.auto_result.lock().unwrap().clone() {
                self.msg_results.lock().unwrap().insert(id.0.clone(), result);
            }
            self.sent.lock().unwrap().push(msg);
            ids.push(id);
        }
        if let Some(ids) = self.send_override.lock().unwrap().clone() {
            return Ok(ids);
        }
        Ok(ids)
    }

    async fn msg_result(&self, msg_id: &MsgId) -> Result<MsgSearchResult, ChainError> {
        Ok(self
            .msg_results
            .lock()
            .unwrap()
            .get(&msg_id.0)
            .cloned()
            .unwrap_or(MsgSearchResult::NotFound))
    }

    async fn signer_address(&self) -> Result<String, ChainError> {
        Ok("cosmos1relayer".to_string())
    }
}

/// Scriptable in-memory origin prover.
#[derive(Default)]
pub struct MockOrigin {
    pub headers: Mutex<Vec<ProtoAny>>,
    pub refresh_required: Mutex<bool>,
}

impl MockOrigin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl OriginProver for MockOrigin {
    async fn create_initial_light_client_state(
        &self,
        _height: Option<Height>,
    ) -> Result<(ProtoAny, ProtoAny), ChainError> {
        Ok((
            ProtoAny::new("/origin.ClientState", b"client-state".to_vec()),
            ProtoAny::new("/origin.ConsensusState", b"consensus-state".to_vec()),
        ))
    }

    async fn latest_finalized_header(&self) -> Result<ProtoAny, ChainError> {
        Ok(ProtoAny::new("/origin.Header", b"latest".to_vec()))
    }

    async fn setup_headers_for_update(
        &self,
        _latest_finalized_header: ProtoAny,
    ) -> Result<Vec<ProtoAny>, ChainError> {
        Ok(self.headers.lock().unwrap().clone())
    }

    async fn prove_state(
        &self,
        _path: &str,
        _value: &[u8],
    ) -> Result<(Vec<u8>, Height), ChainError> {
        Ok((b"origin-proof".to_vec(), Height::new(0, 55)))
    }

    async fn check_refresh_required(&self) -> Result<bool, ChainError> {
        Ok(*self.refresh_required.lock().unwrap())
    }
}

/// Builds a key manager over mocks with the signature-skipping verifier.
pub async fn manager(
    dir: &TempDir,
    config: &ProverConfig,
    lcp: Arc<MockLcpService>,
    destination: Arc<MockDestination>,
) -> EnclaveKeyManager {
    let store = EnclaveKeyStore::open(dir.path(), "ibc-0")
        .await
        .expect("failed to open store");
    let operator = lcp_relayer::OperatorSigner::from_config(config).expect("operator config");
    EnclaveKeyManager::new(
        attestation_verifier::IasReportVerifier::unverified(config.debug_allow_debug_enclaves),
        config.policy().expect("policy"),
        store,
        lcp,
        destination,
        operator,
    )
}

/// Reopens the store of an existing test directory.
pub async fn reopen_store(dir: &TempDir) -> EnclaveKeyStore {
    EnclaveKeyStore::open(dir.path(), "ibc-0")
        .await
        .expect("failed to reopen store")
}
