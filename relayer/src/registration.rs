//! On-chain registration of a newly selected enclave key.
//!
//! Registration is the only write path to the destination chain owned by the
//! lifecycle manager. Everything that can be checked locally is checked
//! before the submission goes out: the attestation evidence, the
//! destination client's trusted measurement, and the operator binding.

use attestation_verifier::{EnclaveKeyInfo, IasReportVerifier};
use tracing::info;

use crate::destination::DestinationChain;
use crate::operator::OperatorSigner;
use crate::types::{
    ClientMessage, LcpClientState, MsgId, MsgUpdateClient, RegisterEnclaveKeyMessage,
    RelayerError, RelayerResult,
};

/// Registers `eki` on the destination chain and returns the submission
/// message id.
///
/// # Errors
///
/// - [`RelayerError::Attestation`] when the report no longer verifies.
/// - [`RelayerError::Fatal`] when the destination client trusts a different
///   MRENCLAVE than the quote carries.
/// - [`RelayerError::RegistrationFailed`] when the operator binding fails or
///   the chain does not return exactly one message id.
pub(crate) async fn register_enclave_key(
    verifier: &IasReportVerifier,
    destination: &dyn DestinationChain,
    operator: Option<&OperatorSigner>,
    eki: &EnclaveKeyInfo,
    now: u64,
) -> RelayerResult<MsgId> {
    let report = verifier.verify_key_info(eki, now)?;
    let report_data = report.quote.report_data()?;
    info!(
        enclave_key = %report_data.enclave_key,
        operator = %report_data.operator,
        "extracted enclave key and operator from report data"
    );

    let latest_height = destination.latest_height().await?;
    let client_state_any = destination.query_client_state(latest_height).await?;
    let client_state = LcpClientState::from_any(&client_state_any)?;

    if client_state.mrenclave != report.quote.mrenclave.as_slice() {
        return Err(RelayerError::Fatal(format!(
            "MRENCLAVE mismatch: client state trusts 0x{}, quote carries 0x{}",
            hex::encode(&client_state.mrenclave),
            hex::encode(report.quote.mrenclave)
        )));
    }

    let mut message = RegisterEnclaveKeyMessage {
        report: eki.report.clone(),
        signature: eki.signature.clone(),
        signing_cert: eki.signing_cert.clone(),
        operator_signature: None,
    };

    if let Some(operator) = operator {
        let operator_address = operator.address();
        if !client_state.operators.contains(&operator_address) {
            return Err(RelayerError::RegistrationFailed(format!(
                "operator {operator_address} is not in the client's operator set"
            )));
        }
        if let Some(expected) = report_data.expected_operator() {
            if expected != operator_address {
                return Err(RelayerError::RegistrationFailed(format!(
                    "operator mismatch: report binds the key to {expected}, configured operator is {operator_address}"
                )));
            }
        }
        let signature = operator.sign_register_enclave_key(&eki.report)?;
        info!(
            operator = %operator_address,
            signature = %hex::encode(&signature),
            "operator signature generated"
        );
        message.operator_signature = Some(signature);
    }

    let signer = destination.signer_address().await?;
    let msg = MsgUpdateClient {
        client_id: destination.client_id().to_string(),
        message: ClientMessage::RegisterEnclaveKey(message),
        signer,
    };

    let mut ids = destination.send_msgs(vec![msg]).await?;
    if ids.len() != 1 {
        return Err(RelayerError::RegistrationFailed(format!(
            "expected exactly one message id, got {}",
            ids.len()
        )));
    }
    Ok(ids.remove(0))
}
