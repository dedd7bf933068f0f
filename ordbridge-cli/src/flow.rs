//! Bridge flow
//!
//! Drives one bridge from the Bitcoin transfer of the inscription to the
//! answer of the bridge listener. The state record is saved at every step so
//! that `ordbridge status` can report progress from another process. A
//! failure marks the record as failed and nothing else is undone.
use alloy_primitives::Address;
use bitcoin::Txid;
use chrono::Utc;
use ordbridge_core::{
	inscription::InscriptionId,
	state::{BridgeState, StateStore},
	BridgeStatus,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
	api_client::{ApiClient, InitiatePayload},
	bitcoin_client::BitcoinClient,
	poller::ConfirmationPoller,
};

/// Parameters of a bridge
#[derive(Debug, Clone)]
pub struct BridgeRequest {
	/// Bitcoin transaction sending the inscription to the bridge
	pub tx_id: Txid,
	/// Inscription being bridged
	pub inscription_id: InscriptionId,
	/// Bitcoin sender
	pub from_address: String,
	/// EVM receiver of the minted token
	pub receiver_address: Address,
	/// Free-form inscription metadata
	pub metadata: Option<Value>,
}

/// Runs bridges and keeps their state record
#[derive(Debug)]
pub struct BridgeClient<C, S> {
	poller: ConfirmationPoller<C>,
	api: ApiClient,
	store: S,
}

impl<C, S> BridgeClient<C, S>
where
	C: BitcoinClient,
	S: StateStore,
{
	/// Create a bridge client
	pub fn new(poller: ConfirmationPoller<C>, api: ApiClient, store: S) -> Self {
		Self { poller, api, store }
	}

	/// The state store
	pub fn store(&mut self) -> &mut S {
		&mut self.store
	}

	/// Current bridge state, if any and not expired
	pub fn status(&mut self) -> anyhow::Result<Option<BridgeState>> {
		Ok(self.store.load(Utc::now())?)
	}

	/// Forget the current bridge state
	pub fn clear(&mut self) -> anyhow::Result<()> {
		Ok(self.store.clear()?)
	}

	/// Run a bridge to completion. Returns the final state, `completed` or
	/// `failed`. Only state store errors are returned as errors.
	#[tracing::instrument(skip(self, request), fields(txid = %request.tx_id))]
	pub async fn bridge(&mut self, request: BridgeRequest) -> anyhow::Result<BridgeState> {
		let Self { poller, api, store } = self;

		let mut state = BridgeState::new(
			request.tx_id,
			request.inscription_id,
			request.from_address.clone(),
			request.receiver_address.to_string(),
			Utc::now(),
		);
		store.save(&state, Utc::now())?;
		info!("Waiting for confirmations of {}", request.tx_id);

		poller
			.wait_with_progress(request.tx_id, |confirmations| {
				if confirmations == state.confirmations {
					return;
				}

				state.confirmations = confirmations;
				state.updated_at = Utc::now();

				if let Err(err) = store.save(&state, Utc::now()) {
					warn!("Could not save confirmation progress: {}", err);
				}
			})
			.await;

		advance(store, &mut state, BridgeStatus::GeneratingProof)?;

		let proof = match poller.prove(request.tx_id).await {
			Ok(proof) => proof,
			Err(err) => return fail(store, state, format!("Could not generate proof: {err:#}")),
		};

		state.proof = Some(proof.clone());
		advance(store, &mut state, BridgeStatus::SubmittingToLightClient)?;

		let payload = InitiatePayload::new(
			&state,
			request.receiver_address,
			request.metadata,
			proof,
		);

		match api.initiate(&payload).await {
			Ok(result) => {
				state.result = Some(result);
				advance(store, &mut state, BridgeStatus::Completed)?;
				info!("Bridge of {} completed", state.inscription_id);

				Ok(state)
			}
			Err(err) => fail(store, state, err.to_string()),
		}
	}
}

fn advance<S: StateStore>(
	store: &mut S,
	state: &mut BridgeState,
	status: BridgeStatus,
) -> anyhow::Result<()> {
	state.transition(status, Utc::now())?;
	store.save(state, Utc::now())?;

	Ok(())
}

fn fail<S: StateStore>(
	store: &mut S,
	mut state: BridgeState,
	reason: String,
) -> anyhow::Result<BridgeState> {
	error!("Bridge of {} failed: {}", state.inscription_id, reason);

	state.fail(reason, Utc::now())?;
	store.save(&state, Utc::now())?;

	Ok(state)
}
