//! Client-local bridge state
//!
//! A bridge in progress is tracked by a single [`BridgeState`] record. The
//! record is persisted as one JSON blob under [`STATE_KEY`] and expires
//! [`STATE_TTL_DAYS`] days after it was last saved. Every save overwrites the
//! blob wholesale, the last writer wins.
use std::{
	collections::BTreeMap,
	fmt,
	fs::{self, OpenOptions},
	io::ErrorKind,
	path::{Path, PathBuf},
};

use bitcoin::Txid;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{inscription::InscriptionId, proof::ProofData, BridgeError, BridgeResult};

/// Key the bridge state is stored under
pub const STATE_KEY: &str = "ordinal_bridge_state";

/// Days a saved bridge state stays valid
pub const STATE_TTL_DAYS: i64 = 7;

/// Progress of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
	/// Waiting for the Bitcoin transaction to be confirmed
	PendingConfirmation,
	/// Building the inclusion proof
	GeneratingProof,
	/// Forwarding the proof to the bridge listener
	SubmittingToLightClient,
	/// The bridge listener accepted the proof
	Completed,
	/// The bridge stopped on an error
	Failed,
}

impl BridgeStatus {
	/// Whether no further transition is possible
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}

	/// Whether a state in this status may move to `next`
	pub fn can_transition_to(&self, next: BridgeStatus) -> bool {
		use BridgeStatus::*;

		match (self, next) {
			(from, to) if *from == to => !from.is_terminal(),
			(from, Failed) => !from.is_terminal(),
			(PendingConfirmation, GeneratingProof)
			| (GeneratingProof, SubmittingToLightClient)
			| (SubmittingToLightClient, Completed) => true,
			_ => false,
		}
	}

	fn as_str(&self) -> &'static str {
		match self {
			Self::PendingConfirmation => "pending_confirmation",
			Self::GeneratingProof => "generating_proof",
			Self::SubmittingToLightClient => "submitting_to_light_client",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}
}

impl fmt::Display for BridgeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// State of a single bridge of an inscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeState {
	/// Bitcoin transaction that sends the inscription to the bridge
	pub tx_id: Txid,
	/// The inscription being bridged
	pub inscription_id: InscriptionId,
	/// Bitcoin address the inscription is sent from
	pub from_address: String,
	/// EVM address receiving the bridged token
	pub receiver_address: String,
	/// Current status
	pub status: BridgeStatus,
	/// Last observed confirmation count
	pub confirmations: u32,
	/// Proof payload, once generated
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub proof: Option<ProofData>,
	/// Response of the bridge listener, once submitted
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<serde_json::Value>,
	/// Reason of the failure
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Creation time
	pub created_at: DateTime<Utc>,
	/// Time of the last update
	pub updated_at: DateTime<Utc>,
}

impl BridgeState {
	/// Start tracking a bridge, pending confirmation
	pub fn new(
		tx_id: Txid,
		inscription_id: InscriptionId,
		from_address: impl Into<String>,
		receiver_address: impl Into<String>,
		now: DateTime<Utc>,
	) -> Self {
		Self {
			tx_id,
			inscription_id,
			from_address: from_address.into(),
			receiver_address: receiver_address.into(),
			status: BridgeStatus::PendingConfirmation,
			confirmations: 0,
			proof: None,
			result: None,
			error: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Move to `status`, rejecting transitions the status machine forbids
	pub fn transition(
		&mut self,
		status: BridgeStatus,
		now: DateTime<Utc>,
	) -> BridgeResult<()> {
		if !self.status.can_transition_to(status) {
			return Err(BridgeError::InvalidTransition {
				from: self.status,
				to: status,
			});
		}

		debug!("Bridge of {} moves from {} to {}", self.tx_id, self.status, status);
		self.status = status;
		self.updated_at = now;

		Ok(())
	}

	/// Mark the bridge as failed with the given reason
	pub fn fail(
		&mut self,
		error: impl Into<String>,
		now: DateTime<Utc>,
	) -> BridgeResult<()> {
		self.transition(BridgeStatus::Failed, now)?;
		self.error = Some(error.into());

		Ok(())
	}
}

/// A stored bridge state along with its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
	expires_at: DateTime<Utc>,
	value: BridgeState,
}

impl StoredState {
	fn new(value: BridgeState, now: DateTime<Utc>) -> Self {
		Self {
			expires_at: now + Duration::days(STATE_TTL_DAYS),
			value,
		}
	}

	fn live(self, now: DateTime<Utc>) -> Option<BridgeState> {
		(now < self.expires_at).then_some(self.value)
	}
}

/// Persistence of the bridge state blob
pub trait StateStore {
	/// Load the state unless it is missing or expired. An expired state is
	/// discarded.
	fn load(&mut self, now: DateTime<Utc>) -> BridgeResult<Option<BridgeState>>;

	/// Overwrite the stored state, resetting its expiry
	fn save(&mut self, state: &BridgeState, now: DateTime<Utc>) -> BridgeResult<()>;

	/// Remove the stored state
	fn clear(&mut self) -> BridgeResult<()>;
}

/// Keeps the state in memory
#[derive(Debug, Default)]
pub struct MemoryStore(Option<StoredState>);

impl StateStore for MemoryStore {
	fn load(&mut self, now: DateTime<Utc>) -> BridgeResult<Option<BridgeState>> {
		let state = self.0.take().and_then(|stored| {
			let live = stored.clone().live(now);
			if live.is_some() {
				self.0 = Some(stored);
			}
			live
		});

		Ok(state)
	}

	fn save(&mut self, state: &BridgeState, now: DateTime<Utc>) -> BridgeResult<()> {
		self.0 = Some(StoredState::new(state.clone(), now));
		Ok(())
	}

	fn clear(&mut self) -> BridgeResult<()> {
		self.0 = None;
		Ok(())
	}
}

/// Keeps the state in a JSON file holding a key-value map, the bridge state
/// living under [`STATE_KEY`]
#[derive(Debug, Clone)]
pub struct JsonFileStore {
	path: PathBuf,
}

type Blobs = BTreeMap<String, serde_json::Value>;

impl JsonFileStore {
	/// Store backed by the file at `path`, created on first save
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			path: path.as_ref().to_path_buf(),
		}
	}

	/// Location of the backing file
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read(&self) -> BridgeResult<Blobs> {
		match fs::read(&self.path) {
			Ok(bytes) if bytes.is_empty() => Ok(Blobs::new()),
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(Blobs::new()),
			Err(err) => Err(err.into()),
		}
	}

	fn write(&self, blobs: &Blobs) -> BridgeResult<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}

		let file = OpenOptions::new()
			.create(true)
			.write(true)
			.truncate(true)
			.open(&self.path)?;

		serde_json::to_writer_pretty(file, blobs)?;

		Ok(())
	}
}

impl StateStore for JsonFileStore {
	fn load(&mut self, now: DateTime<Utc>) -> BridgeResult<Option<BridgeState>> {
		let mut blobs = self.read()?;

		let Some(blob) = blobs.get(STATE_KEY).cloned() else {
			return Ok(None);
		};

		let stored: StoredState = serde_json::from_value(blob)?;
		match stored.live(now) {
			Some(state) => Ok(Some(state)),
			None => {
				debug!("Discarding expired bridge state");
				blobs.remove(STATE_KEY);
				self.write(&blobs)?;
				Ok(None)
			}
		}
	}

	fn save(&mut self, state: &BridgeState, now: DateTime<Utc>) -> BridgeResult<()> {
		let mut blobs = self.read()?;
		blobs.insert(
			STATE_KEY.to_string(),
			serde_json::to_value(StoredState::new(state.clone(), now))?,
		);

		self.write(&blobs)
	}

	fn clear(&mut self) -> BridgeResult<()> {
		let mut blobs = self.read()?;
		if blobs.remove(STATE_KEY).is_some() {
			self.write(&blobs)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::str::FromStr;

	use chrono::TimeZone;

	use super::*;

	const TXID: &str =
		"6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799";

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
	}

	fn state() -> BridgeState {
		let txid = Txid::from_str(TXID).unwrap();

		BridgeState::new(
			txid,
			InscriptionId::new(txid, 0),
			"bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
			"0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
			now(),
		)
	}

	#[test]
	fn should_follow_the_happy_path() {
		let mut state = state();

		for status in [
			BridgeStatus::GeneratingProof,
			BridgeStatus::SubmittingToLightClient,
			BridgeStatus::Completed,
		] {
			state.transition(status, now()).unwrap();
		}

		assert_eq!(state.status, BridgeStatus::Completed);
		assert!(state.status.is_terminal());
	}

	#[test]
	fn should_reject_skipping_and_leaving_terminal_states() {
		let mut state = state();

		assert!(matches!(
			state.transition(BridgeStatus::Completed, now()),
			Err(BridgeError::InvalidTransition {
				from: BridgeStatus::PendingConfirmation,
				to: BridgeStatus::Completed
			})
		));

		state.fail("explorer unreachable", now()).unwrap();
		assert_eq!(state.error.as_deref(), Some("explorer unreachable"));
		assert!(state.transition(BridgeStatus::Failed, now()).is_err());
		assert!(state
			.transition(BridgeStatus::PendingConfirmation, now())
			.is_err());
	}

	#[test]
	fn should_allow_refreshing_a_non_terminal_status() {
		let mut state = state();
		let later = now() + Duration::minutes(1);

		state
			.transition(BridgeStatus::PendingConfirmation, later)
			.unwrap();

		assert_eq!(state.updated_at, later);
	}

	#[test]
	fn should_serialize_status_in_snake_case() {
		let json = serde_json::to_string(&state()).unwrap();

		assert!(json.contains(r#""status":"pending_confirmation""#));
		assert!(json.contains(r#""txId":""#));
		assert_eq!(
			BridgeStatus::SubmittingToLightClient.to_string(),
			"submitting_to_light_client"
		);
	}

	#[test]
	fn memory_store_should_expire_after_seven_days() {
		let mut store = MemoryStore::default();
		store.save(&state(), now()).unwrap();

		let just_before = now() + Duration::days(STATE_TTL_DAYS) - Duration::seconds(1);
		assert_eq!(store.load(just_before).unwrap(), Some(state()));

		let expiry = now() + Duration::days(STATE_TTL_DAYS);
		assert_eq!(store.load(expiry).unwrap(), None);
		assert_eq!(store.load(now()).unwrap(), None);
	}

	#[test]
	fn file_store_should_overwrite_and_expire() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = JsonFileStore::new(dir.path().join("nested/state.json"));

		assert_eq!(store.load(now()).unwrap(), None);

		let mut state = state();
		store.save(&state, now()).unwrap();
		state.transition(BridgeStatus::GeneratingProof, now()).unwrap();
		store.save(&state, now()).unwrap();

		assert_eq!(store.load(now()).unwrap(), Some(state.clone()));

		let raw: Blobs =
			serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
		assert_eq!(raw.keys().collect::<Vec<_>>(), vec![STATE_KEY]);

		let expired = now() + Duration::days(STATE_TTL_DAYS + 1);
		assert_eq!(store.load(expired).unwrap(), None);
		assert_eq!(store.load(now()).unwrap(), None);
	}

	#[test]
	fn file_store_should_keep_unrelated_keys() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state.json");
		fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

		let mut store = JsonFileStore::new(&path);
		store.save(&state(), now()).unwrap();
		store.clear().unwrap();

		let raw: Blobs = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
		assert_eq!(raw.get("theme"), Some(&serde_json::json!("dark")));
		assert!(!raw.contains_key(STATE_KEY));
	}
}
