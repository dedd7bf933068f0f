//! Inscription identifiers
use std::{fmt, str::FromStr};

use bitcoin::Txid;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{BridgeError, BridgeResult};

/// Regex for inscription ids: a reveal txid followed by `i` and the index
pub static INSCRIPTION_ID_REGEX: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{64})i([0-9]{1,10})$").unwrap());

/// Identifier of an inscription, `<reveal txid>i<index>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InscriptionId {
	txid: Txid,
	index: u32,
}

impl InscriptionId {
	/// Create an inscription id from its parts
	pub fn new(txid: Txid, index: u32) -> Self {
		Self { txid, index }
	}

	/// The reveal transaction that carries the inscription
	pub fn txid(&self) -> Txid {
		self.txid
	}

	/// Position of the inscription within the reveal transaction
	pub fn index(&self) -> u32 {
		self.index
	}
}

impl FromStr for InscriptionId {
	type Err = BridgeError;

	fn from_str(s: &str) -> BridgeResult<Self> {
		let invalid = || BridgeError::InvalidInscriptionId(s.to_string());

		let captures = INSCRIPTION_ID_REGEX.captures(s).ok_or_else(invalid)?;
		let txid = Txid::from_str(&captures[1].to_lowercase())
			.map_err(|_| invalid())?;
		let index = captures[2].parse::<u32>().map_err(|_| invalid())?;

		Ok(Self { txid, index })
	}
}

impl fmt::Display for InscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}i{}", self.txid, self.index)
	}
}

impl serde::Serialize for InscriptionId {
	fn serialize<S: serde::Serializer>(
		&self,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> serde::Deserialize<'de> for InscriptionId {
	fn deserialize<D: serde::Deserializer<'de>>(
		deserializer: D,
	) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		text.parse().map_err(serde::de::Error::custom)
	}
}
