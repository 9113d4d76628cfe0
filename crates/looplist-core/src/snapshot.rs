//! Whole-state snapshot and its key-value encoding.
//!
//! State is always written and read as a unit: one JSON array per
//! collection, each under a fixed key.

use crate::types::{CheckIn, Loop, Reaction};
use serde::{Deserialize, Serialize};

pub const LOOPS_KEY: &str = "loopListLoops";
pub const CHECK_INS_KEY: &str = "loopListCheckIns";
pub const REACTIONS_KEY: &str = "loopListReactions";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub loops: Vec<Loop>,
    pub check_ins: Vec<CheckIn>,
    pub reactions: Vec<Reaction>,
}

impl Snapshot {
    /// Serialize each collection under its key.
    pub fn encode(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        Ok(vec![
            (LOOPS_KEY, serde_json::to_string(&self.loops)?),
            (CHECK_INS_KEY, serde_json::to_string(&self.check_ins)?),
            (REACTIONS_KEY, serde_json::to_string(&self.reactions)?),
        ])
    }

    /// Rebuild a snapshot from stored values. Missing keys load as empty.
    pub fn decode(
        loops: Option<&str>,
        check_ins: Option<&str>,
        reactions: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            loops: decode_collection(loops)?,
            check_ins: decode_collection(check_ins)?,
            reactions: decode_collection(reactions)?,
        })
    }
}

fn decode_collection<T: serde::de::DeserializeOwned>(
    raw: Option<&str>,
) -> Result<Vec<T>, serde_json::Error> {
    raw.map_or_else(|| Ok(Vec::new()), serde_json::from_str)
}
