//! Construction-time round-trip checks.
//!
//! Each pipeline stage is exercised on a tiny value before the engine
//! touches hardware. A stage that cannot reproduce its input stops the
//! engine from opening.

use crate::crypto::Cipher;
use crate::error::{CoreError, CoreResult};
use crate::namespace::Namespace;
use crate::partition::{self, Geometry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slotfs_codec::SnapshotCodec;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum Sample {
    Flag(bool),
    Number(u64),
}

/// Runs every check in pipeline order.
pub(crate) fn run<N: Namespace>(
    cipher: &Cipher,
    codec: &SnapshotCodec,
    geometry: &Geometry,
) -> CoreResult<()> {
    cipher.self_check()?;
    check_codec(codec)?;
    check_partition(codec, geometry)?;
    check_namespace::<N>(codec, geometry)?;
    tracing::debug!("self-checks passed");
    Ok(())
}

fn check_codec(codec: &SnapshotCodec) -> CoreResult<()> {
    let mut sample = BTreeMap::new();
    sample.insert(
        "a".to_string(),
        vec![Sample::Flag(true), Sample::Number(123), Sample::Number(123_456)],
    );
    if codec.verify_roundtrip(&sample)? {
        Ok(())
    } else {
        Err(CoreError::SelfCheckFailed { check: "codec" })
    }
}

fn check_partition(codec: &SnapshotCodec, geometry: &Geometry) -> CoreResult<()> {
    let sample: (BTreeMap<String, u64>, BTreeMap<String, u64>) = (BTreeMap::new(), BTreeMap::new());
    if through_blocks(codec, geometry, &sample)? == sample {
        Ok(())
    } else {
        Err(CoreError::SelfCheckFailed { check: "partition" })
    }
}

fn check_namespace<N: Namespace>(
    codec: &SnapshotCodec,
    geometry: &Geometry,
) -> CoreResult<()> {
    let empty = N::default();
    if through_blocks(codec, geometry, &empty)? == empty {
        Ok(())
    } else {
        Err(CoreError::SelfCheckFailed { check: "namespace" })
    }
}

/// encode, split into slot payloads, join, decode.
fn through_blocks<T: Serialize + DeserializeOwned>(
    codec: &SnapshotCodec,
    geometry: &Geometry,
    value: &T,
) -> CoreResult<T> {
    let blob = codec.encode(value)?;
    geometry.check_fits(blob.len())?;
    let blocks = partition::to_blocks(&blob, geometry.slots(), geometry.payload_size());
    let joined = partition::from_blocks(&blocks)?;
    Ok(codec.decode(&joined)?)
}
