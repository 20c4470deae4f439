//! Startup selection of the codec matching the host version.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::{BookCodec, ComponentCodec, LegacyCodec};
use crate::domain::Book;

type CodecFactory = fn(&'static str) -> Arc<dyn BookCodec>;

fn legacy(version: &'static str) -> Arc<dyn BookCodec> {
    Arc::new(LegacyCodec::new(version))
}

fn component(version: &'static str) -> Arc<dyn BookCodec> {
    Arc::new(ComponentCodec::new(version))
}

/// Supported host versions and the codec family serving each
static CODECS: &[(&str, CodecFactory)] = &[
    ("v1_8_R3", legacy),
    ("v1_9_R2", legacy),
    ("v1_10_R1", legacy),
    ("v1_11_R1", legacy),
    ("v1_12_R1", legacy),
    ("v1_13_R2", component),
    ("v1_14_R1", component),
    ("v1_15_R1", component),
    ("v1_16_R3", component),
];

/// No usable codec for the running host
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterLoadError {
    #[error("Host version '{version}' is not supported")]
    Unsupported { version: String },

    #[error("Codec for host version '{version}' failed its self-check: {reason}")]
    Incompatible { version: String, reason: String },
}

impl AdapterLoadError {
    /// The host version string that was detected
    pub fn version(&self) -> &str {
        match self {
            AdapterLoadError::Unsupported { version } => version,
            AdapterLoadError::Incompatible { version, .. } => version,
        }
    }
}

/// Reduce a host version string to its registry key.
///
/// `org.bukkit.craftbukkit.v1_16_R3` and `v1_16_R3` both yield `v1_16_R3`.
pub fn canonical_version(host_version: &str) -> &str {
    let trimmed = host_version.trim();
    match trimmed.rfind('.') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// All host versions a codec is registered for
pub fn supported_versions() -> Vec<&'static str> {
    CODECS.iter().map(|(version, _)| *version).collect()
}

/// Pick the codec for the given host version
pub fn select(host_version: &str) -> Result<Arc<dyn BookCodec>, AdapterLoadError> {
    let version = canonical_version(host_version);
    info!("Host is running version {}", version);

    let &(key, factory) = CODECS
        .iter()
        .find(|(key, _)| *key == version)
        .ok_or_else(|| AdapterLoadError::Unsupported {
            version: version.to_string(),
        })?;

    let codec = factory(key);
    probe(codec.as_ref()).map_err(|reason| AdapterLoadError::Incompatible {
        version: version.to_string(),
        reason,
    })?;

    info!("Loading support for version {}", key);
    Ok(codec)
}

/// A codec must at least carry the blank book through unchanged
fn probe(codec: &dyn BookCodec) -> Result<(), String> {
    let blank = Book::empty();
    let decoded = codec
        .decode(&codec.encode(&blank))
        .map_err(|e| e.to_string())?;

    if decoded != blank {
        return Err(format!("blank book decoded as {:?}", decoded));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_version() {
        assert_eq!(canonical_version("org.bukkit.craftbukkit.v1_16_R3"), "v1_16_R3");
        assert_eq!(canonical_version("v1_12_R1"), "v1_12_R1");
        assert_eq!(canonical_version("  v1_8_R3 \n"), "v1_8_R3");
        assert_eq!(canonical_version(""), "");
        assert_eq!(canonical_version("trailing."), "");
    }

    #[test]
    fn test_every_registered_codec_passes_probe() {
        for version in supported_versions() {
            let codec = select(version).unwrap();
            assert_eq!(codec.version(), version);
        }
    }

    #[test]
    fn test_select_families() {
        let old = select("org.bukkit.craftbukkit.v1_8_R3").unwrap();
        assert_eq!(old.encode(&Book::empty())["type"], "WRITTEN_BOOK");

        let new = select("v1_14_R1").unwrap();
        assert_eq!(new.encode(&Book::empty())["id"], "minecraft:written_book");
    }

    #[test]
    fn test_unsupported_version() {
        let err = select("org.bukkit.craftbukkit.v1_17_R1").err().unwrap();
        assert_eq!(
            err,
            AdapterLoadError::Unsupported {
                version: "v1_17_R1".to_string()
            }
        );
        assert_eq!(err.version(), "v1_17_R1");
        assert!(err.to_string().contains("v1_17_R1"));
    }

    #[test]
    fn test_empty_version_is_unsupported() {
        assert!(matches!(
            select("   "),
            Err(AdapterLoadError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_probe_catches_lossy_codec() {
        struct Lossy;

        impl BookCodec for Lossy {
            fn version(&self) -> &'static str {
                "lossy"
            }

            fn decode(&self, _content: &serde_json::Value) -> Result<Book, super::super::CodecError> {
                Ok(Book::written(["garbage"]))
            }

            fn encode(&self, _book: &Book) -> serde_json::Value {
                serde_json::Value::Null
            }

            fn reserved_keys(&self) -> &'static [&'static str] {
                &[]
            }
        }

        assert!(probe(&Lossy).is_err());
    }
}
