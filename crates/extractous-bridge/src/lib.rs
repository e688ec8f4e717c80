// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractous binding: native ABI bridge.
//
// `traits` mirrors the C ABI of libextractous_ffi one call per method. Two
// engines implement it: `linked` forwards to the real library (feature
// `linked`), `emulated` implements the same contract in-process so the
// binding can be built and tested anywhere.

pub mod abi;
pub mod emulated;
pub mod traits;

#[cfg(feature = "linked")]
pub mod linked;

use std::sync::Arc;

use extractous_core::{EngineKind, Result};

pub use emulated::EmulatedEngine;
pub use traits::NativeEngine;

/// Instantiate the engine selected by configuration.
pub fn native_engine(kind: EngineKind) -> Result<Arc<dyn NativeEngine>> {
    match kind {
        EngineKind::Emulated => Ok(Arc::new(EmulatedEngine::new())),
        #[cfg(feature = "linked")]
        EngineKind::Linked => Ok(Arc::new(linked::LinkedEngine::new())),
        #[cfg(not(feature = "linked"))]
        EngineKind::Linked => {
            tracing::warn!("linked engine requested but the `linked` feature is disabled");
            Err(extractous_core::ExtractousError::EngineUnavailable(
                "built without the `linked` feature".into(),
            ))
        }
    }
}

/// The best engine available in this build: linked when compiled in,
/// emulated otherwise.
pub fn default_engine() -> Arc<dyn NativeEngine> {
    #[cfg(feature = "linked")]
    {
        Arc::new(linked::LinkedEngine::new())
    }
    #[cfg(not(feature = "linked"))]
    {
        Arc::new(EmulatedEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractous_core::ExtractousError;

    #[test]
    fn emulated_engine_is_always_available() {
        let engine = native_engine(EngineKind::Emulated).unwrap();
        assert_eq!(engine.engine_name(), "emulated");
    }

    #[cfg(not(feature = "linked"))]
    #[test]
    fn linked_engine_requires_feature() {
        let err = native_engine(EngineKind::Linked).err().unwrap();
        assert!(matches!(err, ExtractousError::EngineUnavailable(_)));
    }
}
