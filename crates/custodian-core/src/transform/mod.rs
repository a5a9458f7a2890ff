//! Post-read transformers applied to imported file contents

pub mod sops;

use std::fmt;

use crate::error::Result;

pub use sops::{Decryptor, SopsCli, SopsFormat, SopsTransformer};

/// A post-read hook over the bytes of an imported file
///
/// `found_at` is the location tag of the file being produced.
pub trait Transformer: Send + Sync {
    fn transform(&self, found_at: &str, data: Vec<u8>) -> Result<Vec<u8>>;
}

impl<F> Transformer for F
where
    F: Fn(&str, Vec<u8>) -> Result<Vec<u8>> + Send + Sync,
{
    fn transform(&self, found_at: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        self(found_at, data)
    }
}

/// Ordered transformers; each stage receives the previous stage's output
#[derive(Default)]
pub struct TransformerPipeline {
    stages: Vec<Box<dyn Transformer>>,
}

impl TransformerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transformer: impl Transformer + 'static) {
        self.stages.push(Box::new(transformer));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in registration order, stopping at the first failure
    pub fn apply(&self, found_at: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        self.stages
            .iter()
            .try_fold(data, |data, stage| stage.transform(found_at, data))
    }
}

impl fmt::Debug for TransformerPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerPipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CustodianError;

    #[test]
    fn test_stages_run_in_order() -> Result<()> {
        let mut pipeline = TransformerPipeline::new();
        pipeline.push(|_: &str, mut data: Vec<u8>| -> Result<Vec<u8>> {
            data.extend_from_slice(b"-first");
            Ok(data)
        });
        pipeline.push(|_: &str, mut data: Vec<u8>| -> Result<Vec<u8>> {
            data.extend_from_slice(b"-second");
            Ok(data)
        });

        assert_eq!(pipeline.apply("m:mod-sep:f", b"x".to_vec())?, b"x-first-second");
        Ok(())
    }

    #[test]
    fn test_first_failure_stops_the_pipeline() {
        let mut pipeline = TransformerPipeline::new();
        pipeline.push(|found_at: &str, _: Vec<u8>| -> Result<Vec<u8>> {
            Err(CustodianError::TransformerFailed {
                location: found_at.to_string(),
                message: "boom".to_string(),
            })
        });
        pipeline.push(|_: &str, _: Vec<u8>| -> Result<Vec<u8>> {
            panic!("second stage must not run")
        });

        let err = pipeline.apply("m:mod-sep:f", Vec::new()).unwrap_err();
        assert!(matches!(err, CustodianError::TransformerFailed { .. }));
    }

    #[test]
    fn test_empty_pipeline_passes_data_through() -> Result<()> {
        let pipeline = TransformerPipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.apply("tag", b"data".to_vec())?, b"data");
        Ok(())
    }
}
