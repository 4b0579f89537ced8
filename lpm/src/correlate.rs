//! Aligns Dockerfile instructions with manifest layers and records which
//! layers this build produced.
//!
//! Both sequences are walked from the top (last instruction, last layer)
//! down. Each step pairs one instruction with one layer until a `FROM` is
//! reached; every layer below that point came from the base image.

use ociclient::{Annotations, ImageManifest};
use tracing::{debug, info};

use crate::annotations::{ANNOTATION_SUBJECT_DOCKERFILE_COMMAND, Ownership};
use crate::cursor::BackwardPairs;
use crate::dockerfile::Instruction;

/// Classification counts of one correlation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationSummary {
    pub non_upstream: usize,
    pub upstream: usize,
}

fn layer_annotations(ownership: Ownership, command: &str) -> Annotations {
    let mut annotations = ownership.annotations();
    annotations.insert(
        ANNOTATION_SUBJECT_DOCKERFILE_COMMAND.to_string(),
        command.to_string(),
    );
    annotations
}

/// Return a copy of `subject` with every layer classified.
///
/// Manifest and config annotations are replaced with the non-upstream set.
/// Layers left over once the walk stops are upstream and carry the text of
/// the instruction the walk stopped on. When the instructions ran out first
/// there is no such instruction and the command annotation is empty.
pub fn correlate(instructions: &[Instruction], subject: &ImageManifest) -> ImageManifest {
    let (manifest, _) = correlate_with_summary(instructions, subject);
    manifest
}

pub fn correlate_with_summary(
    instructions: &[Instruction],
    subject: &ImageManifest,
) -> (ImageManifest, CorrelationSummary) {
    let mut manifest = subject.clone();
    manifest.annotations = Ownership::NonUpstream.annotations();
    manifest.config.annotations = Ownership::NonUpstream.annotations();

    let mut summary = CorrelationSummary::default();
    let mut cursor = BackwardPairs::new(instructions, &subject.layers);

    while let Some(pair) = cursor.peek() {
        if pair.left.is_base_image_directive() {
            debug!(
                instruction = pair.left_index,
                layer = pair.right_index,
                "reached base image boundary"
            );
            break;
        }

        debug!(
            layer = pair.right_index,
            digest = %pair.right.digest,
            command = %pair.left.original,
            "layer produced by build instruction"
        );
        manifest.layers[pair.right_index].annotations =
            layer_annotations(Ownership::NonUpstream, &pair.left.original);
        summary.non_upstream += 1;
        cursor.advance();
    }

    let terminal_command = cursor
        .left_current()
        .map(|instruction| instruction.original.as_str())
        .unwrap_or_default();

    for (layer_index, layer) in cursor.remaining_right().iter().enumerate() {
        debug!(layer = layer_index, digest = %layer.digest, "layer inherited from base image");
        manifest.layers[layer_index].annotations =
            layer_annotations(Ownership::Upstream, terminal_command);
        summary.upstream += 1;
    }

    info!(
        layers = subject.layers.len(),
        instructions = instructions.len(),
        non_upstream = summary.non_upstream,
        upstream = summary.upstream,
        "correlated layers with Dockerfile"
    );

    (manifest, summary)
}
