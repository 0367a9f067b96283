//! Assembles the redaction boxes handed to the image compositor.

use blackline_core::{BoxKind, RedactionBox, VisualPiiDetection};
use tracing::{debug, info};

use crate::align::AlignedRegion;

/// Alignment outcome for one entity.
#[derive(Debug, Clone)]
pub struct EntityAlignment {
    /// Index into the canonical entity list.
    pub entity_ref: usize,
    pub region: Option<AlignedRegion>,
}

/// Final box list plus the number of entities that had no layout match.
#[derive(Debug, Clone, Default)]
pub struct BoxPlan {
    pub boxes: Vec<RedactionBox>,
    pub alignment_misses: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RedactionBoxBuilder;

impl RedactionBoxBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One text box per aligned entity, then one visual box per detection.
    /// Unaligned entities are skipped and counted.
    pub fn build(&self, alignments: &[EntityAlignment], visual: &[VisualPiiDetection]) -> BoxPlan {
        let mut plan = BoxPlan::default();

        for alignment in alignments {
            let Some(region) = &alignment.region else {
                debug!("Entity {} has no layout match; text-only redaction", alignment.entity_ref);
                plan.alignment_misses += 1;
                continue;
            };
            let b = region.bounding_box;
            plan.boxes.push(RedactionBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
                kind: BoxKind::Text,
                entity_ref: Some(alignment.entity_ref),
                visual_pii_ref: None,
            });
        }

        for (i, detection) in visual.iter().enumerate() {
            let b = detection.bounding_box();
            plan.boxes.push(RedactionBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
                kind: BoxKind::Visual,
                entity_ref: None,
                visual_pii_ref: Some(i),
            });
        }

        info!(
            "Built {} redaction boxes ({} visual, {} alignment misses)",
            plan.boxes.len(),
            visual.len(),
            plan.alignment_misses
        );
        plan
    }
}
