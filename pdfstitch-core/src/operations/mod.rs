//! PDF operations module
//!
//! High-level operations over parsed documents: merging several inputs into
//! one document and stamping page numbers across the result.

pub mod merge;
pub mod stamp;

pub use merge::{merge_pdfs, IdRemapper, MergeOptions, MetadataMode, PdfMerger};
pub use stamp::{
    stamp_pdf, OverlayTemplate, PageStamper, StampOptions, StampPosition, RESERVED_FONT_PREFIX,
};

use crate::error::Result;

/// Merge `inputs` in order and stamp the combined page sequence
pub fn merge_and_stamp<B: AsRef<[u8]>>(
    inputs: &[B],
    merge: MergeOptions,
    stamp: Option<StampOptions>,
) -> Result<Vec<u8>> {
    let mut doc = PdfMerger::new(merge).merge_bytes(inputs)?;
    if let Some(options) = stamp {
        PageStamper::new(options).stamp(&mut doc)?;
    }
    doc.to_bytes()
}
