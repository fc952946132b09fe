//! Modality fusion: pick the single most confident modality as the "main"
//! signal for a check-in.

use crate::emotion::ModalityResult;
use crate::error::{CheckinError, Result};

/// Select the modality whose top candidate is strictly the most confident.
///
/// `results` is expected in priority order (face, text, audio). Empty
/// distributions are skipped; on equal top confidence the earlier entry
/// wins. Fails with [`CheckinError::AllModalitiesEmpty`] when nothing is
/// left to choose from.
pub fn select_main(results: &[ModalityResult]) -> Result<&ModalityResult> {
    let mut best: Option<(&ModalityResult, f64)> = None;

    for result in results {
        let Some(top) = result.distribution.top() else {
            continue;
        };
        match best {
            Some((_, conf)) if top.confidence <= conf => {}
            _ => best = Some((result, top.confidence)),
        }
    }

    best.map(|(r, _)| r).ok_or(CheckinError::AllModalitiesEmpty)
}
