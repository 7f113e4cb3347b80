//! Opening exposure files and selecting the header/data unit to display.
//!
//! No pixel data is decoded here. The viewer reads the file itself; we only
//! check that the requested HDU exists and pass along a header summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fitrs::{Fits, HeaderValue};
use ginga_core::models::HduIndex;
use ginga_core::{ActorError, Result};
use serde::Serialize;

/// Header cards copied into every payload when present.
pub const SUMMARY_KEYS: &[&str] = &["BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTNAME", "EXPTIME"];

/// A located header/data unit, ready to be handed to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HduPayload {
    pub path: PathBuf,
    pub hdu: HduIndex,
    pub header: BTreeMap<String, String>,
}

/// Seam for opening exposure files.
pub trait HduReader: Send + Sync {
    fn open(&self, path: &Path, hdu: HduIndex) -> Result<HduPayload>;
}

/// [`HduReader`] backed by the `fitrs` FITS parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsHduReader;

impl HduReader for FitsHduReader {
    fn open(&self, path: &Path, hdu: HduIndex) -> Result<HduPayload> {
        let fits = Fits::open(path).map_err(|source| ActorError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let unit = fits.get(hdu.get()).ok_or_else(|| ActorError::HduNotFound {
            path: path.to_path_buf(),
            index: hdu.get(),
        })?;

        let header = SUMMARY_KEYS
            .iter()
            .filter_map(|key| unit.value(key).map(|value| (key.to_string(), render_value(value))))
            .collect();

        Ok(HduPayload {
            path: path.to_path_buf(),
            hdu,
            header,
        })
    }
}

fn render_value(value: &HeaderValue) -> String {
    match value {
        HeaderValue::CharacterString(s) => s.trim_end().to_string(),
        HeaderValue::Logical(b) => if *b { "T" } else { "F" }.to_string(),
        HeaderValue::IntegerNumber(n) => n.to_string(),
        HeaderValue::RealFloatingNumber(x) => x.to_string(),
        other => format!("{other:?}"),
    }
}
