use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::ExportRecord;
use crate::settings::Labels;
use crate::{AppError, Result};

/// UTF-8 byte-order mark, so spreadsheet apps detect the encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the transcript as a BOM-prefixed CSV with a header row.
pub fn write_transcript(path: &Path, labels: &Labels, records: &[ExportRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut out = BufWriter::new(file);
    out.write_all(UTF8_BOM).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([&labels.timestamp_header, &labels.user_header, &labels.text_header])
        .map_err(|e| AppError::Csv(e.to_string()))?;
    for record in records {
        writer
            .write_record([&record.timestamp, &record.user, &record.text])
            .map_err(|e| AppError::Csv(e.to_string()))?;
    }
    writer.flush().map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
