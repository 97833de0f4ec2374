//! Export generated datasets to CSV.
//!
//! Column names match the ones analysts already use for these files, so the
//! exports drop straight into spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::{ActivityData, SaturationData};
use crate::error::AppError;

/// Write `User_ID,Visits,Avg_Session_Time` rows.
pub fn write_activity_csv(path: &Path, data: &ActivityData) -> Result<(), AppError> {
    let mut file = create(path)?;

    writeln!(file, "User_ID,Visits,Avg_Session_Time")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for ((id, visits), session) in data.user_ids.iter().zip(&data.visits).zip(&data.session_time) {
        writeln!(file, "{id},{visits},{session:.6}")
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    finish(file)
}

/// Write `Visits,Pages_Per_Session` rows.
pub fn write_saturation_csv(path: &Path, data: &SaturationData) -> Result<(), AppError> {
    let mut file = create(path)?;

    writeln!(file, "Visits,Pages_Per_Session")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (visits, pages) in data.visits.iter().zip(&data.pages) {
        writeln!(file, "{visits},{pages:.6}")
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    finish(file)
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn finish(mut file: BufWriter<File>) -> Result<(), AppError> {
    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}
