use crate::validate::Exclusion;

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// The source bytes are not a readable XLSX container.
    #[error("failed to load workbook ({backend}): {message}")]
    Load {
        backend: &'static str,
        message: String,
    },

    #[error("no eligible sheets: {} sheet(s) excluded", excluded.len())]
    NoEligibleSheets { excluded: Vec<Exclusion> },

    /// A sheet that passed validation failed while being resolved,
    /// extracted or serialized.
    #[error("failed to process sheet '{sheet}': {message}")]
    SheetProcessing { sheet: String, message: String },

    #[error("failed to write archive: {message}")]
    Archive { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub fn load<E: std::fmt::Display>(backend: &'static str, err: E) -> Self {
        SplitError::Load {
            backend,
            message: err.to_string(),
        }
    }

    pub fn sheet<E: std::fmt::Display>(sheet: &str, err: E) -> Self {
        SplitError::SheetProcessing {
            sheet: sheet.to_string(),
            message: err.to_string(),
        }
    }

    pub fn archive<E: std::fmt::Display>(err: E) -> Self {
        SplitError::Archive {
            message: err.to_string(),
        }
    }

    /// Title of the sheet this error is attributed to, if any.
    pub fn sheet_name(&self) -> Option<&str> {
        match self {
            SplitError::SheetProcessing { sheet, .. } => Some(sheet),
            _ => None,
        }
    }
}
