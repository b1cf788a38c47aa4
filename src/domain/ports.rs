use crate::utils::error::Result;

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// Diagnostics sink. Every message is tied to the unit that produced it.
pub trait Reporter {
    fn note(&self, unit: &str, message: &str);
    fn warn(&self, unit: &str, message: &str);
    fn error(&self, unit: &str, message: &str);
}
