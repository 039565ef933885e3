use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: String, value: f64 },

    #[error("{what} = {value} outside {range}")]
    OutOfRange {
        what: String,
        value: f64,
        range: &'static str,
    },
}
